use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_lead_time_hours")]
    pub min_lead_time_hours: i64,
    #[serde(default = "default_pending_ttl_hours")]
    pub pending_ttl_hours: i64,
    #[serde(default = "default_reminder_after_hours")]
    pub reminder_after_hours: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_free_miles")]
    pub free_miles: f64,
    #[serde(default = "default_per_mile_cents")]
    pub per_mile_cents: i64,
    pub depot_address: String,
    /// Distance used by the fixed-distance fallback when no geocoding
    /// provider is configured.
    #[serde(default)]
    pub fallback_distance_miles: f64,
}

fn default_lead_time_hours() -> i64 {
    48
}
fn default_pending_ttl_hours() -> i64 {
    72
}
fn default_reminder_after_hours() -> i64 {
    24
}
fn default_sweep_interval_seconds() -> u64 {
    3600
}
fn default_free_miles() -> f64 {
    20.0
}
fn default_per_mile_cents() -> i64 {
    200
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional.
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. FOAMLINE__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("FOAMLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
