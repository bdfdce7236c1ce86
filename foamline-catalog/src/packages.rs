use serde::{Deserialize, Serialize};

/// A rentable foam-party package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoamPackage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub base_price_cents: i64,
    pub max_party_size: i32,
}

/// Fixed package catalog. Packages change rarely enough that they ship with
/// the binary rather than living in the store.
#[derive(Debug, Clone)]
pub struct PackageCatalog {
    packages: Vec<FoamPackage>,
}

impl PackageCatalog {
    pub fn new(packages: Vec<FoamPackage>) -> Self {
        Self { packages }
    }

    pub fn get(&self, id: &str) -> Option<&FoamPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[FoamPackage] {
        &self.packages
    }
}

impl Default for PackageCatalog {
    fn default() -> Self {
        Self::new(vec![
            FoamPackage {
                id: "splash".to_string(),
                name: "Splash Party".to_string(),
                description: "90 minutes of foam, one cannon, up to 25 guests".to_string(),
                base_price_cents: 22500,
                max_party_size: 25,
            },
            FoamPackage {
                id: "deluxe".to_string(),
                name: "Deluxe Foam Bash".to_string(),
                description: "2 hours, two cannons, up to 50 guests".to_string(),
                base_price_cents: 32500,
                max_party_size: 50,
            },
            FoamPackage {
                id: "glow".to_string(),
                name: "Glow Foam Night".to_string(),
                description: "2 hours of UV glow foam after dark, up to 50 guests".to_string(),
                base_price_cents: 42500,
                max_party_size: 50,
            },
        ])
    }
}
