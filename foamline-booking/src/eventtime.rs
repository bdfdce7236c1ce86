use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use foamline_core::error::EngineError;

/// Parse an event date in either canonical ISO form (`2025-06-01`) or the
/// long form customers type (`June 1, 2025`).
pub fn parse_event_date(text: &str) -> Result<NaiveDate, EngineError> {
    let trimmed = text.trim();
    for format in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(EngineError::validation(format!(
        "unrecognized event date: {trimmed}"
    )))
}

/// Parse a slot label such as `"2:00 PM"`.
pub fn parse_event_time(text: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(text.trim(), "%I:%M %p")
        .map_err(|_| EngineError::validation(format!("unrecognized event time: {}", text.trim())))
}

/// Combine date and slot text into the event's start instant.
///
/// This is the single parse point for reminder-timing math; callers decide
/// whether a failure skips the booking or rejects the request.
pub fn parse_event_start(date: &str, time: &str) -> Result<DateTime<Utc>, EngineError> {
    let date = parse_event_date(date)?;
    let time = parse_event_time(time)?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parses_both_date_forms() {
        let iso = parse_event_date("2025-06-01").unwrap();
        let long = parse_event_date("June 1, 2025").unwrap();
        assert_eq!(iso, long);
    }

    #[test]
    fn test_parses_slot_labels() {
        assert_eq!(parse_event_time("2:00 PM").unwrap().hour(), 14);
        assert_eq!(parse_event_time("10:00 AM").unwrap().hour(), 10);
        assert!(parse_event_time("25:00").is_err());
    }

    #[test]
    fn test_event_start() {
        let start = parse_event_start("2025-06-01", "2:00 PM").unwrap();
        assert_eq!(start.to_rfc3339(), "2025-06-01T14:00:00+00:00");

        assert!(parse_event_start("whenever", "2:00 PM").is_err());
    }
}
