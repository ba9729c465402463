use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_now() -> NowProvider {
    Arc::new(Utc::now)
}

pub fn fixed_now(instant: DateTime<Utc>) -> NowProvider {
    Arc::new(move || instant)
}

/// Resolves an IANA zone name; blank or unknown names yield `None`.
pub fn parse_timezone(name: Option<&str>) -> Option<Tz> {
    name.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<Tz>().ok())
}

/// Calendar day of `now` as seen in `timezone`, UTC when absent.
pub fn local_today(now: DateTime<Utc>, timezone: Option<Tz>) -> NaiveDate {
    match timezone {
        Some(tz) => now.with_timezone(&tz).date_naive(),
        None => now.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn today_follows_configured_timezone() {
        let now = instant("2026-10-17T20:30:00Z");
        let tokyo = parse_timezone(Some("Asia/Tokyo"));
        assert!(tokyo.is_some());
        assert_eq!(local_today(now, tokyo).to_string(), "2026-10-18");
        assert_eq!(local_today(now, None).to_string(), "2026-10-17");

        let los_angeles = parse_timezone(Some("America/Los_Angeles"));
        let early = instant("2026-10-17T03:00:00Z");
        assert_eq!(local_today(early, los_angeles).to_string(), "2026-10-16");
    }

    #[test]
    fn unknown_or_blank_zone_is_ignored() {
        assert!(parse_timezone(Some("Mars/Olympus")).is_none());
        assert!(parse_timezone(Some("  ")).is_none());
        assert!(parse_timezone(None).is_none());
    }

    #[test]
    fn fixed_now_is_stable() {
        let now = instant("2026-02-16T09:00:00Z");
        let provider = fixed_now(now);
        assert_eq!(provider(), now);
        assert_eq!(provider(), now);
    }
}
