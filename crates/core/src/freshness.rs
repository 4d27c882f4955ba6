//! TTL freshness evaluation for cached entries.
//!
//! An entry's age is measured from the `Date` header of the stored
//! response, not from when it was written locally. Origin clock skew
//! therefore shifts freshness the same way it would for any HTTP cache.
//! Entries without a usable `Date` header are never fresh.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::CacheEntry;

/// Age of an entry at `now`, or None when the entry carries no `Date`.
///
/// Negative when the origin clock runs ahead of ours.
pub fn age_at(entry: &CacheEntry, now: DateTime<Utc>) -> Option<chrono::Duration> {
    entry.timestamp().map(|ts| now.signed_duration_since(ts))
}

/// Whether `entry` is still within `max_age` at `now`.
pub fn is_fresh_at(entry: &CacheEntry, max_age: Duration, now: DateTime<Utc>) -> bool {
    let Some(age) = age_at(entry, now) else {
        return false;
    };
    match chrono::Duration::from_std(max_age) {
        Ok(max_age) => age < max_age,
        // max_age beyond chrono's range never expires
        Err(_) => true,
    }
}

/// Whether `entry` is still within `max_age` right now.
pub fn is_fresh(entry: &CacheEntry, max_age: Duration) -> bool {
    is_fresh_at(entry, max_age, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::format_http_date;
    use crate::{RequestKey, Response};
    use chrono::TimeZone;
    use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
    use url::Url;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn entry_dated(date: Option<DateTime<Utc>>) -> CacheEntry {
        let mut headers = HeaderMap::new();
        if let Some(date) = date {
            headers.insert(header::DATE, HeaderValue::from_str(&format_http_date(date)).unwrap());
        }
        CacheEntry {
            key: RequestKey::new(&Method::GET, &Url::parse("https://images.unsplash.com/photo.jpg").unwrap()),
            response: Response::new(StatusCode::OK, headers, "jpeg"),
            stored_at: Utc::now(),
        }
    }

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_within_window() {
        let entry = entry_dated(Some(origin()));
        assert!(is_fresh_at(&entry, DAY, origin() + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_stale_after_window() {
        let entry = entry_dated(Some(origin()));
        assert!(!is_fresh_at(&entry, DAY, origin() + chrono::Duration::hours(25)));
    }

    #[test]
    fn test_boundary_is_stale() {
        let entry = entry_dated(Some(origin()));
        assert!(!is_fresh_at(&entry, DAY, origin() + chrono::Duration::hours(24)));
    }

    #[test]
    fn test_missing_date_is_stale() {
        let entry = entry_dated(None);
        assert!(!is_fresh_at(&entry, DAY, origin()));
        assert!(age_at(&entry, origin()).is_none());
    }

    #[test]
    fn test_future_date_is_fresh() {
        let entry = entry_dated(Some(origin() + chrono::Duration::minutes(5)));
        assert!(is_fresh_at(&entry, DAY, origin()));
        assert!(age_at(&entry, origin()).unwrap() < chrono::Duration::zero());
    }

    #[test]
    fn test_crossing_is_monotonic() {
        let entry = entry_dated(Some(origin()));
        let max_age = Duration::from_secs(600);
        let mut seen_stale = false;
        for minute in 0..30 {
            let fresh = is_fresh_at(&entry, max_age, origin() + chrono::Duration::minutes(minute));
            if seen_stale {
                assert!(!fresh, "entry became fresh again at minute {minute}");
            }
            seen_stale |= !fresh;
        }
        assert!(seen_stale);
    }

    #[test]
    fn test_huge_max_age_never_expires() {
        let entry = entry_dated(Some(origin()));
        assert!(is_fresh_at(&entry, Duration::MAX, origin() + chrono::Duration::days(3650)));
    }

    #[test]
    fn test_is_fresh_uses_wall_clock() {
        let entry = entry_dated(Some(Utc::now()));
        assert!(is_fresh(&entry, DAY));
    }
}
