use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Zone used when a reminder has no timezone or an unknown one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Resolve an IANA zone name, falling back to [`DEFAULT_TIMEZONE`].
pub fn resolve(name: Option<&str>) -> Tz {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return DEFAULT_TIMEZONE;
    };
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(e) => {
            warn!("Unknown timezone '{}' ({}), using {}", name, e, DEFAULT_TIMEZONE);
            DEFAULT_TIMEZONE
        }
    }
}

/// Offset of `tz` at `instant`, as local minus UTC in minutes.
///
/// Europe/Paris is +60 in January and +120 in July.
pub fn offset_minutes(instant: DateTime<Utc>, tz: Tz) -> i32 {
    tz.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
        / 60
}
