//! UTC timestamp formatting without a calendar dependency.
//!
//! Two shapes are produced: the ISO 8601 form written into manifests
//! (`YYYY-MM-DDThh:mm:ssZ`) and a compact form used in backup directory
//! names (`YYYYMMDDThhmmssZ`), which is safe on every filesystem.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

/// Broken-down UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Civil {
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl Civil {
    fn from_epoch_secs(epoch_secs: u64) -> Self {
        let (year, month, day) = civil_from_epoch(epoch_secs);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "seconds within a day always fit in u32"
        )]
        let day_secs = (epoch_secs % 86_400) as u32;
        Self {
            year,
            month,
            day,
            hour: day_secs / 3_600,
            minute: (day_secs % 3_600) / 60,
            second: day_secs % 60,
        }
    }
}

/// Return the current UTC time as `YYYY-MM-DDThh:mm:ssZ`.
///
/// # Errors
///
/// Returns an error if the system clock reads earlier than the Unix epoch.
pub fn now_iso8601() -> Result<String, SystemTimeError> {
    Ok(format_iso8601(epoch_now()?))
}

/// Return the current UTC time as `YYYYMMDDThhmmssZ`.
///
/// # Errors
///
/// Returns an error if the system clock reads earlier than the Unix epoch.
pub fn now_compact() -> Result<String, SystemTimeError> {
    Ok(format_compact(epoch_now()?))
}

/// Format a Unix epoch timestamp as `YYYY-MM-DDThh:mm:ssZ`.
#[must_use]
pub fn format_iso8601(epoch_secs: u64) -> String {
    let c = Civil::from_epoch_secs(epoch_secs);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        c.year, c.month, c.day, c.hour, c.minute, c.second
    )
}

/// Format a Unix epoch timestamp as `YYYYMMDDThhmmssZ`.
#[must_use]
pub fn format_compact(epoch_secs: u64) -> String {
    let c = Civil::from_epoch_secs(epoch_secs);
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        c.year, c.month, c.day, c.hour, c.minute, c.second
    )
}

/// Return true when `ts` has the `YYYY-MM-DDThh:mm:ssZ` shape.
#[must_use]
pub fn is_iso8601(ts: &str) -> bool {
    let b = ts.as_bytes();
    b.len() == 20
        && b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b'T'
        && b[13] == b':'
        && b[16] == b':'
        && b[19] == b'Z'
        && [0..4, 5..7, 8..10, 11..13, 14..16, 17..19]
            .into_iter()
            .all(|range| b[range].iter().all(u8::is_ascii_digit))
}

fn epoch_now() -> Result<u64, SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Convert a Unix epoch timestamp to a `(year, month, day)` triple.
///
/// Howard Hinnant's `civil_from_days` algorithm.
fn civil_from_epoch(epoch_secs: u64) -> (u32, u32, u32) {
    #[expect(
        clippy::cast_possible_wrap,
        reason = "day counts since 1970 are far below i64::MAX"
    )]
    let z = (epoch_secs / 86_400) as i64 + 719_468;
    let era = z.div_euclid(146_097);
    #[expect(clippy::cast_sign_loss, reason = "rem_euclid is never negative")]
    let doe = z.rem_euclid(146_097) as u64; // day of era [0, 146_096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    #[expect(clippy::cast_possible_wrap, reason = "year of era is below 400")]
    let y = (yoe as i64) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "post-epoch years, months, and days are small and positive"
    )]
    (y as u32, m as u32, d as u32)
}
