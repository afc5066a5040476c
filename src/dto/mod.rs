use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

pub mod event;
pub mod health;
pub mod roster;
pub mod session;
pub mod sse;
pub mod validation;

const TIME_OF_DAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute] [period]");

/// Render a join instant (ms since epoch) as `hh:mm AM/PM` in `offset`.
fn format_time_of_day(timestamp_ms: i64, offset: UtcOffset) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .ok()
        .and_then(|instant| instant.to_offset(offset).format(TIME_OF_DAY_FORMAT).ok())
        .unwrap_or_else(|| "--:--".into())
}

fn format_instant(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_follows_offset() {
        // 2025-12-10T19:05:00Z
        let ms = 1_765_393_500_000;
        assert_eq!(format_time_of_day(ms, UtcOffset::UTC), "07:05 PM");
        let plus_one = UtcOffset::from_hms(1, 0, 0).unwrap();
        assert_eq!(format_time_of_day(ms, plus_one), "08:05 PM");
        assert_eq!(format_time_of_day(0, UtcOffset::UTC), "12:00 AM");
    }
}
