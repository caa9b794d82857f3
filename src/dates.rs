use once_cell::sync::Lazy;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

static LOCAL_OFFSET: Lazy<UtcOffset> = Lazy::new(|| match UtcOffset::current_local_offset() {
    Ok(offset) => offset,
    Err(err) => {
        tracing::debug!(%err, "local utc offset unavailable, using UTC");
        UtcOffset::UTC
    }
});

/// Resolves the local offset while the process is still single-threaded.
pub fn init_local_offset() {
    Lazy::force(&LOCAL_OFFSET);
}

pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET
}

pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

/// Tooltip label for a creation time, relative to the current local day.
pub fn relative_created(created: OffsetDateTime) -> String {
    describe_created(created, now_local())
}

/// `Today, 2:03:07 PM`, `Yesterday, 11:59:00 PM` or `10/15/2026`.
///
/// Days are compared by calendar date in `now`'s offset, never by elapsed
/// time.
pub fn describe_created(created: OffsetDateTime, now: OffsetDateTime) -> String {
    let created = created.to_offset(now.offset());
    let today = now.date();
    if created.date() == today {
        format!("Today, {}", format_clock(created))
    } else if today.previous_day() == Some(created.date()) {
        format!("Yesterday, {}", format_clock(created))
    } else {
        format_calendar_date(created)
    }
}

fn format_clock(dt: OffsetDateTime) -> String {
    dt.format(format_description!(
        "[hour repr:12 padding:none]:[minute]:[second] [period]"
    ))
    .unwrap_or_else(|_| fallback(dt))
}

fn format_calendar_date(dt: OffsetDateTime) -> String {
    dt.format(format_description!(
        "[month padding:none]/[day padding:none]/[year]"
    ))
    .unwrap_or_else(|_| fallback(dt))
}

fn fallback(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::describe_created;
    use time::macros::datetime;

    #[test]
    fn same_calendar_day_reads_today() {
        let now = datetime!(2026-10-17 18:30 UTC);
        let created = datetime!(2026-10-17 14:03:07 UTC);
        assert_eq!(describe_created(created, now), "Today, 2:03:07 PM");
    }

    #[test]
    fn two_minutes_across_midnight_reads_yesterday() {
        let now = datetime!(2026-10-17 00:01 UTC);
        let created = datetime!(2026-10-16 23:59 UTC);
        assert_eq!(describe_created(created, now), "Yesterday, 11:59:00 PM");
    }

    #[test]
    fn almost_two_days_apart_still_reads_yesterday() {
        let now = datetime!(2026-10-17 23:59 UTC);
        let created = datetime!(2026-10-16 0:00 UTC);
        assert_eq!(describe_created(created, now), "Yesterday, 12:00:00 AM");
    }

    #[test]
    fn older_dates_show_only_the_date() {
        let now = datetime!(2026-10-17 9:00 UTC);
        let created = datetime!(2026-10-05 9:00 UTC);
        assert_eq!(describe_created(created, now), "10/5/2026");
    }

    #[test]
    fn compares_dates_in_the_viewer_offset() {
        let now = datetime!(2026-10-17 10:00 -5);
        let created = datetime!(2026-10-17 1:00 UTC);
        assert_eq!(describe_created(created, now), "Yesterday, 8:00:00 PM");
    }

    #[test]
    fn year_boundary_yesterday() {
        let now = datetime!(2027-01-01 8:15 UTC);
        let created = datetime!(2026-12-31 22:00 UTC);
        assert_eq!(describe_created(created, now), "Yesterday, 10:00:00 PM");
    }
}
