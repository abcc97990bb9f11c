//! Running-streak annotation for exported activities.

use chrono::NaiveDate;

use crate::ActivityRecord;

/// Assigns `streak` to each record: the number of consecutive calendar days,
/// ending on the record's local start date, that have at least one activity.
///
/// Records must already be ordered by `start_date_local`. Several activities
/// on the same day share a streak value; a missed day resets it to 1. A
/// record whose local date cannot be read gets no streak and breaks the
/// chain.
pub fn assign_streaks(records: &mut [ActivityRecord]) {
    let mut last: Option<NaiveDate> = None;
    let mut streak = 0u32;

    for record in records.iter_mut() {
        let Some(date) = local_date(&record.start_date_local) else {
            record.streak = None;
            last = None;
            streak = 0;
            continue;
        };

        streak = match last {
            Some(prev) if prev == date => streak,
            Some(prev) if prev.succ_opt() == Some(date) => streak + 1,
            _ => 1,
        };
        record.streak = Some(streak);
        last = Some(date);
    }
}

fn local_date(start_date_local: &str) -> Option<NaiveDate> {
    let day = start_date_local.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
