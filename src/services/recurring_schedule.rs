//! Expands a recurring availability request into individual draft slots.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::models::{DraftSlot, RecurringSlotRequest, SlotStatus};

/// Longest date range accepted for a single recurring request.
pub const MAX_RECURRING_RANGE_DAYS: i64 = 366;

/// Number of calendar days covered by the request, both ends included.
/// Zero when the range is inverted.
pub fn range_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        0
    } else {
        (end - start).num_days() + 1
    }
}

/// Every date in `start_date..=end_date` whose weekday (0 = Sunday) is selected,
/// crossed with every requested time. Ordered by date then time; repeated
/// weekdays or times are collapsed.
pub fn generate_recurring_slots(request: &RecurringSlotRequest) -> Vec<DraftSlot> {
    if request.start_date > request.end_date {
        return Vec::new();
    }

    let weekdays: BTreeSet<u32> = request
        .weekdays
        .iter()
        .map(|day| u32::from(*day))
        .filter(|day| *day <= 6)
        .collect();
    let times: BTreeSet<_> = request.times.iter().copied().collect();

    if weekdays.is_empty() || times.is_empty() {
        return Vec::new();
    }

    request
        .start_date
        .iter_days()
        .take_while(|date| *date <= request.end_date)
        .filter(|date| weekdays.contains(&date.weekday().num_days_from_sunday()))
        .flat_map(|date| {
            times.iter().map(move |time| DraftSlot {
                slot_date: date,
                start_time: *time,
                duration_minutes: request.duration_minutes,
                status: SlotStatus::Available,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request(start: NaiveDate, end: NaiveDate, weekdays: Vec<u8>, times: Vec<NaiveTime>) -> RecurringSlotRequest {
        RecurringSlotRequest {
            start_date: start,
            end_date: end,
            weekdays,
            times,
            duration_minutes: 60,
            trainer_id: None,
        }
    }

    #[test]
    fn test_single_matching_day() {
        // 2024-01-01 was a Monday
        let slots = generate_recurring_slots(&request(date(2024, 1, 1), date(2024, 1, 1), vec![1], vec![time(7, 0)]));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_date, date(2024, 1, 1));
        assert_eq!(slots[0].status, SlotStatus::Available);
    }

    #[test]
    fn test_non_matching_weekday() {
        let slots = generate_recurring_slots(&request(date(2024, 1, 1), date(2024, 1, 1), vec![0], vec![time(7, 0)]));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_inverted_range() {
        let slots = generate_recurring_slots(&request(
            date(2024, 1, 10),
            date(2024, 1, 1),
            vec![0, 1, 2, 3, 4, 5, 6],
            vec![time(7, 0)],
        ));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_ordering_and_dedup() {
        // Monday and Wednesday of the first week of 2024, two times given out of order
        let slots = generate_recurring_slots(&request(
            date(2024, 1, 1),
            date(2024, 1, 7),
            vec![3, 1, 1],
            vec![time(18, 0), time(7, 30), time(18, 0)],
        ));

        let got: Vec<_> = slots.iter().map(|s| (s.slot_date, s.start_time)).collect();
        assert_eq!(
            got,
            vec![
                (date(2024, 1, 1), time(7, 30)),
                (date(2024, 1, 1), time(18, 0)),
                (date(2024, 1, 3), time(7, 30)),
                (date(2024, 1, 3), time(18, 0)),
            ]
        );
    }

    #[test]
    fn test_empty_selections() {
        assert!(generate_recurring_slots(&request(date(2024, 1, 1), date(2024, 1, 31), vec![], vec![time(7, 0)])).is_empty());
        assert!(generate_recurring_slots(&request(date(2024, 1, 1), date(2024, 1, 31), vec![1], vec![])).is_empty());
        assert!(generate_recurring_slots(&request(date(2024, 1, 1), date(2024, 1, 31), vec![9], vec![time(7, 0)])).is_empty());
    }

    #[test]
    fn test_range_days() {
        assert_eq!(range_days(date(2024, 1, 1), date(2024, 1, 1)), 1);
        assert_eq!(range_days(date(2024, 1, 1), date(2024, 12, 31)), 366);
        assert_eq!(range_days(date(2024, 1, 2), date(2024, 1, 1)), 0);
    }
}
