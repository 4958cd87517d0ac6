use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use fitdesk::models::{RecurringSlotRequest, SlotStatus};
use fitdesk::services::recurring_schedule::{generate_recurring_slots, range_days};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

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
        duration_minutes: 45,
        trainer_id: None,
    }
}

#[test]
fn test_two_weeks_of_monday_wednesday_friday() {
    // 2024-03-04 is a Monday
    let slots = generate_recurring_slots(&request(
        date(2024, 3, 4),
        date(2024, 3, 17),
        vec![1, 3, 5],
        vec![time(18, 0), time(7, 0)],
    ));

    assert_eq!(slots.len(), 12);
    assert_eq!(slots[0].slot_date, date(2024, 3, 4));
    assert_eq!(slots[0].start_time, time(7, 0));
    assert_eq!(slots[1].start_time, time(18, 0));
    assert_eq!(slots.last().map(|s| s.slot_date), Some(date(2024, 3, 15)));
    assert!(slots.iter().all(|s| s.status == SlotStatus::Available && s.duration_minutes == 45));
}

#[test]
fn test_sunday_is_day_zero() {
    // 2024-03-03 is a Sunday
    let slots = generate_recurring_slots(&request(date(2024, 3, 3), date(2024, 3, 9), vec![0], vec![time(9, 0)]));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].slot_date, date(2024, 3, 3));
}

#[test]
fn test_empty_inputs_generate_nothing() {
    let start = date(2024, 3, 4);
    assert!(generate_recurring_slots(&request(start, start, vec![], vec![time(9, 0)])).is_empty());
    assert!(generate_recurring_slots(&request(start, start, vec![1], vec![])).is_empty());
    assert!(generate_recurring_slots(&request(start, date(2024, 3, 1), vec![1], vec![time(9, 0)])).is_empty());
}

#[test]
fn test_range_days_is_inclusive() {
    assert_eq!(range_days(date(2024, 1, 1), date(2024, 1, 1)), 1);
    assert_eq!(range_days(date(2024, 1, 1), date(2024, 12, 31)), 366);
    assert_eq!(range_days(date(2024, 1, 2), date(2024, 1, 1)), 0);
}

proptest! {
    #[test]
    fn generated_slots_respect_the_request(
        offset in 0i64..400,
        length in 0i64..60,
        weekdays in proptest::collection::vec(0u8..7, 0..7),
        hours in proptest::collection::vec(5u32..22, 0..4),
    ) {
        let start = date(2024, 1, 1) + chrono::Duration::days(offset);
        let end = start + chrono::Duration::days(length);
        let times: Vec<NaiveTime> = hours.iter().map(|h| time(*h, 0)).collect();
        let slots = generate_recurring_slots(&request(start, end, weekdays.clone(), times.clone()));

        let wanted_days: BTreeSet<u32> = weekdays.iter().map(|d| u32::from(*d)).collect();
        let distinct_times: BTreeSet<NaiveTime> = times.into_iter().collect();

        for slot in &slots {
            prop_assert!(slot.slot_date >= start && slot.slot_date <= end);
            prop_assert!(wanted_days.contains(&slot.slot_date.weekday().num_days_from_sunday()));
            prop_assert!(distinct_times.contains(&slot.start_time));
        }

        for pair in slots.windows(2) {
            prop_assert!((pair[0].slot_date, pair[0].start_time) < (pair[1].slot_date, pair[1].start_time));
        }

        let matching_days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| wanted_days.contains(&d.weekday().num_days_from_sunday()))
            .count();
        prop_assert_eq!(slots.len(), matching_days * distinct_times.len());
    }
}
