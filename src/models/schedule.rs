use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::validate_weekdays;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "slot_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
    Completed,
}

impl SlotStatus {
    /// Allowed manual status changes for a slot.
    pub fn can_transition_to(&self, next: SlotStatus) -> bool {
        use SlotStatus::*;
        match (self, next) {
            (current, next) if *current == next => false,
            (Available, Booked | Blocked) => true,
            (Booked, Available | Completed | Blocked) => true,
            (Blocked, Available) => true,
            (Completed, _) => false,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub trainer_id: Uuid,
    pub student_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: SlotStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSlotRequest {
    /// Defaults to the calling trainer
    pub trainer_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i32,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub trainer_id: Option<Uuid>,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlotStatusRequest {
    pub status: SlotStatus,
    /// Required when marking a slot as booked on behalf of a student
    pub student_id: Option<Uuid>,
}

/// Recurring availability: every selected weekday between two dates, at every listed time.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecurringSlotRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 0 = Sunday .. 6 = Saturday
    #[validate(length(min = 1, max = 7), custom(function = "validate_weekdays"))]
    pub weekdays: Vec<u8>,
    /// At most 48 start times per day, one every half hour
    #[validate(length(min = 1, max = 48))]
    pub times: Vec<NaiveTime>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i32,
    pub trainer_id: Option<Uuid>,
}

/// A generated slot that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSlot {
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: SlotStatus,
}

#[derive(Debug, Serialize)]
pub struct RecurringPreview {
    pub count: usize,
    pub slots: Vec<DraftSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_transitions() {
        assert!(SlotStatus::Available.can_transition_to(SlotStatus::Booked));
        assert!(SlotStatus::Available.can_transition_to(SlotStatus::Blocked));
        assert!(SlotStatus::Booked.can_transition_to(SlotStatus::Completed));
        assert!(SlotStatus::Booked.can_transition_to(SlotStatus::Available));
        assert!(SlotStatus::Blocked.can_transition_to(SlotStatus::Available));

        assert!(!SlotStatus::Available.can_transition_to(SlotStatus::Completed));
        assert!(!SlotStatus::Completed.can_transition_to(SlotStatus::Available));
        assert!(!SlotStatus::Booked.can_transition_to(SlotStatus::Booked));
    }

    fn recurring(weekdays: Vec<u8>, times: Vec<NaiveTime>) -> RecurringSlotRequest {
        RecurringSlotRequest {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            weekdays,
            times,
            duration_minutes: 60,
            trainer_id: None,
        }
    }

    #[test]
    fn test_recurring_request_bounds_times_per_day() {
        let every_half_hour: Vec<NaiveTime> = (0..48)
            .map(|i| NaiveTime::from_hms_opt(i / 2, (i % 2) * 30, 0).unwrap())
            .collect();
        assert!(recurring(vec![1, 3], every_half_hour.clone()).validate().is_ok());

        let mut too_many = every_half_hour;
        too_many.push(NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        let errors = recurring(vec![1, 3], too_many).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("times"));

        let errors = recurring(vec![1], vec![]).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("times"));
    }

    #[test]
    fn test_recurring_request_bounds_weekdays() {
        let seven_am = vec![NaiveTime::from_hms_opt(7, 0, 0).unwrap()];
        assert!(recurring(vec![0, 1, 2, 3, 4, 5, 6], seven_am.clone()).validate().is_ok());

        let errors = recurring(vec![1; 8], seven_am.clone()).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("weekdays"));

        let errors = recurring(vec![], seven_am).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("weekdays"));
    }
}
