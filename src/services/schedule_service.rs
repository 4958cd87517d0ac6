use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    CreateNotification, CreateSlotRequest, DraftSlot, NotificationType, ScheduleSlot, SlotQuery, SlotStatus,
    UpdateSlotStatusRequest,
};
use crate::services::{DomainError, NotificationService};

const SLOT_COLUMNS: &str = "id, tenant_id, trainer_id, student_id, slot_date, start_time, duration_minutes, status, notes, created_at, updated_at";

/// Trainer availability and student bookings
#[derive(Clone)]
pub struct ScheduleService {
    db: PgPool,
    notifications: NotificationService,
}

impl ScheduleService {
    pub fn new(db: PgPool) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self { db, notifications }
    }

    pub async fn list_slots(&self, tenant_id: Uuid, query: &SlotQuery) -> Result<Vec<ScheduleSlot>> {
        let slots = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots
             WHERE tenant_id = $1 AND slot_date BETWEEN $2 AND $3
               AND ($4::uuid IS NULL OR trainer_id = $4)
               AND ($5::slot_status IS NULL OR status = $5)
             ORDER BY slot_date, start_time"
        ))
        .bind(tenant_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.trainer_id)
        .bind(query.status)
        .fetch_all(&self.db)
        .await?;

        Ok(slots)
    }

    async fn get_slot(&self, tenant_id: Uuid, slot_id: Uuid) -> Result<Option<ScheduleSlot>> {
        let slot = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(slot_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(slot)
    }

    async fn ensure_student(&self, tenant_id: Uuid, student_id: Uuid) -> Result<()> {
        let exists = sqlx::query("SELECT 1 FROM students WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL")
            .bind(student_id)
            .bind(tenant_id)
            .fetch_optional(&self.db)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound("Student").into()),
        }
    }

    async fn ensure_trainer(&self, tenant_id: Uuid, trainer_id: Uuid) -> Result<()> {
        let exists = sqlx::query(
            "SELECT 1 FROM users WHERE id = $1 AND tenant_id = $2 AND role IN ('admin', 'trainer') AND active",
        )
        .bind(trainer_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound("Trainer").into()),
        }
    }

    /// A single slot. Giving a student books it immediately.
    pub async fn create_slot(&self, tenant_id: Uuid, caller_id: Uuid, request: &CreateSlotRequest) -> Result<ScheduleSlot> {
        let trainer_id = request.trainer_id.unwrap_or(caller_id);
        self.ensure_trainer(tenant_id, trainer_id).await?;
        if let Some(student_id) = request.student_id {
            self.ensure_student(tenant_id, student_id).await?;
        }

        let status = if request.student_id.is_some() {
            SlotStatus::Booked
        } else {
            SlotStatus::Available
        };

        let slot = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "INSERT INTO schedule_slots (tenant_id, trainer_id, student_id, slot_date, start_time, duration_minutes, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_id)
        .bind(request.student_id)
        .bind(request.slot_date)
        .bind(request.start_time)
        .bind(request.duration_minutes)
        .bind(status)
        .bind(request.notes.as_deref())
        .fetch_one(&self.db)
        .await?;

        info!(slot_id = %slot.id, %trainer_id, ?status, "Schedule slot created");
        Ok(slot)
    }

    /// Persist generated drafts for one trainer. All rows are written or none.
    pub async fn create_slots_batch(
        &self,
        tenant_id: Uuid,
        trainer_id: Uuid,
        drafts: &[DraftSlot],
    ) -> Result<Vec<ScheduleSlot>> {
        if drafts.is_empty() {
            return Err(DomainError::invalid_input("No slots match the selected days and times"));
        }
        self.ensure_trainer(tenant_id, trainer_id).await?;

        let dates: Vec<NaiveDate> = drafts.iter().map(|d| d.slot_date).collect();
        let times: Vec<NaiveTime> = drafts.iter().map(|d| d.start_time).collect();
        let durations: Vec<i32> = drafts.iter().map(|d| d.duration_minutes).collect();

        let mut tx = self.db.begin().await?;

        let mut slots = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "INSERT INTO schedule_slots (tenant_id, trainer_id, slot_date, start_time, duration_minutes, status)
             SELECT $1, $2, d.slot_date, d.start_time, d.duration_minutes, 'available'
             FROM UNNEST($3::date[], $4::time[], $5::int4[]) AS d(slot_date, start_time, duration_minutes)
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(trainer_id)
        .bind(&dates)
        .bind(&times)
        .bind(&durations)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        slots.sort_by_key(|slot| (slot.slot_date, slot.start_time));
        info!(%trainer_id, count = slots.len(), "Recurring slots created");
        Ok(slots)
    }

    /// Staff status change, restricted to the allowed transitions.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        slot_id: Uuid,
        request: &UpdateSlotStatusRequest,
    ) -> Result<Option<ScheduleSlot>> {
        let Some(slot) = self.get_slot(tenant_id, slot_id).await? else {
            return Ok(None);
        };

        if !slot.status.can_transition_to(request.status) {
            return Err(DomainError::invalid_state(format!(
                "Slot cannot change from {:?} to {:?}",
                slot.status, request.status
            )));
        }

        let student_id = match request.status {
            SlotStatus::Booked => {
                let student_id = request
                    .student_id
                    .ok_or_else(|| DomainError::invalid_input("student_id is required to book a slot"))?;
                self.ensure_student(tenant_id, student_id).await?;
                Some(student_id)
            }
            SlotStatus::Completed => slot.student_id,
            SlotStatus::Available | SlotStatus::Blocked => None,
        };

        // Guarded on the previous status so concurrent changes do not interleave
        let updated = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "UPDATE schedule_slots SET status = $3, student_id = $4, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND status = $5
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(slot_id)
        .bind(tenant_id)
        .bind(request.status)
        .bind(student_id)
        .bind(slot.status)
        .fetch_optional(&self.db)
        .await?;

        match updated {
            Some(slot) => {
                info!(slot_id = %slot.id, status = ?slot.status, "Slot status changed");
                Ok(Some(slot))
            }
            None => Err(DomainError::conflict("Slot was changed by someone else")),
        }
    }

    pub async fn delete_slot(&self, tenant_id: Uuid, slot_id: Uuid) -> Result<bool> {
        let Some(slot) = self.get_slot(tenant_id, slot_id).await? else {
            return Ok(false);
        };
        if slot.status == SlotStatus::Booked {
            return Err(DomainError::conflict("Cancel the booking before deleting the slot"));
        }

        let result = sqlx::query("DELETE FROM schedule_slots WHERE id = $1 AND tenant_id = $2 AND status <> 'booked'")
            .bind(slot_id)
            .bind(tenant_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Student books an available slot. Only one booking can win.
    pub async fn book_slot(&self, tenant_id: Uuid, student_id: Uuid, slot_id: Uuid) -> Result<Option<ScheduleSlot>> {
        if self.get_slot(tenant_id, slot_id).await?.is_none() {
            return Ok(None);
        }

        let booked = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "UPDATE schedule_slots SET status = 'booked', student_id = $3, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND status = 'available'
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(slot_id)
        .bind(tenant_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(slot) = booked else {
            return Err(DomainError::conflict("Slot is no longer available"));
        };

        info!(slot_id = %slot.id, %student_id, "Slot booked");
        self.notify_trainer(&slot, NotificationType::SlotBooked, "Slot booked").await;
        Ok(Some(slot))
    }

    /// Student releases their own booking.
    pub async fn cancel_booking(&self, tenant_id: Uuid, student_id: Uuid, slot_id: Uuid) -> Result<Option<ScheduleSlot>> {
        let Some(slot) = self.get_slot(tenant_id, slot_id).await? else {
            return Ok(None);
        };
        if slot.student_id != Some(student_id) {
            return Ok(None);
        }
        if slot.status != SlotStatus::Booked {
            return Err(DomainError::invalid_state("Only booked slots can be canceled"));
        }

        let released = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "UPDATE schedule_slots SET status = 'available', student_id = NULL, updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND student_id = $3 AND status = 'booked'
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(slot_id)
        .bind(tenant_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(slot) = released else {
            return Err(DomainError::conflict("Slot was changed by someone else"));
        };

        info!(slot_id = %slot.id, %student_id, "Booking canceled");
        self.notify_trainer(&slot, NotificationType::SlotCanceled, "Booking canceled").await;
        Ok(Some(slot))
    }

    async fn notify_trainer(&self, slot: &ScheduleSlot, kind: NotificationType, title: &str) {
        let body = format!(
            "{} at {}",
            slot.slot_date.format("%d/%m/%Y"),
            slot.start_time.format("%H:%M")
        );
        self.notifications
            .notify(
                CreateNotification::new(Some(slot.tenant_id), slot.trainer_id, kind, title, body)
                    .with_link(format!("/schedule?date={}", slot.slot_date)),
            )
            .await;
    }

    /// Upcoming slots booked by one student
    pub async fn list_for_student(&self, tenant_id: Uuid, student_id: Uuid, from: NaiveDate) -> Result<Vec<ScheduleSlot>> {
        let slots = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots
             WHERE tenant_id = $1 AND student_id = $2 AND slot_date >= $3
             ORDER BY slot_date, start_time"
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(from)
        .fetch_all(&self.db)
        .await?;

        Ok(slots)
    }

    /// Open slots students can book, from a given date
    pub async fn list_available(&self, tenant_id: Uuid, from: NaiveDate) -> Result<Vec<ScheduleSlot>> {
        let slots = sqlx::query_as::<_, ScheduleSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots
             WHERE tenant_id = $1 AND status = 'available' AND slot_date >= $2
             ORDER BY slot_date, start_time
             LIMIT 200"
        ))
        .bind(tenant_id)
        .bind(from)
        .fetch_all(&self.db)
        .await?;

        Ok(slots)
    }

    pub async fn slots_on(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleSlot>> {
        self.list_slots(
            tenant_id,
            &SlotQuery {
                from: date,
                to: date,
                trainer_id: None,
                status: None,
            },
        )
        .await
    }
}
