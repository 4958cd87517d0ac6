use anyhow::Result;
use chrono::{Duration, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::UserRole;
use crate::models::*;
use crate::services::recurring_schedule::generate_recurring_slots;
use crate::services::*;

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "Fitdesk#2024";

pub const DEMO_SUPER_ADMIN_EMAIL: &str = "platform@fitdesk.dev";
pub const DEMO_ADMIN_EMAIL: &str = "owner@irongym.dev";
pub const DEMO_TRAINER_EMAIL: &str = "coach@irongym.dev";
pub const DEMO_STUDENT_EMAIL: &str = "ana.souza@irongym.dev";

/// Demo data for local development. Safe to run repeatedly.
pub struct DatabaseSeeder {
    pool: PgPool,
}

struct DemoTeam {
    tenant_id: Uuid,
    trainer_id: Uuid,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn seed_all(&self) -> Result<()> {
        let already_seeded = sqlx::query("SELECT 1 FROM users WHERE email = $1")
            .bind(DEMO_SUPER_ADMIN_EMAIL)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if already_seeded {
            tracing::info!("Demo data already present, skipping seeding");
            return Ok(());
        }

        tracing::info!("Starting database seeding...");

        let plan_id = self.seed_plans().await?;
        self.seed_user(None, DEMO_SUPER_ADMIN_EMAIL, "Platform Admin", UserRole::SuperAdmin)
            .await?;
        let team = self.seed_academy(plan_id).await?;
        self.seed_students(&team).await?;
        self.seed_schedule(&team).await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    /// Returns the plan the demo academy subscribes to
    async fn seed_plans(&self) -> Result<Uuid> {
        let billing = BillingService::new(self.pool.clone(), "");

        let plans = [
            ("Starter", 4_990, BillingInterval::Monthly, Some(30)),
            ("Pro", 9_990, BillingInterval::Monthly, Some(150)),
            ("Pro Yearly", 99_900, BillingInterval::Yearly, Some(150)),
        ];

        let mut pro_plan = None;
        for (name, price_cents, billing_interval, max_students) in plans {
            let plan = billing
                .create_plan(&CreatePlanRequest {
                    name: name.to_string(),
                    price_cents,
                    currency: Some("BRL".to_string()),
                    billing_interval,
                    max_students,
                })
                .await?;
            if name == "Pro" {
                pro_plan = Some(plan.id);
            }
        }

        tracing::info!("Created demo plans");
        pro_plan.ok_or_else(|| anyhow::anyhow!("Pro plan was not created"))
    }

    async fn seed_user(&self, tenant_id: Option<Uuid>, email: &str, full_name: &str, role: UserRole) -> Result<Uuid> {
        let password_hash = hash_password(DEMO_PASSWORD)?;

        let user_id = sqlx::query_scalar(
            "INSERT INTO users (tenant_id, email, password_hash, full_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(tenant_id)
        .bind(email)
        .bind(&password_hash)
        .bind(full_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(email, role = role.as_str(), "Created demo user");
        Ok(user_id)
    }

    async fn seed_academy(&self, plan_id: Uuid) -> Result<DemoTeam> {
        let tenant_id: Uuid = sqlx::query_scalar(
            "INSERT INTO tenants (name, tenant_type, plan_id, status, owner_name, owner_email, owner_phone)
             VALUES ('Iron Gym', 'academy', $1, 'active', 'Carla Mendes', $2, '+55 11 99999-0000')
             RETURNING id",
        )
        .bind(plan_id)
        .bind(DEMO_ADMIN_EMAIL)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            "INSERT INTO subscriptions (tenant_id, plan_id, status, current_period_end)
             VALUES ($1, $2, 'active', $3)",
        )
        .bind(tenant_id)
        .bind(plan_id)
        .bind(Utc::now() + Duration::days(30))
        .execute(&self.pool)
        .await?;

        self.seed_user(Some(tenant_id), DEMO_ADMIN_EMAIL, "Carla Mendes", UserRole::Admin)
            .await?;
        let trainer_id = self
            .seed_user(Some(tenant_id), DEMO_TRAINER_EMAIL, "Rafael Lima", UserRole::Trainer)
            .await?;

        AutoMessageService::new(self.pool.clone())
            .create(
                tenant_id,
                &CreateAutoMessageRequest {
                    name: "Welcome".to_string(),
                    trigger: AutoMessageTrigger::Welcome,
                    body: "Hi {{first_name}}, welcome to {{academy_name}}! {{trainer_name}} will be your coach."
                        .to_string(),
                    active: Some(true),
                },
            )
            .await?;

        tracing::info!(%tenant_id, "Created demo academy");
        Ok(DemoTeam { tenant_id, trainer_id })
    }

    async fn seed_students(&self, team: &DemoTeam) -> Result<()> {
        let student_user_id = self
            .seed_user(Some(team.tenant_id), DEMO_STUDENT_EMAIL, "Ana Souza", UserRole::Student)
            .await?;

        let demo_students = [
            ("Ana Souza", Some(DEMO_STUDENT_EMAIL), Gender::Female, Some(student_user_id)),
            ("Bruno Costa", None, Gender::Male, None),
        ];

        let workouts = WorkoutService::new(self.pool.clone());
        let assessments = AssessmentService::new(self.pool.clone());

        let template = workouts
            .create_routine(
                team.tenant_id,
                team.trainer_id,
                &CreateRoutineRequest {
                    student_id: None,
                    name: "Full body A".to_string(),
                    description: Some("Beginner full body session".to_string()),
                    exercises: vec![
                        demo_exercise("Goblet squat", 3, "12"),
                        demo_exercise("Push-up", 3, "8-12"),
                        demo_exercise("Plank", 3, "30s"),
                    ],
                },
            )
            .await?;

        for (full_name, email, gender, user_id) in demo_students {
            let student_id: Uuid = sqlx::query_scalar(
                "INSERT INTO students (tenant_id, trainer_id, user_id, full_name, email, gender, level, status)
                 VALUES ($1, $2, $3, $4, $5, $6, 'beginner', 'active')
                 RETURNING id",
            )
            .bind(team.tenant_id)
            .bind(team.trainer_id)
            .bind(user_id)
            .bind(full_name)
            .bind(email)
            .bind(gender)
            .fetch_one(&self.pool)
            .await?;

            workouts
                .assign_template(
                    team.tenant_id,
                    template.routine.id,
                    team.trainer_id,
                    &AssignTemplateRequest { student_id, name: None },
                )
                .await?;

            let (weight_kg, hip_cm) = match gender {
                Gender::Female => (62.0, Some(98.0)),
                Gender::Male => (81.0, None),
            };
            assessments
                .create(
                    team.tenant_id,
                    student_id,
                    team.trainer_id,
                    &CreateAssessmentRequest {
                        assessed_on: None,
                        weight_kg,
                        height_cm: 170.0,
                        waist_cm: Some(78.0),
                        hip_cm,
                        neck_cm: Some(35.0),
                        chest_cm: None,
                        arm_cm: None,
                        thigh_cm: None,
                        calf_cm: None,
                        notes: None,
                    },
                )
                .await?;
        }

        tracing::info!("Created demo students");
        Ok(())
    }

    async fn seed_schedule(&self, team: &DemoTeam) -> Result<()> {
        let today = Utc::now().date_naive();
        let drafts = generate_recurring_slots(&RecurringSlotRequest {
            start_date: today,
            end_date: today + Duration::days(13),
            weekdays: vec![1, 3, 5],
            times: [(7, 0), (18, 30)]
                .into_iter()
                .filter_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .collect(),
            duration_minutes: 60,
            trainer_id: Some(team.trainer_id),
        });

        let slots = ScheduleService::new(self.pool.clone())
            .create_slots_batch(team.tenant_id, team.trainer_id, &drafts)
            .await?;

        tracing::info!(count = slots.len(), "Created demo schedule");
        Ok(())
    }
}

fn demo_exercise(name: &str, sets: i32, reps: &str) -> ExerciseInput {
    ExerciseInput {
        name: name.to_string(),
        sets,
        reps: reps.to_string(),
        weight_kg: None,
        rest_seconds: Some(60),
        video_url: None,
        notes: None,
    }
}
