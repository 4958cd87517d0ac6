use fitdesk::auth::UserRole;
use fitdesk::models::{AssignTemplateRequest, CreateRoutineRequest, CreateWorkoutLogRequest, ExerciseInput};
use fitdesk::services::WorkoutService;
use uuid::Uuid;

use crate::common::{DatabaseTestHelpers, TestDatabase};

fn squat() -> ExerciseInput {
    ExerciseInput {
        name: "Back squat".to_string(),
        sets: 4,
        reps: "8-10".to_string(),
        weight_kg: Some(60.0),
        rest_seconds: Some(120),
        video_url: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_template_assignment_and_idempotent_logs() {
    let Some(db) = TestDatabase::connect().await else {
        println!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let workouts = WorkoutService::new(db.pool.clone());

    let tenant = DatabaseTestHelpers::create_tenant(&db.pool).await;
    let trainer = DatabaseTestHelpers::create_user(&db.pool, Some(tenant), UserRole::Trainer).await;
    let student = DatabaseTestHelpers::create_student(&db.pool, tenant, None).await;
    let other_student = DatabaseTestHelpers::create_student(&db.pool, tenant, None).await;

    let template = workouts
        .create_routine(
            tenant,
            trainer,
            &CreateRoutineRequest {
                student_id: None,
                name: "Lower body".to_string(),
                description: None,
                exercises: vec![squat()],
            },
        )
        .await
        .unwrap();
    assert!(template.routine.is_template);

    let assigned = workouts
        .assign_template(
            tenant,
            template.routine.id,
            trainer,
            &AssignTemplateRequest { student_id: student, name: None },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!assigned.routine.is_template);
    assert_eq!(assigned.routine.student_id, Some(student));
    assert_eq!(assigned.exercises.len(), 1);
    assert_ne!(assigned.exercises[0].id, template.exercises[0].id);

    let request = CreateWorkoutLogRequest {
        client_log_id: Uuid::new_v4(),
        completed_at: None,
        duration_minutes: Some(50),
        perceived_effort: Some(7),
        notes: None,
    };

    let first = workouts
        .log_workout(tenant, student, assigned.routine.id, &request)
        .await
        .unwrap()
        .unwrap();
    let retried = workouts
        .log_workout(tenant, student, assigned.routine.id, &request)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, retried.id);

    let logs = workouts.list_logs(tenant, student, None).await.unwrap();
    assert_eq!(logs.len(), 1);

    // A routine that belongs to someone else cannot be logged against
    let foreign = workouts
        .log_workout(tenant, other_student, assigned.routine.id, &request)
        .await
        .unwrap();
    assert!(foreign.is_none());
}
