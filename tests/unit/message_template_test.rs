use chrono::{NaiveDate, Utc};
use fitdesk::models::{EnrollmentStatus, FitnessLevel, Student};
use fitdesk::services::message_template::{render_template, student_variables, TemplateVars};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use uuid::Uuid;

fn student(full_name: &str) -> Student {
    Student {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        trainer_id: None,
        user_id: None,
        full_name: full_name.to_string(),
        email: None,
        phone: None,
        birth_date: None,
        gender: None,
        goal: None,
        level: FitnessLevel::Beginner,
        status: EnrollmentStatus::Active,
        notes: None,
        deleted_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_welcome_message() {
    let vars = student_variables(
        &student("Ana Clara Souza"),
        Some("Rafael"),
        "Iron Gym",
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
    );

    let rendered = render_template(
        "Hi {{first_name}}! Welcome to {{academy_name}}, {{trainer_name}} will coach you from {{today}}.",
        &vars,
    );
    assert_eq!(rendered, "Hi Ana! Welcome to Iron Gym, Rafael will coach you from 05/03/2024.");
}

#[test]
fn test_missing_trainer_renders_empty() {
    let vars = student_variables(&student("Bruno"), None, "Iron Gym", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(render_template("[{{trainer_name}}]", &vars), "[]");
    assert_eq!(render_template("{{student_name}}", &vars), "Bruno");
}

#[test]
fn test_unclosed_and_unknown_placeholders_are_kept() {
    let vars: TemplateVars = [("first_name".to_string(), "Ana".to_string())].into_iter().collect();
    assert_eq!(render_template("{{first_name}} {{nickname}} {{first_name", &vars), "Ana {{nickname}} {{first_name");
}

proptest! {
    #[test]
    fn text_without_placeholders_is_unchanged(text in "[^{}]*") {
        let vars: TemplateVars = [("a".to_string(), "b".to_string())].into_iter().collect();
        prop_assert_eq!(render_template(&text, &vars), text);
    }

    #[test]
    fn values_are_not_expanded_twice(value in "[a-z{}]{0,20}") {
        let vars: TemplateVars = [
            ("name".to_string(), value.clone()),
            ("other".to_string(), "X".to_string()),
        ]
        .into_iter()
        .collect();
        prop_assert_eq!(render_template("{{name}}", &vars), value);
    }
}
