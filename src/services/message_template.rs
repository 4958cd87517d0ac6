//! `{{placeholder}}` substitution for automatic messages and e-mail bodies.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::Student;

pub type TemplateVars = HashMap<String, String>;

/// Replace every `{{key}}` whose key is in `vars` with its value. Unknown
/// placeholders stay as written and values are inserted verbatim, so a value
/// that itself contains `{{...}}` is not expanded again.
pub fn render_template(template: &str, vars: &TemplateVars) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        match after_open.find("}}") {
            Some(close) => {
                let key = &after_open[..close];
                match vars.get(key) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        rendered.push_str("{{");
                        rendered.push_str(key);
                        rendered.push_str("}}");
                    }
                }
                rest = &after_open[close + 2..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Variables available to every automatic message.
pub fn student_variables(
    student: &Student,
    trainer_name: Option<&str>,
    academy_name: &str,
    today: NaiveDate,
) -> TemplateVars {
    let mut vars = TemplateVars::new();
    vars.insert("student_name".to_string(), student.full_name.clone());
    vars.insert("first_name".to_string(), student.first_name().to_string());
    vars.insert("trainer_name".to_string(), trainer_name.unwrap_or_default().to_string());
    vars.insert("academy_name".to_string(), academy_name.to_string());
    vars.insert("today".to_string(), today.format("%d/%m/%Y").to_string());
    vars
}
