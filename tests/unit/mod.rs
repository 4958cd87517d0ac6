// Pure business logic: calculators, slot generation, templating and tokens

pub mod body_composition_test;
pub mod jwt_test;
pub mod message_template_test;
pub mod recurring_schedule_test;
