use futures::future::BoxFuture;
use tracing::info;

use crate::services::message_template::{render_template, TemplateVars};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
}

/// Outbound e-mail delivery. Production wiring points this at a provider.
pub trait Mailer: Send + Sync {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            info!(to = %email.to, subject = %email.subject, "Sending email\n{}", email.text_body);
            Ok(())
        })
    }
}

const INVITATION_SUBJECT: &str = "You have been invited to {{academy_name}}";
const INVITATION_BODY: &str = "Hi {{full_name}},\n\n\
{{academy_name}} created an account for you. Choose your password here:\n\
{{link}}\n\n\
The link expires in {{expires_hours}} hours.";

const PASSWORD_RESET_SUBJECT: &str = "Reset your password";
const PASSWORD_RESET_BODY: &str = "Hi {{full_name}},\n\n\
Use the link below to choose a new password:\n\
{{link}}\n\n\
The link expires in {{expires_hours}} hours. If you did not ask for this, ignore this message.";

fn email_vars(pairs: [(&str, &str); 4]) -> TemplateVars {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn invitation_email(to: &str, full_name: &str, academy_name: &str, link: &str, expires_hours: i64) -> OutgoingEmail {
    let hours = expires_hours.to_string();
    let vars = email_vars([
        ("full_name", full_name),
        ("academy_name", academy_name),
        ("link", link),
        ("expires_hours", &hours),
    ]);

    OutgoingEmail {
        to: to.to_string(),
        subject: render_template(INVITATION_SUBJECT, &vars),
        text_body: render_template(INVITATION_BODY, &vars),
    }
}

pub fn password_reset_email(to: &str, full_name: &str, link: &str, expires_hours: i64) -> OutgoingEmail {
    let hours = expires_hours.to_string();
    let vars = email_vars([
        ("full_name", full_name),
        ("academy_name", ""),
        ("link", link),
        ("expires_hours", &hours),
    ]);

    OutgoingEmail {
        to: to.to_string(),
        subject: render_template(PASSWORD_RESET_SUBJECT, &vars),
        text_body: render_template(PASSWORD_RESET_BODY, &vars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_email() {
        let email = invitation_email(
            "joao@example.com",
            "João Silva",
            "Iron Gym",
            "https://app.example.com/reset-password?token=abc",
            72,
        );

        assert_eq!(email.subject, "You have been invited to Iron Gym");
        assert!(email.text_body.contains("token=abc"));
        assert!(email.text_body.contains("72 hours"));
        assert!(!email.text_body.contains("{{"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let mailer = LogMailer;
        let email = password_reset_email("a@example.com", "Ana", "https://x/reset", 2);
        assert!(mailer.send(email).await.is_ok());
    }
}
