use crate::domain::ports::Mailer;
use crate::error::Result;
use async_trait::async_trait;

/// Delivers password-reset mail to the log instead of an SMTP relay.
#[derive(Debug, Clone)]
pub struct LogMailer {
    app_name: String,
}

impl LogMailer {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn subject(&self) -> String {
        format!("Reset Password - {}", self.app_name)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<()> {
        tracing::info!(
            to = %email,
            subject = %self.subject(),
            reset_url = %reset_url,
            "password reset mail queued"
        );
        Ok(())
    }
}
