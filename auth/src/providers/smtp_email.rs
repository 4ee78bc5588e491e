//! SMTP email sender using Lettre.

use super::AuthFuture;
use crate::error::{AuthError, Result};
use crate::providers::EmailSender;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP email sender.
///
/// # Examples
///
/// ```no_run
/// use bookstore_auth::providers::SmtpEmailSender;
///
/// let sender = SmtpEmailSender::new(
///     "smtp.gmail.com".to_string(),
///     587,
///     "user@gmail.com".to_string(),
///     "app_password".to_string(),
///     "noreply@bookstore.example".to_string(),
///     "Bookstore".to_string(),
/// );
/// ```
#[derive(Clone)]
pub struct SmtpEmailSender {
    /// SMTP server address.
    smtp_server: String,

    /// SMTP server port.
    smtp_port: u16,

    /// SMTP credentials.
    credentials: Credentials,

    /// Sender email address.
    from_email: String,

    /// Sender display name.
    from_name: String,
}

impl SmtpEmailSender {
    /// Create a new SMTP email sender.
    #[must_use]
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            credentials: Credentials::new(smtp_username, smtp_password),
            from_email,
            from_name,
        }
    }

    /// Build an SMTP transport for one message.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| AuthError::EmailError(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    fn verification_message(&self, to: &str, name: &str, code: &str) -> Result<Message> {
        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Verify your bookstore account</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Welcome, {name}</h2>
        <p>Use the code below to verify your account.</p>
        <p style="margin: 30px 0; font-size: 28px; letter-spacing: 6px; font-weight: bold;">
            {code}
        </p>
        <p style="color: #666; font-size: 14px;">
            If you didn't sign up, you can safely ignore this email.
        </p>
    </div>
</body>
</html>
            "#
        );

        Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AuthError::EmailError(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::EmailError(format!("Invalid to address: {e}")))?)
            .subject("Verify your bookstore account")
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| AuthError::EmailError(format!("Failed to build email: {e}")))
    }
}

impl EmailSender for SmtpEmailSender {
    fn send_verification_code(
        &self,
        to: String,
        name: String,
        code: String,
    ) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            let email = self.verification_message(&to, &name, &code)?;
            let mailer = self.build_transport()?;

            tokio::task::spawn_blocking(move || {
                mailer
                    .send(&email)
                    .map_err(|e| AuthError::EmailError(format!("Failed to send email: {e}")))
            })
            .await
            .map_err(|e| AuthError::EmailError(format!("Email task failed: {e}")))??;

            tracing::info!(to = %to, "Sent verification code email");
            Ok(())
        })
    }
}
