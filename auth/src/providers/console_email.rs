//! Console email sender for development.

use super::AuthFuture;
use crate::providers::EmailSender;
use tracing::info;

/// Console email sender.
///
/// Logs emails instead of sending them. Used when no SMTP host is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    /// Create a new console email sender.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send_verification_code(
        &self,
        to: String,
        name: String,
        code: String,
    ) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            info!(
                to = %to,
                code = %code,
                "📧 Verification Code Email (Development Mode)"
            );
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║               ACCOUNT VERIFICATION                           ║");
            println!("╠══════════════════════════════════════════════════════════════╣");
            println!("║ To: {to:<57}║");
            println!("║ Subject: Verify your bookstore account{:<23}║", "");
            println!("╠══════════════════════════════════════════════════════════════╣");
            println!("║                                                              ║");
            println!("║ Hello {name:<55}║");
            println!("║ Use the code below to verify your account.                   ║");
            println!("║                                                              ║");
            println!("║ Verification code: {code:<42}║");
            println!("║                                                              ║");
            println!("╚══════════════════════════════════════════════════════════════╝\n");

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_sender_always_succeeds() {
        let sender = ConsoleEmailSender::new();
        let result = sender
            .send_verification_code(
                "reader@example.com".to_string(),
                "Rahim".to_string(),
                "042137".to_string(),
            )
            .await;
        assert!(result.is_ok());
    }
}
