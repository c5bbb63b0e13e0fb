//! Outbound message boundary.
//!
//! Delivery is an external collaborator: this module only hands messages off,
//! fire-and-forget, and never blocks request handling on it. Tests use a
//! recording mailer to observe what was queued.

use std::sync::{Arc, Mutex};
use tracing::info;

/// A message queued for out-of-band delivery. The token rides along so the
/// delivery side can build the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    EmailVerification { email: String, token: String },
    PasswordReset { email: String, token: String },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::EmailVerification { .. } => "email_verification",
            Message::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Message::EmailVerification { email, .. } => email,
            Message::PasswordReset { email, .. } => email,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Message::EmailVerification { token, .. } => token,
            Message::PasswordReset { token, .. } => token,
        }
    }
}

#[derive(Clone, Default)]
pub struct Mailer {
    outbox: Option<Arc<Mutex<Vec<Message>>>>,
}

impl Mailer {
    /// Mailer that hands messages off to the delivery collaborator.
    pub fn new() -> Self {
        Self { outbox: None }
    }

    /// Mailer that records messages instead of handing them off. For tests.
    pub fn recording() -> Self {
        Self {
            outbox: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Queue a message for delivery. Never blocks and never fails the caller.
    pub fn deliver_later(&self, message: Message) {
        if let Some(outbox) = &self.outbox {
            if let Ok(mut sent) = outbox.lock() {
                sent.push(message);
            }
            return;
        }

        tokio::spawn(async move {
            info!(
                kind = message.kind(),
                email = message.email(),
                "Queued outbound message"
            );
        });
    }

    /// Messages recorded so far. Empty unless this is a recording mailer.
    pub fn sent(&self) -> Vec<Message> {
        self.outbox
            .as_ref()
            .and_then(|outbox| outbox.lock().ok().map(|sent| sent.clone()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_mailer_captures_messages() {
        let mailer = Mailer::recording();

        mailer.deliver_later(Message::EmailVerification {
            email: "alice@example.com".to_string(),
            token: "tok-1".to_string(),
        });
        mailer.deliver_later(Message::PasswordReset {
            email: "alice@example.com".to_string(),
            token: "tok-2".to_string(),
        });

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind(), "email_verification");
        assert_eq!(sent[1].kind(), "password_reset");
        assert_eq!(sent[1].token(), "tok-2");
    }

    #[test]
    fn test_clones_share_the_outbox() {
        let mailer = Mailer::recording();
        let clone = mailer.clone();

        clone.deliver_later(Message::PasswordReset {
            email: "alice@example.com".to_string(),
            token: "tok".to_string(),
        });

        assert_eq!(mailer.sent().len(), 1);
    }
}
