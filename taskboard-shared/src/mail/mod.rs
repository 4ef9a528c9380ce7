/// Outbound mail.
///
/// Handlers build an [`OutgoingEmail`] and hand it to a [`Mailer`]. Delivery
/// is someone else's job: the SMTP and file transports come from `lettre`,
/// [`LogMailer`] only logs, and [`RecordingMailer`] keeps messages in memory
/// for tests.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

pub mod smtp;

pub use smtp::LettreMailer;

/// A plain-text message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to send message: {0}")]
    Transport(String),

    #[error("Mail transport misconfigured: {0}")]
    Config(String),
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Which transport to build at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransportConfig {
    /// Deliver through an SMTP relay
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },

    /// Write each message as a file under `path`
    File { path: PathBuf },

    /// Log messages and drop them
    Log,
}

/// Builds the configured mailer
pub fn build_mailer(
    transport: &MailTransportConfig,
    from: &str,
) -> Result<Arc<dyn Mailer>, MailError> {
    match transport {
        MailTransportConfig::Log => Ok(Arc::new(LogMailer)),
        _ => Ok(Arc::new(LettreMailer::new(transport, from)?)),
    }
}

/// Logs every message at info level and reports success
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Mail transport is log-only, message not delivered"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory
///
/// Can be told to fail, to exercise the error path of callers.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("recording mailer set to fail".to_string()));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// The message carrying an account activation link
pub fn activation_email(to: &str, username: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Activate your account".to_string(),
        body: format!(
            "Hi {username},\n\n\
             Please click the link below to activate your account:\n\n\
             {link}\n\n\
             If you did not create an account, you can ignore this email.\n"
        ),
    }
}
