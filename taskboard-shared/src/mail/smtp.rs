/// `lettre`-backed delivery over SMTP or to files on disk.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, MailTransportConfig, Mailer, OutgoingEmail};

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct LettreMailer {
    transport: Transport,
    from: Mailbox,
}

impl std::fmt::Debug for LettreMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.transport {
            Transport::Smtp(_) => "smtp",
            Transport::File(_) => "file",
        };
        f.debug_struct("LettreMailer")
            .field("transport", &kind)
            .field("from", &self.from.to_string())
            .finish()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|e| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl LettreMailer {
    /// Builds a mailer for the SMTP or file transport
    ///
    /// # Errors
    ///
    /// Fails on an unparsable sender, an SMTP relay that cannot be set up, a
    /// mail directory that cannot be created, or the log transport.
    pub fn new(config: &MailTransportConfig, from: &str) -> Result<Self, MailError> {
        let from = parse_mailbox(from)?;

        let transport = match config {
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .map_err(|e| MailError::Config(format!("SMTP relay {host}: {e}")))?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                }
                .port(*port);

                if let (Some(username), Some(password)) = (username, password) {
                    builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
                }

                Transport::Smtp(builder.build())
            }
            MailTransportConfig::File { path } => {
                std::fs::create_dir_all(path).map_err(|e| {
                    MailError::Config(format!("create mail directory {}: {e}", path.display()))
                })?;
                Transport::File(AsyncFileTransport::<Tokio1Executor>::new(path))
            }
            MailTransportConfig::Log => {
                return Err(MailError::Config(
                    "the log transport does not use lettre".to_string(),
                ))
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait::async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| MailError::Transport(format!("SMTP: {e}")))?;
            }
            Transport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| MailError::Transport(format!("file: {e}")))?;
            }
        }

        tracing::debug!(to = %email.to, "Email handed to transport");
        Ok(())
    }
}
