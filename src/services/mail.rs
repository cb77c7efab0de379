use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::MailConfig;
use crate::services::mnemonic::Mnemonic;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address {0:?}")]
    Address(String),

    #[error("can't build mail: {0}")]
    Build(String),

    #[error("smtp transport: {0}")]
    Transport(String),
}

/// Checks that `raw` is a deliverable address
pub fn parse_address(raw: &str) -> Result<Address, MailError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| MailError::Address(raw.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A rendered mail ready to be handed to a [`Mailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mail sent to a visitor right after the reservation
pub fn reservation_mail(to: &str, mid: &Mnemonic, name: &str) -> OutgoingMail {
    let subject = format!("Ihre Reservierung für {} {} {}", mid.article(), mid.label(), mid.display_id());
    let text = format!(
        "Hallo {name},\n\n\
         vielen Dank für Ihre Reservierung! Wir haben {article} {label} {id} für Sie vorgemerkt.\n\
         Sobald Ihre Patenschaft bestätigt ist, erhalten Sie Ihre Urkunde per E-Mail.\n\n\
         Viele Grüße",
        name = name,
        article = mid.article(),
        label = mid.label(),
        id = mid.display_id(),
    );
    let html = format!(
        "<p>Hallo {name},</p>\
         <p>vielen Dank für Ihre Reservierung! Wir haben {article} <b>{label} {id}</b> für Sie vorgemerkt.<br>\
         Sobald Ihre Patenschaft bestätigt ist, erhalten Sie Ihre Urkunde per E-Mail.</p>\
         <p>Viele Grüße</p>",
        name = escape_html(name),
        article = escape_html(mid.article()),
        label = escape_html(mid.label()),
        id = escape_html(&mid.display_id()),
    );

    OutgoingMail {
        to: to.to_string(),
        subject,
        text,
        html: Some(html),
        attachment: None,
    }
}

/// Mail carrying the certificate of a confirmed sponsorship
pub fn certificate_mail(to: &str, mid: &Mnemonic, name: &str, pdf: Vec<u8>) -> OutgoingMail {
    let subject = format!("Ihre Urkunde für {} {} {}", mid.article(), mid.label(), mid.display_id());
    let text = format!(
        "Hallo {name},\n\n\
         Ihre Patenschaft für {article} {label} {id} ist bestätigt. Im Anhang finden Sie Ihre Urkunde.\n\n\
         Viele Grüße",
        name = name,
        article = mid.article(),
        label = mid.label(),
        id = mid.display_id(),
    );

    OutgoingMail {
        to: to.to_string(),
        subject,
        text,
        html: None,
        attachment: Some(MailAttachment {
            filename: format!("urkunde-{}.pdf", mid.as_str()),
            content_type: "application/pdf",
            bytes: pdf,
        }),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Delivers mails through the configured SMTP relay
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from = Mailbox::new(Some(config.sender_name.clone()), parse_address(&config.from)?);

        let transport = if config.user.is_empty() {
            // local relays without authentication
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        } else {
            let creds = Credentials::new(config.user.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .credentials(creds)
                .port(config.port)
                .build()
        };

        Ok(Self { from, transport })
    }

    fn build(&self, mail: OutgoingMail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, parse_address(&mail.to)?))
            .subject(mail.subject);

        let message = match (mail.html, mail.attachment) {
            (None, None) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(mail.text),
            (Some(html), None) => {
                builder.multipart(MultiPart::alternative_plain_html(mail.text, html))
            }
            (html, Some(attachment)) => {
                let content_type = ContentType::parse(attachment.content_type)
                    .map_err(|e| MailError::Build(e.to_string()))?;
                let body = match html {
                    Some(html) => MultiPart::alternative_plain_html(mail.text, html),
                    None => MultiPart::mixed().singlepart(SinglePart::plain(mail.text)),
                };
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(body)
                        .singlepart(Attachment::new(attachment.filename).body(attachment.bytes, content_type)),
                )
            }
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = mail.to.clone();
        let message = self.build(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(%to, "mail sent");
        Ok(())
    }
}
