//! Outgoing notification email.
//!
//! Handlers build an [`Email`] from one of the [`templates`] and hand it to
//! the configured [`Mailer`]. SMTP delivery goes through `lettre`; without an
//! SMTP host the message is only logged.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{
    config::{AppConfig, SmtpConfig},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: String) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html,
            reply_to: None,
        }
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> AppResult<()>;
}

/// Pick the mailer for the running configuration.
pub fn from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp, &config.mail_from)?)),
        None => {
            tracing::warn!("SMTP_HOST is not set, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> anyhow::Result<Self> {
        let builder = if smtp.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        };
        let mut builder = builder.port(smtp.port);
        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid recipient {}", email.to)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = email.reply_to.as_deref() {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid reply-to {reply_to}")))?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .body(email.html)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email not delivered (smtp disabled)");
        tracing::debug!(body = %email.html, "email body");
        Ok(())
    }
}

/// Keeps every email in memory. Used by tests to assert on notifications.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        self.outbox
            .lock()
            .map_err(|_| AppError::Mail("outbox poisoned".into()))?
            .push(email);
        Ok(())
    }
}

/// Send a notification whose failure must not fail the request.
pub async fn notify(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    if let Err(err) = mailer.send(email).await {
        tracing::warn!(error = %err, to = %to, "notification email failed");
    }
}

pub mod templates {
    use chrono::{DateTime, Utc};

    use super::escape_html;

    fn layout(heading: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><body style=\"font-family:sans-serif\">\
             <h2>{}</h2>{}<p style=\"color:#888\">Book Donation</p></body></html>",
            escape_html(heading),
            body
        )
    }

    pub fn verification(name: &str, link: &str) -> (String, String) {
        let body = format!(
            "<p>Hi {},</p><p>Confirm your email address to start using your account.</p>\
             <p><a href=\"{link}\">Verify email</a></p>",
            escape_html(name),
            link = escape_html(link)
        );
        ("Verify your email".to_string(), layout("Welcome!", &body))
    }

    pub fn password_reset(name: &str, link: &str) -> (String, String) {
        let body = format!(
            "<p>Hi {},</p><p>Someone asked to reset your password. \
             The link below is valid for one hour.</p>\
             <p><a href=\"{link}\">Reset password</a></p>\
             <p>If this was not you, ignore this email.</p>",
            escape_html(name),
            link = escape_html(link)
        );
        ("Reset your password".to_string(), layout("Password reset", &body))
    }

    pub fn donation_approved(
        name: &str,
        book_title: &str,
        pickup_address: &str,
        pickup_date: DateTime<Utc>,
        pickup_notes: Option<&str>,
    ) -> (String, String) {
        let notes = pickup_notes
            .map(|n| format!("<p>Notes from the donor: {}</p>", escape_html(n)))
            .unwrap_or_default();
        let body = format!(
            "<p>Hi {},</p><p>Your request for <b>{}</b> was approved.</p>\
             <p>Pickup address: {}<br>Pickup date: {}</p>{}",
            escape_html(name),
            escape_html(book_title),
            escape_html(pickup_address),
            pickup_date.format("%Y-%m-%d %H:%M UTC"),
            notes
        );
        (
            format!("Your request for \"{book_title}\" was approved"),
            layout("Request approved", &body),
        )
    }

    pub fn donation_rejected(name: &str, book_title: &str, reason: Option<&str>) -> (String, String) {
        let reason = reason
            .map(|r| format!("<p>Reason: {}</p>", escape_html(r)))
            .unwrap_or_default();
        let body = format!(
            "<p>Hi {},</p><p>Unfortunately your request for <b>{}</b> was not approved.</p>{}",
            escape_html(name),
            escape_html(book_title),
            reason
        );
        (
            format!("Your request for \"{book_title}\" was declined"),
            layout("Request declined", &body),
        )
    }

    pub fn contact_form(name: &str, email: &str, message: &str) -> (String, String) {
        let body = format!(
            "<p>From: {} &lt;{}&gt;</p><p>{}</p>",
            escape_html(name),
            escape_html(email),
            escape_html(message)
        );
        (format!("Contact form: {name}"), layout("New contact message", &body))
    }

    pub fn direct_message(
        recipient_name: &str,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        message: &str,
    ) -> (String, String) {
        let body = format!(
            "<p>Hi {},</p><p>{} ({}) sent you a message:</p><blockquote>{}</blockquote>\
             <p>Reply to this email to answer.</p>",
            escape_html(recipient_name),
            escape_html(sender_name),
            escape_html(sender_email),
            escape_html(message)
        );
        (subject.to_string(), layout(subject, &body))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_escape_user_input() {
        let (_, html) = templates::contact_form("<b>Eve</b>", "eve@example.com", "a & b");
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("<b>Eve</b>"));
    }

    #[test]
    fn approval_mentions_pickup_details() {
        let date = chrono::DateTime::parse_from_rfc3339("2026-03-01T10:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let (subject, html) =
            templates::donation_approved("Ana", "Dune", "12 Main St", date, Some("ring twice"));
        assert_eq!(subject, "Your request for \"Dune\" was approved");
        assert!(html.contains("12 Main St"));
        assert!(html.contains("2026-03-01 10:30 UTC"));
        assert!(html.contains("ring twice"));
    }

    #[tokio::test]
    async fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::default();
        let (subject, html) = templates::verification("Ana", "http://x/verify?token=1");
        mailer
            .send(Email::new("ana@example.com", subject, html))
            .await
            .unwrap();
        notify(&mailer, Email::new("bob@example.com", "hi", String::new())).await;

        assert_eq!(mailer.sent().len(), 2);
        let to_ana = mailer.sent_to("ana@example.com");
        assert_eq!(to_ana.len(), 1);
        assert_eq!(to_ana[0].subject, "Verify your email");
    }
}
