//! Delivery of a finished scan: report upload and notifications.
//!
//! Both steps run after the scan and never change its outcome. Every
//! failure comes back as a `SinkError` for the caller to log.

use domain_seeker_lib::{DomainSeekerError, NotificationSettings, NotifyMethod};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Uploads Markdown reports to a HedgeDoc instance.
pub struct PasteUploader {
    client: reqwest::Client,
    base_url: String,
}

impl PasteUploader {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainSeekerError> {
        // HedgeDoc answers both steps with redirects whose Location we need.
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| DomainSeekerError::sink("paste", e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a note from `markdown` and return its published URL.
    pub async fn upload(&self, markdown: &str) -> Result<String, DomainSeekerError> {
        let create_url = format!("{}/new", self.base_url);
        debug!(url = %create_url, "Creating note");

        let response = self
            .client
            .post(&create_url)
            .header(CONTENT_TYPE, "text/markdown; charset=utf-8")
            .body(markdown.to_string())
            .send()
            .await
            .map_err(|e| DomainSeekerError::sink("paste", format!("create failed: {}", e)))?;
        let editable = redirect_location(&response, "create")?;

        let id = note_id(&editable).ok_or_else(|| {
            DomainSeekerError::sink("paste", format!("no note id in '{}'", editable))
        })?;

        let publish_url = format!("{}/{}/publish", self.base_url, id);
        debug!(url = %publish_url, "Publishing note");

        let response = self
            .client
            .get(&publish_url)
            .send()
            .await
            .map_err(|e| DomainSeekerError::sink("paste", format!("publish failed: {}", e)))?;
        let published = redirect_location(&response, "publish")?;

        Ok(absolute_url(&self.base_url, &published))
    }
}

fn redirect_location(response: &reqwest::Response, step: &str) -> Result<String, DomainSeekerError> {
    let status = response.status();
    if !status.is_redirection() {
        return Err(DomainSeekerError::sink(
            "paste",
            format!("{} returned HTTP {} instead of a redirect", step, status.as_u16()),
        ));
    }

    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            DomainSeekerError::sink("paste", format!("{} redirect has no Location header", step))
        })
}

/// Last path segment of a note URL, ignoring query and fragment.
pub(crate) fn note_id(location: &str) -> Option<&str> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
}

pub(crate) fn absolute_url(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        format!("{}/{}", base_url, location.trim_start_matches('/'))
    }
}

/// Sends the end-of-run message through the configured channel.
pub struct Notifier {
    settings: NotificationSettings,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(settings: NotificationSettings, timeout: Duration) -> Result<Self, DomainSeekerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainSeekerError::sink("notification", e.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn method(&self) -> NotifyMethod {
        self.settings.method
    }

    pub async fn notify(&self, subject: &str, body: &str) -> Result<(), DomainSeekerError> {
        match self.settings.method {
            NotifyMethod::None => Ok(()),
            NotifyMethod::Email => self.send_email(subject, body).await,
            NotifyMethod::Telegram => self.send_telegram(subject, body).await,
        }
    }

    async fn send_email(&self, subject: &str, body: &str) -> Result<(), DomainSeekerError> {
        let recipient = self
            .settings
            .email
            .as_deref()
            .ok_or_else(|| DomainSeekerError::sink("email", "no recipient configured"))?;
        let message = email_message(recipient, subject, body);

        let mut child = Command::new(&self.settings.sendmail)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                DomainSeekerError::sink(
                    "email",
                    format!("cannot run '{}': {}", self.settings.sendmail, e),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(|e| DomainSeekerError::sink("email", e.to_string()))?;
            // Closing stdin lets sendmail finish reading the message.
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DomainSeekerError::sink("email", e.to_string()))?;
        if !status.success() {
            return Err(DomainSeekerError::sink(
                "email",
                format!("{} exited with {}", self.settings.sendmail, status),
            ));
        }

        info!(recipient, "Email notification sent");
        Ok(())
    }

    async fn send_telegram(&self, subject: &str, body: &str) -> Result<(), DomainSeekerError> {
        let (Some(token), Some(chat_id)) = (
            self.settings.telegram_token.as_deref(),
            self.settings.telegram_chat_id.as_deref(),
        ) else {
            return Err(DomainSeekerError::sink(
                "telegram",
                "telegram_token and telegram_chat_id are required",
            ));
        };

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, token);
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": format!("*{}*\n\n{}", subject, body),
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DomainSeekerError::sink("telegram", e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(DomainSeekerError::sink(
                "telegram",
                format!("Telegram API returned HTTP {}", response.status().as_u16()),
            ));
        }

        info!("Telegram notification sent");
        Ok(())
    }
}

/// Minimal RFC 5322 message for `sendmail -t`.
pub(crate) fn email_message(to: &str, subject: &str, body: &str) -> String {
    format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        to.trim(),
        subject.replace(['\r', '\n'], " "),
        body.replace("\r\n", "\n").replace('\n', "\r\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_from_location() {
        assert_eq!(note_id("https://pad.example/AbC123xyz"), Some("AbC123xyz"));
        assert_eq!(note_id("/AbC123xyz?edit"), Some("AbC123xyz"));
        assert_eq!(note_id("https://pad.example/notes/q1w2/"), Some("q1w2"));
        assert_eq!(note_id(""), None);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://pad.example", "/s/abc"),
            "https://pad.example/s/abc"
        );
        assert_eq!(
            absolute_url("https://pad.example", "https://cdn.example/s/abc"),
            "https://cdn.example/s/abc"
        );
    }

    #[test]
    fn test_email_message_headers() {
        let message = email_message(" ops@example.com ", "Scan\ndone", "line one\nline two");
        assert!(message.starts_with("To: ops@example.com\r\nSubject: Scan done\r\n"));
        assert!(message.contains("\r\n\r\nline one\r\nline two\r\n"));
    }

    #[tokio::test]
    async fn test_notify_none_is_noop() {
        let notifier = Notifier::new(NotificationSettings::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(notifier.method(), NotifyMethod::None);
        assert!(notifier.notify("subject", "body").await.is_ok());
    }

    #[tokio::test]
    async fn test_email_with_missing_sendmail_fails() {
        let settings = NotificationSettings {
            method: NotifyMethod::Email,
            email: Some("ops@example.com".to_string()),
            sendmail: "/nonexistent/sendmail".to_string(),
            ..Default::default()
        };
        let notifier = Notifier::new(settings, Duration::from_secs(1)).unwrap();
        let err = notifier.notify("subject", "body").await.unwrap_err();
        assert!(matches!(err, DomainSeekerError::SinkError { .. }));
    }
}
