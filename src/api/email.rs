//! Outbound mail.
//!
//! Delivery is synchronous: the password-reset flow needs the send result
//! before it answers the client, so there is no queue in between.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::cli::globals::GlobalArgs;

#[derive(Clone, Debug)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery backends. `Log` writes the message to the log (default
/// when no relay is configured); `Http` posts it as JSON to a relay
/// endpoint and treats any non-2xx answer as a delivery failure.
#[derive(Clone, Debug)]
pub enum Mailer {
    Log {
        from: String,
    },
    Http {
        client: Client,
        relay_url: Url,
        from: String,
    },
}

impl Mailer {
    #[must_use]
    pub fn log(from: String) -> Self {
        Self::Log { from }
    }

    /// Build a relay-backed mailer.
    ///
    /// # Errors
    /// Returns an error if the relay URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn http(relay_url: &str, from: String) -> Result<Self> {
        let relay_url = Url::parse(relay_url).context("Invalid mail relay URL")?;
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build mail relay client")?;
        Ok(Self::Http {
            client,
            relay_url,
            from,
        })
    }

    /// Pick the backend from the CLI globals.
    ///
    /// # Errors
    /// Returns an error if a relay URL is configured but invalid.
    pub fn from_globals(globals: &GlobalArgs) -> Result<Self> {
        match &globals.mail_relay_url {
            Some(url) => Self::http(url, globals.mail_from.clone()),
            None => Ok(Self::log(globals.mail_from.clone())),
        }
    }

    /// Deliver one message. Failures surface to the caller; retry, if any,
    /// is the caller's responsibility.
    ///
    /// # Errors
    /// Returns an error if the relay is unreachable or rejects the message.
    pub async fn send(&self, message: &MailMessage) -> Result<()> {
        match self {
            Self::Log { from } => {
                info!(
                    from = %from,
                    to = %message.to,
                    subject = %message.subject,
                    "mail send stub"
                );
                Ok(())
            }
            Self::Http {
                client,
                relay_url,
                from,
            } => {
                let response = client
                    .post(relay_url.clone())
                    .json(&json!({
                        "from": from,
                        "to": message.to,
                        "subject": message.subject,
                        "body": message.body,
                    }))
                    .send()
                    .await
                    .context("failed to reach mail relay")?;

                if !response.status().is_success() {
                    return Err(anyhow!("mail relay rejected message: {}", response.status()));
                }

                Ok(())
            }
        }
    }
}

/// Reset notification carrying the replacement password.
#[must_use]
pub fn password_reset_message(to: &str, user_name: &str, temp_password: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Your password has been reset".to_string(),
        body: format!(
            "Hello {user_name},\n\n\
             A password reset was requested for your account. Sign in with\n\
             the temporary password below and change it right away:\n\n\
             {temp_password}\n\n\
             If you did not request this, contact support.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_delivers() -> Result<()> {
        let mailer = Mailer::log("no-reply@nido.family".to_string());
        let message = password_reset_message("alice@example.com", "Alice", "tmpPass99");
        mailer.send(&message).await
    }

    #[test]
    fn http_mailer_rejects_invalid_url() {
        assert!(Mailer::http("not a url", "no-reply@nido.family".to_string()).is_err());
    }

    #[test]
    fn reset_message_carries_password_and_recipient() {
        let message = password_reset_message("alice@example.com", "Alice", "tmpPass99");
        assert_eq!(message.to, "alice@example.com");
        assert!(message.body.contains("tmpPass99"));
        assert!(message.body.contains("Alice"));
    }

    #[test]
    fn from_globals_defaults_to_log() -> Result<()> {
        let globals = GlobalArgs::new("no-reply@nido.family".to_string());
        let mailer = Mailer::from_globals(&globals)?;
        assert!(matches!(mailer, Mailer::Log { .. }));
        Ok(())
    }

    #[test]
    fn from_globals_builds_relay_when_configured() -> Result<()> {
        let mut globals = GlobalArgs::new("no-reply@nido.family".to_string());
        globals.mail_relay_url = Some("https://relay.tld/v1/send".to_string());
        let mailer = Mailer::from_globals(&globals)?;
        assert!(matches!(mailer, Mailer::Http { .. }));
        Ok(())
    }
}
