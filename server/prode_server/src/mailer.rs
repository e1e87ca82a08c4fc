use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;
use tracing::info;

use crate::config::MailConfig;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Outbound email collaborator. Delivery failures are reported to the
/// caller, who decides whether they matter; nothing here rolls back state.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
        attachment: Option<&Attachment>,
    ) -> Result<(), AppError>;
}

/// Client for an HTTP mail API: one JSON POST per message, attachment
/// base64-encoded inline.
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
        attachment: Option<&Attachment>,
    ) -> Result<(), AppError> {
        let mut payload = json!({
            "from": self.config.from,
            "to": recipients,
            "subject": subject,
            "text": body,
        });
        if let Some(attachment) = attachment {
            payload["attachments"] = json!([{
                "filename": attachment.filename,
                "content": BASE64.encode(&attachment.content),
            }]);
        }

        let mut request = self.client.post(&self.config.api_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Mail(e.to_string()))?;

        info!("Sent \"{}\" to {} recipient(s)", subject, recipients.len());
        Ok(())
    }
}

// ---- message bodies ----

pub fn proof_admin_email(
    card_name: &str,
    username: &str,
    uploaded_at: &chrono::DateTime<chrono::Utc>,
    comment: Option<&str>,
) -> (String, String) {
    let subject = format!("New payment proof: {} - {}", card_name, username);
    let body = format!(
        "User: {}\nCard: {}\nUploaded: {}\n\nComment: {}\n\nThe proof file is attached.",
        username,
        card_name,
        uploaded_at.format("%Y-%m-%d %H:%M:%S UTC"),
        comment.unwrap_or("-"),
    );
    (subject, body)
}

pub fn proof_user_email(
    card_name: &str,
    username: &str,
    uploaded_at: &chrono::DateTime<chrono::Utc>,
    comment: Option<&str>,
) -> (String, String) {
    let subject = format!("Payment proof received: {}", card_name);
    let body = format!(
        "Hi {},\n\nWe received your payment proof for card {}.\nUploaded: {}\nComment: {}\n\nThanks for your transfer.",
        username,
        card_name,
        uploaded_at.format("%Y-%m-%d %H:%M:%S UTC"),
        comment.unwrap_or("-"),
    );
    (subject, body)
}

pub fn winner_email(
    username: &str,
    card_name: &str,
    round_number: i32,
    points: i32,
    prize: f64,
) -> (String, String) {
    let subject = format!("You won round {}!", round_number);
    let body = format!(
        "Hi {},\n\nYour card {} won round {} with {} points.\nYour share of the pool is ${:.2}.\n\nCongratulations!",
        username, card_name, round_number, points, prize,
    );
    (subject, body)
}

pub fn reminder_email(
    username: &str,
    round_number: i32,
    closes_at: &chrono::DateTime<chrono::Utc>,
) -> (String, String) {
    let subject = format!("Reminder: round {} closes in 2 hours", round_number);
    let body = format!(
        "Hi {}!\n\nRound {} closes in 2 hours. Make sure your cards and payment proofs are in before {}.\n\nGood luck!",
        username,
        round_number,
        closes_at.format("%H:%M:%S UTC"),
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_email_mentions_prize_share() {
        let (subject, body) = winner_email("maria", "maria2", 5, 7, 500.0);
        assert_eq!(subject, "You won round 5!");
        assert!(body.contains("maria2"));
        assert!(body.contains("$500.00"));
        assert!(body.contains("7 points"));
    }

    #[test]
    fn test_proof_emails_carry_the_comment() {
        let uploaded_at = chrono::Utc::now();
        let (_, admin_body) = proof_admin_email("jose1", "jose", &uploaded_at, Some("late fee"));
        assert!(admin_body.contains("late fee"));
        let (_, user_body) = proof_user_email("jose1", "jose", &uploaded_at, None);
        assert!(user_body.contains("Comment: -"));
    }
}
