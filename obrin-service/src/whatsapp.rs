use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use obrin_core::{Notifier, ObrinError, Result};

/// Twilio's WhatsApp body limit.
const MAX_MESSAGE_LENGTH: usize = 1600;
/// Delay between parts of a split message so they arrive in order.
const INTER_PART_DELAY: Duration = Duration::from_secs(1);

/// Notifier that delivers replies through the Twilio WhatsApp API. Long
/// replies are split at natural boundaries before sending.
pub struct TwilioNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioNotifier {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    async fn send_part(&self, to: &str, body: &str) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", format!("whatsapp:{}", self.from_number)),
                ("To", format!("whatsapp:{to}")),
                ("Body", body.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ObrinError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ObrinError::Delivery(format!(
                "twilio returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
        let parts = split_message(text);
        let total = parts.len();
        for (i, part) in parts.iter().enumerate() {
            debug!(part = i + 1, total, length = part.len(), "sending message part");
            self.send_part(recipient_id, part).await?;
            if i + 1 < total {
                tokio::time::sleep(INTER_PART_DELAY).await;
            }
        }
        info!(recipient_id = %recipient_id, parts = total, "message delivered");
        Ok(())
    }
}

/// Split a long reply into WhatsApp-sized parts, preferring a newline in the
/// last 30% of the window, then a period or space in the last 20%, before
/// falling back to a hard cut.
pub fn split_message(body: &str) -> Vec<String> {
    if body.chars().count() <= MAX_MESSAGE_LENGTH {
        return vec![body.to_string()];
    }

    let mut parts = Vec::new();
    let mut remaining: Vec<char> = body.chars().collect();

    while !remaining.is_empty() {
        if remaining.len() <= MAX_MESSAGE_LENGTH {
            parts.push(remaining.iter().collect());
            break;
        }

        let window = &remaining[..MAX_MESSAGE_LENGTH];
        let newline_floor = MAX_MESSAGE_LENGTH * 7 / 10;
        let boundary_floor = MAX_MESSAGE_LENGTH * 8 / 10;

        let cut = last_position(window, '\n')
            .filter(|&i| i > newline_floor)
            .or_else(|| last_position(window, '.').filter(|&i| i > boundary_floor))
            .or_else(|| last_position(window, ' ').filter(|&i| i > boundary_floor))
            .map(|i| i + 1)
            .unwrap_or(MAX_MESSAGE_LENGTH);

        parts.push(remaining[..cut].iter().collect());
        remaining.drain(..cut);
    }

    parts
}

fn last_position(window: &[char], needle: char) -> Option<usize> {
    window.iter().rposition(|&c| c == needle)
}
