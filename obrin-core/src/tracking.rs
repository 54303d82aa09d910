use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{ObrinError, Result};
use crate::health::HealthTracker;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})")
        .unwrap_or_else(|e| unreachable!("date regex is valid: {e}"))
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)").unwrap_or_else(|e| unreachable!("number regex is valid: {e}"))
});

fn parse_ddmmyyyy(message: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(message)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Handle a period-tracking message for one user and produce the reply.
///
/// `today` is passed in so day-count answers are deterministic under test.
/// Out-of-range values come back as the guidance reply, never as an error.
pub async fn handle_tracking_message(
    tracker: &HealthTracker,
    user_id: &str,
    message: &str,
    today: NaiveDate,
) -> Result<String> {
    let lower = message.to_lowercase();

    if lower.contains("last period") || lower.contains("started period") {
        let Some(date) = parse_ddmmyyyy(message) else {
            return Ok("I'd like to help you track your period. When did your last period start? \
                       Please use the format DD/MM/YYYY (e.g., 15/01/2024)."
                .to_string());
        };

        let profile = tracker.record_period(user_id, date, None, None).await?;
        debug!(user_id, date = %date, "captured last period date");

        if profile.cycle_length.is_none() {
            return Ok(format!(
                "Thanks! I've recorded your last period as {}.\n\n\
                 What's your average cycle length (days between periods)? \
                 This helps me predict your next period.",
                display_date(date)
            ));
        }

        if let Some(prediction) = tracker.predict(user_id).await? {
            return Ok(format!(
                "Thanks! I've recorded your last period. Based on your cycle, your next period \
                 is expected around {}.\n\nI'll send you a reminder a few days before! 📅",
                display_date(prediction.date)
            ));
        }
    }

    if lower.contains("cycle") && lower.contains("day") {
        if let Some(caps) = NUMBER_RE.captures(message) {
            let days: u32 = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            match tracker.set_cycle_length(user_id, days).await {
                Ok(_) => {
                    if let Some(prediction) = tracker.predict(user_id).await? {
                        return Ok(format!(
                            "Perfect! I've set your cycle length to {days} days. Your next \
                             period is expected around {}.\n\n\
                             I'll send you a reminder 3 days before! 📅",
                            display_date(prediction.date)
                        ));
                    }
                    return Ok(format!(
                        "Perfect! I've set your cycle length to {days} days. Tell me when your \
                         last period started (DD/MM/YYYY) and I'll predict the next one."
                    ));
                }
                Err(ObrinError::OutOfRange { message, .. }) => return Ok(message),
                Err(e) => return Err(e),
            }
        }
    }

    if lower.contains("next period") || lower.contains("when period") {
        return match tracker.predict(user_id).await? {
            Some(prediction) => {
                let days_until = (prediction.date - today).num_days();
                if days_until > 0 {
                    Ok(format!(
                        "Based on your cycle, your next period is expected in about {days_until} \
                         days (around {}).\n\nRemember to have supplies ready! 🩸",
                        display_date(prediction.date)
                    ))
                } else if days_until >= -7 {
                    Ok(format!(
                        "You're currently in your expected period window ({}).\n\n\
                         If you haven't started yet, don't worry - cycles can vary!",
                        display_date(prediction.date)
                    ))
                } else {
                    Ok(format!(
                        "Your last predicted period was {}.\n\n\
                         If you haven't had your period yet, would you like to update your \
                         last period date?",
                        display_date(prediction.date)
                    ))
                }
            }
            None => Ok("I don't have enough information to predict your next period.\n\n\
                        Could you tell me:\n\
                        1. When did your last period start? (DD/MM/YYYY)\n\
                        2. What's your average cycle length? (days between periods)"
                .to_string()),
        };
    }

    Ok("I can help you track your menstrual cycle! Here's what I can do:\n\n\
        📅 Record your last period date\n\
        📊 Predict your next period\n\
        ⏰ Send you reminders\n\
        📝 Track cycle length\n\n\
        Just tell me when your last period started (DD/MM/YYYY) or ask about your next period!"
        .to_string())
}

/// Reminder copy for N days before an expected period. Only 3, 1 and 0 days
/// out have dedicated messages.
pub fn reminder_message(days_until_period: i64) -> Option<String> {
    match days_until_period {
        3 => Some(
            "🔔 Period Reminder: Your period is expected in 3 days!\n\n\
             Make sure you have supplies ready. Remember to stay hydrated and get enough rest! 💪"
                .to_string(),
        ),
        1 => Some(
            "🔔 Period Reminder: Your period is expected tomorrow!\n\n\
             Have your supplies ready and consider taking it easy if you experience cramps. \
             You've got this! 🌸"
                .to_string(),
        ),
        0 => Some(
            "🔔 Period Reminder: Your period is expected today!\n\n\
             Take care of yourself and remember that it's completely normal. Stay comfortable! 💕"
                .to_string(),
        ),
        _ => None,
    }
}

/// Whether a message belongs to the period-tracking flow at all.
pub fn is_tracking_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["period", "menstrual", "cycle", "cramp"]
        .iter()
        .any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::InMemoryHealthStore;
    use std::sync::Arc;

    fn tracker() -> HealthTracker {
        HealthTracker::new(Arc::new(InMemoryHealthStore::new()))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn first_period_date_creates_profile_and_asks_for_cycle_length() {
        let tracker = tracker();
        let reply = handle_tracking_message(
            &tracker,
            "u1",
            "My last period started 15/01/2024",
            date(2024, 2, 1),
        )
        .await
        .unwrap();

        assert!(reply.contains("average cycle length"));
        let profile = tracker.profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.last_period, Some(date(2024, 1, 15)));
    }

    #[tokio::test]
    async fn period_date_with_known_cycle_predicts_next() {
        let tracker = tracker();
        tracker.set_cycle_length("u1", 28).await.unwrap();
        let reply = handle_tracking_message(
            &tracker,
            "u1",
            "my last period started 01/01/2024",
            date(2024, 1, 5),
        )
        .await
        .unwrap();
        assert!(reply.contains("29/01/2024"));
    }

    #[tokio::test]
    async fn missing_date_prompts_for_format() {
        let tracker = tracker();
        let reply =
            handle_tracking_message(&tracker, "u1", "my last period started recently", date(2024, 1, 1))
                .await
                .unwrap();
        assert!(reply.contains("DD/MM/YYYY"));
        assert!(tracker.profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cycle_length_out_of_range_returns_guidance_without_mutation() {
        let tracker = tracker();
        let reply =
            handle_tracking_message(&tracker, "u1", "my cycle is 40 days", date(2024, 1, 1))
                .await
                .unwrap();
        assert!(reply.contains("21-35"));
        assert!(tracker.profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cycle_length_in_range_is_set_and_predicts() {
        let tracker = tracker();
        tracker
            .record_period("u1", date(2024, 1, 1), None, None)
            .await
            .unwrap();
        let reply =
            handle_tracking_message(&tracker, "u1", "my cycle is 28 days", date(2024, 1, 5))
                .await
                .unwrap();
        assert!(reply.contains("28 days"));
        assert!(reply.contains("29/01/2024"));
    }

    #[tokio::test]
    async fn next_period_query_counts_days_until() {
        let tracker = tracker();
        tracker
            .record_period("u1", date(2024, 1, 1), None, None)
            .await
            .unwrap();
        tracker.set_cycle_length("u1", 28).await.unwrap();

        let reply =
            handle_tracking_message(&tracker, "u1", "when is my next period?", date(2024, 1, 19))
                .await
                .unwrap();
        assert!(reply.contains("about 10 days"), "{reply}");

        let in_window =
            handle_tracking_message(&tracker, "u1", "next period?", date(2024, 1, 30))
                .await
                .unwrap();
        assert!(in_window.contains("expected period window"));

        let overdue =
            handle_tracking_message(&tracker, "u1", "next period?", date(2024, 3, 1))
                .await
                .unwrap();
        assert!(overdue.contains("update your last period date"));
    }

    #[tokio::test]
    async fn next_period_without_profile_asks_for_data() {
        let tracker = tracker();
        let reply =
            handle_tracking_message(&tracker, "u1", "when is my next period?", date(2024, 1, 1))
                .await
                .unwrap();
        assert!(reply.contains("don't have enough information"));
    }

    #[tokio::test]
    async fn generic_tracking_message_gets_help_text() {
        let tracker = tracker();
        let reply = handle_tracking_message(&tracker, "u1", "tell me about my cycle", date(2024, 1, 1))
            .await
            .unwrap();
        assert!(reply.contains("track your menstrual cycle"));
    }

    #[test]
    fn reminders_exist_only_for_3_1_0_days_out() {
        assert!(reminder_message(3).is_some());
        assert!(reminder_message(1).is_some());
        assert!(reminder_message(0).is_some());
        assert!(reminder_message(2).is_none());
        assert!(reminder_message(5).is_none());
    }

    #[test]
    fn tracking_message_detection() {
        assert!(is_tracking_message("I have period cramps"));
        assert!(is_tracking_message("my CYCLE is irregular"));
        assert!(!is_tracking_message("find me a clinic"));
    }
}
