//! The confirmation loop.
//!
//! ```text
//! deadline = now + window
//! loop:
//!     publish "waiting for confirmation"   (best effort)
//!     poll confirmation source ──► confirmed → Outcome::Confirmed
//!     deadline passed?          ──► yes       → fallback report, Outcome::NotConfirmed
//!     sleep min(interval, time left)
//! ```
//!
//! The first iteration always runs, so a zero-length window still sends one
//! notice and performs one check.

use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use std::time::Duration;

use crate::config::WaiterConfig;
use crate::confirmation::ConfirmationSource;
use crate::error::Result;
use crate::publisher::{Delivery, Publisher};
use crate::types::{Operation, Payload, TopicScheme};

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_NOT_CONFIRMED: i32 = 100;

const WAITING_TEXT: &str = "Waiting for user confirmation";

/// Deadline used when the window is too long to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Confirmed { attempts: u32 },
    NotConfirmed { attempts: u32 },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Confirmed { .. } => EXIT_OK,
            Outcome::NotConfirmed { .. } => EXIT_NOT_CONFIRMED,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Confirmed { attempts } | Outcome::NotConfirmed { attempts } => *attempts,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed { .. })
    }
}

pub struct Waiter<P, C> {
    publisher: P,
    confirmation: C,
    topics: TopicScheme,
    window: Duration,
    poll_interval: Duration,
    settle: Duration,
    fallback_topic: String,
    fallback_payload: Payload,
}

impl<P: Publisher, C: ConfirmationSource> Waiter<P, C> {
    /// `config` is expected to have passed [`WaiterConfig::validate`].
    pub fn new(config: &WaiterConfig, publisher: P, confirmation: C) -> Self {
        Self {
            publisher,
            confirmation,
            topics: config.topics(),
            window: config.duration(),
            poll_interval: config.poll_interval(),
            settle: config.settle(),
            fallback_topic: config.fallback_topic.clone(),
            fallback_payload: Payload::Raw(config.fallback_payload.clone()),
        }
    }

    /// Wait for confirmation and, if none arrives, report the operation as
    /// failed before returning.
    pub async fn run(&mut self, operation: &Operation) -> Result<Outcome> {
        let outcome = self.wait_for_confirmation(operation).await?;
        if !outcome.is_confirmed() {
            self.report_unconfirmed().await?;
            info!("User did not confirm the operation");
        }
        Ok(outcome)
    }

    /// Poll until the confirmation source says yes or the window closes.
    pub async fn wait_for_confirmation(&mut self, operation: &Operation) -> Result<Outcome> {
        info!(
            topic = %operation.topic,
            payload = %operation.payload,
            "Received operation"
        );

        let start = Instant::now();
        let deadline = start
            .checked_add(self.window)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let topic = self.topics.confirm_topic();
        let notice = Payload::Json(json!({ "text": WAITING_TEXT }));
        let mut attempts = 0;

        loop {
            attempts += 1;
            info!(attempt = attempts, "Checking for user confirmation");
            self.publish_best_effort(&topic, &notice).await?;

            if self.confirmation.poll() {
                info!(attempts, "User confirmed the operation");
                return Ok(Outcome::Confirmed { attempts });
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
            if Instant::now() >= deadline {
                break;
            }
        }

        Ok(Outcome::NotConfirmed { attempts })
    }

    /// Publish the fallback failure status, then give the client a moment to
    /// hand the message to the broker.
    pub async fn report_unconfirmed(&self) -> Result<()> {
        self.publish_best_effort(&self.fallback_topic, &self.fallback_payload)
            .await?;
        sleep(self.settle).await;
        Ok(())
    }

    async fn publish_best_effort(&self, topic: &str, payload: &Payload) -> Result<()> {
        match self.publisher.publish(topic, payload).await? {
            Delivery::Delivered => {}
            Delivery::Rejected { code, output } => {
                warn!(topic, ?code, output = %output, "Failed to publish MQTT message");
            }
            Delivery::TimedOut(after) => {
                warn!(
                    topic,
                    timeout_secs = after.as_secs_f64(),
                    "Timed out publishing MQTT message; client killed"
                );
            }
        }
        Ok(())
    }
}
