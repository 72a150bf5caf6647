use crate::error::{ConfirmError, Result};
use crate::types::{Qos, TopicScheme};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for one confirmation run.
///
/// Every field has a default so a YAML file only needs the keys it changes.
/// Durations are seconds, fractional values allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaiterConfig {
    pub duration_secs: f64,
    pub poll_interval_secs: f64,
    pub publish_timeout_secs: f64,
    pub settle_secs: f64,
    pub qos: Qos,
    pub topic_root: String,
    pub topic_id: String,
    pub client: String,
    pub client_args: Vec<String>,
    pub fallback_topic: String,
    pub fallback_payload: String,
}

fn default_client_args() -> Vec<String> {
    vec!["mqtt".to_string(), "pub".to_string()]
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            poll_interval_secs: 5.0,
            publish_timeout_secs: 30.0,
            settle_secs: 1.0,
            qos: Qos::AtLeastOnce,
            topic_root: "te".to_string(),
            topic_id: "device/main//".to_string(),
            client: "tedge".to_string(),
            client_args: default_client_args(),
            fallback_topic: "c8y/s/us".to_string(),
            // SmartREST 501: set the pending operation of this type to FAILED.
            fallback_payload: "501,c8y_SoftwareUpdate".to_string(),
        }
    }
}

impl WaiterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_secs("duration_secs", self.duration_secs)?;
        check_secs("poll_interval_secs", self.poll_interval_secs)?;
        check_secs("publish_timeout_secs", self.publish_timeout_secs)?;
        check_secs("settle_secs", self.settle_secs)?;
        if self.poll_interval_secs == 0.0 {
            return Err(ConfirmError::InvalidConfig(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.publish_timeout_secs == 0.0 {
            return Err(ConfirmError::InvalidConfig(
                "publish_timeout_secs must be greater than zero".into(),
            ));
        }
        for (key, value) in [
            ("client", &self.client),
            ("topic_root", &self.topic_root),
            ("topic_id", &self.topic_id),
            ("fallback_topic", &self.fallback_topic),
        ] {
            if value.trim().is_empty() {
                return Err(ConfirmError::InvalidConfig(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.publish_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_secs)
    }

    pub fn topics(&self) -> TopicScheme {
        TopicScheme::new(&self.topic_root, &self.topic_id)
    }
}

fn check_secs(key: &str, value: f64) -> Result<()> {
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(ConfirmError::InvalidConfig(format!(
            "{key} must be a non-negative number of seconds, got {value}"
        )));
    }
    Ok(())
}
