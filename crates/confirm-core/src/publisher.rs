//! Publishing messages on the local MQTT bus.
//!
//! The waiter only depends on the [`Publisher`] trait. The production
//! implementation, [`MqttCliPublisher`], runs a command-line client once per
//! message (by default `tedge mqtt pub`, which picks up the broker address and
//! any client certificates from the device configuration).

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::WaiterConfig;
use crate::error::{ConfirmError, Result};
use crate::types::{Payload, Qos};

/// Largest slice of client output kept in a [`Delivery::Rejected`].
const MAX_OUTPUT: usize = 4 * 1024;

/// How a single publish attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The client ran but reported failure. `code` is `None` when the client
    /// was terminated by a signal.
    Rejected { code: Option<i32>, output: String },
    /// The client did not finish within the publish timeout and was killed.
    TimedOut(Duration),
}

pub trait Publisher {
    /// Publish one message. A message the bus did not accept is reported as a
    /// non-delivered [`Delivery`]; `Err` is reserved for failures to run the
    /// publish at all.
    fn publish(&self, topic: &str, payload: &Payload) -> impl Future<Output = Result<Delivery>>;
}

// ─── MqttCliPublisher ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MqttCliPublisher {
    program: PathBuf,
    args: Vec<String>,
    qos: Qos,
    timeout: Duration,
}

impl MqttCliPublisher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, qos: Qos, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            qos,
            timeout,
        }
    }

    /// Build a publisher from config, resolving the client on `PATH`.
    ///
    /// Fails up front when the client is not installed so that nothing is
    /// published by a run that could never report its outcome.
    pub fn from_config(config: &WaiterConfig) -> Result<Self> {
        let program = which::which(&config.client).map_err(|source| ConfirmError::ClientNotFound {
            name: config.client.clone(),
            source,
        })?;
        Ok(Self::new(
            program,
            config.client_args.clone(),
            config.qos,
            config.publish_timeout(),
        ))
    }

    fn build_command(&self, topic: &str, payload: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(format!("--qos={}", self.qos))
            .arg(topic)
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Publisher for MqttCliPublisher {
    async fn publish(&self, topic: &str, payload: &Payload) -> Result<Delivery> {
        let payload = payload.encode()?;
        let child = self
            .build_command(topic, &payload)
            .spawn()
            .map_err(|source| ConfirmError::ClientSpawnFailed {
                client: self.program.display().to_string(),
                source,
            })?;

        // On timeout the child is dropped with the future, and kill_on_drop
        // terminates it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_elapsed) => return Ok(Delivery::TimedOut(self.timeout)),
        };

        if output.status.success() {
            return Ok(Delivery::Delivered);
        }

        Ok(Delivery::Rejected {
            code: output.status.code(),
            output: format_output(&output.stdout, &output.stderr),
        })
    }
}

/// Combine stdout/stderr, keeping the tail when it is too long.
fn format_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let combined = match (stdout.trim(), stderr.trim()) {
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{out}\n{err}"),
    };
    if combined.len() <= MAX_OUTPUT {
        return combined;
    }
    let mut start = combined.len() - MAX_OUTPUT;
    while !combined.is_char_boundary(start) {
        start += 1;
    }
    combined[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use tempfile::TempDir;

    /// `sh -c <script> sh --qos=N <topic> <payload>`: the client's own
    /// arguments land in `$1..$3`.
    fn shell(script: &str, timeout: Duration) -> MqttCliPublisher {
        MqttCliPublisher::new(
            "sh",
            vec!["-c".into(), script.into(), "sh".into()],
            Qos::AtLeastOnce,
            timeout,
        )
    }

    #[tokio::test]
    async fn successful_client_is_delivered() {
        let publisher = shell("exit 0", Duration::from_secs(10));
        let delivery = publisher
            .publish("te/device/main///e/confirm", &Payload::from("hi"))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Delivered);
    }

    #[tokio::test]
    async fn client_receives_qos_topic_and_payload() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args");
        let script = format!("printf '%s\\n' \"$@\" > {}", log.display());
        let publisher = shell(&script, Duration::from_secs(10));

        let payload = Payload::from(json!({"text": "Waiting for user confirmation"}));
        let delivery = publisher
            .publish("te/device/main///e/confirm", &payload)
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Delivered);

        let args = std::fs::read_to_string(&log).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(
            args,
            vec![
                "--qos=1",
                "te/device/main///e/confirm",
                r#"{"text":"Waiting for user confirmation"}"#,
            ]
        );
    }

    #[tokio::test]
    async fn non_zero_exit_is_rejected_with_output() {
        let publisher = shell("echo 'connection refused' >&2; exit 3", Duration::from_secs(10));
        let delivery = publisher.publish("c8y/s/us", &Payload::from("501,x")).await.unwrap();
        assert_eq!(
            delivery,
            Delivery::Rejected {
                code: Some(3),
                output: "connection refused".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn slow_client_times_out() {
        let publisher = shell("sleep 60", Duration::from_millis(150));
        let start = Instant::now();
        let delivery = publisher.publish("t", &Payload::from("x")).await.unwrap();
        assert_eq!(delivery, Delivery::TimedOut(Duration::from_millis(150)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let publisher = MqttCliPublisher::new(
            "/nonexistent/mqtt-client",
            vec![],
            Qos::AtMostOnce,
            Duration::from_secs(1),
        );
        let err = publisher.publish("t", &Payload::from("x")).await.unwrap_err();
        assert!(matches!(err, ConfirmError::ClientSpawnFailed { .. }));
    }

    #[test]
    fn from_config_reports_missing_client() {
        let config = WaiterConfig {
            client: "definitely-not-an-mqtt-client-on-path".into(),
            ..Default::default()
        };
        let err = MqttCliPublisher::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfirmError::ClientNotFound { .. }));
    }

    #[test]
    fn from_config_resolves_client_on_path() {
        let config = WaiterConfig {
            client: "sh".into(),
            ..Default::default()
        };
        let publisher = MqttCliPublisher::from_config(&config).unwrap();
        assert!(publisher.program.is_absolute());
        assert_eq!(publisher.args, vec!["mqtt", "pub"]);
    }

    #[test]
    fn long_output_keeps_tail() {
        let stdout = "a".repeat(MAX_OUTPUT + 10) + "END";
        let out = format_output(stdout.as_bytes(), b"");
        assert_eq!(out.len(), MAX_OUTPUT);
        assert!(out.ends_with("END"));
    }
}
