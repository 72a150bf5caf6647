use anyhow::Context;
use confirm_core::{
    ConfirmationSource, MarkerFile, MqttCliPublisher, NeverConfirmed, Operation, Waiter,
    WaiterConfig, EXIT_ERROR,
};
use std::future::Future;
use tracing::{info, warn};

use crate::Cli;

/// Run the waiter for the operation named on the command line and return the
/// process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let operation =
        Operation::parse(&cli.topic, &cli.payload).context("failed to read operation")?;
    let config = load_config(&cli)?;
    config.validate().context("invalid configuration")?;

    let publisher = MqttCliPublisher::from_config(&config)?;
    let confirmation: Box<dyn ConfirmationSource> = match &cli.confirm_file {
        Some(path) => Box::new(MarkerFile::new(path)),
        None => Box::new(NeverConfirmed),
    };
    let mut waiter = Waiter::new(&config, publisher, confirmation);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let result = rt.block_on(until_interrupted(
        waiter.run(&operation),
        tokio::signal::ctrl_c(),
    ));

    match result {
        Interruptible::Completed(outcome) => Ok(outcome?.exit_code()),
        Interruptible::Interrupted => {
            info!("Stopping...");
            Ok(EXIT_ERROR)
        }
    }
}

/// Config file values (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> anyhow::Result<WaiterConfig> {
    let mut config = match &cli.config {
        Some(path) => WaiterConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WaiterConfig::default(),
    };

    if let Some(secs) = cli.duration {
        config.duration_secs = secs;
    }
    if let Some(secs) = cli.interval {
        config.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.publish_timeout {
        config.publish_timeout_secs = secs;
    }
    if let Some(secs) = cli.settle {
        config.settle_secs = secs;
    }
    if let Some(qos) = cli.qos {
        config.qos = qos;
    }
    if let Some(root) = &cli.topic_root {
        config.topic_root = root.clone();
    }
    if let Some(id) = &cli.topic_id {
        config.topic_id = id.clone();
    }
    if let Some(client) = &cli.client {
        config.client = client.clone();
    }
    Ok(config)
}

#[derive(Debug, PartialEq, Eq)]
pub enum Interruptible<T> {
    Completed(T),
    Interrupted,
}

/// Drive `work` to completion unless `interrupt` resolves first.
///
/// Dropping `work` on interrupt also kills any publish client still running.
/// If the interrupt listener itself fails, `work` runs on uninterruptible.
pub async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Interruptible<T> {
    let interrupt = async {
        if let Err(e) = interrupt.await {
            warn!(error = %e, "Cannot listen for interrupts");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        biased;
        _ = interrupt => Interruptible::Interrupted,
        out = work => Interruptible::Completed(out),
    }
}
