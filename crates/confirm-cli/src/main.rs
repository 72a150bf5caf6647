mod run;

use clap::Parser;
use confirm_core::{Qos, EXIT_ERROR};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "user-confirm",
    about = "Ask the local user to confirm a device-management operation",
    long_about = "Publishes \"waiting for confirmation\" notices until the operation is \
                  confirmed or the window closes.\n\n\
                  Exit codes: 0 = confirmed, 100 = not confirmed in time, 1 = error or interrupted.",
    version,
    args_override_self = true
)]
pub struct Cli {
    /// Topic the operation was received on
    pub topic: String,

    /// Operation payload (JSON)
    pub payload: String,

    /// YAML config file; flags override its values
    #[arg(long, env = "USER_CONFIRM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Confirmation window in seconds (default 60)
    #[arg(long, env = "USER_CONFIRM_DURATION", value_name = "SECS")]
    pub duration: Option<f64>,

    /// Seconds between confirmation checks (default 5)
    #[arg(long, env = "USER_CONFIRM_INTERVAL", value_name = "SECS")]
    pub interval: Option<f64>,

    /// Seconds to wait for one publish before killing the client (default 30)
    #[arg(long, env = "USER_CONFIRM_PUBLISH_TIMEOUT", value_name = "SECS")]
    pub publish_timeout: Option<f64>,

    /// Seconds to wait after the failure report before exiting (default 1)
    #[arg(long, env = "USER_CONFIRM_SETTLE", value_name = "SECS")]
    pub settle: Option<f64>,

    /// MQTT quality of service: 0, 1 or 2 (default 1)
    #[arg(long, env = "USER_CONFIRM_QOS")]
    pub qos: Option<Qos>,

    /// Root of the local topic scheme (default "te")
    #[arg(long, env = "USER_CONFIRM_TOPIC_ROOT")]
    pub topic_root: Option<String>,

    /// Topic id of the device asking for confirmation (default "device/main//")
    #[arg(long, env = "USER_CONFIRM_TOPIC_ID")]
    pub topic_id: Option<String>,

    /// MQTT publish client executable (default "tedge")
    #[arg(long, env = "USER_CONFIRM_CLIENT")]
    pub client: Option<String>,

    /// Treat the operation as confirmed once this file exists
    #[arg(long, env = "USER_CONFIRM_FILE", value_name = "PATH")]
    pub confirm_file: Option<PathBuf>,

    /// Minimum log level; RUST_LOG directives are applied on top
    #[arg(long, env = "USER_CONFIRM_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,
}

fn main() {
    // Argument errors must exit with EXIT_ERROR, not clap's usage code.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(EXIT_ERROR);
        }
        Err(e) => e.exit(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
