//! Arrow-key publisher: entry point.
//!
//! Puts the terminal into raw mode, connects to an MQTT broker, and publishes
//! `UP`, `DOWN`, `LEFT`, or `RIGHT` to a topic every time an arrow key is
//! pressed.  Ctrl-C stops capture, drains the remaining events, restores the
//! terminal, and exits with status 0.
//!
//! # Usage
//!
//! ```text
//! arrowkey-publisher [OPTIONS]
//!
//! Options:
//!   --host <HOST>              MQTT broker host [default: localhost]
//!   --port <PORT>              MQTT broker port [default: 1883]
//!   --keepalive <SECS>         MQTT keep-alive interval [default: 60]
//!   --topic <TOPIC>            Topic to publish to [default: keyboard/arrow]
//!   --client-id <ID>           MQTT client id [default: arrowkey-publisher-<random>]
//!   --queue-capacity <N>       Events buffered while the broker is slow [default: 20]
//!   --qos <0|1|2>              MQTT quality of service [default: 0]
//!   --reconnect-delay <SECS>   Pause between reconnect attempts [default: 1]
//!   --log-level <FILTER>       Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                        | Default          |
//! |---------------------------------|------------------|
//! | `ARROWKEY_BROKER_HOST`          | `localhost`      |
//! | `ARROWKEY_BROKER_PORT`          | `1883`           |
//! | `ARROWKEY_KEEPALIVE_SECS`       | `60`             |
//! | `ARROWKEY_TOPIC`                | `keyboard/arrow` |
//! | `ARROWKEY_CLIENT_ID`            | random           |
//! | `ARROWKEY_QUEUE_CAPACITY`       | `20`             |
//! | `ARROWKEY_QOS`                  | `0`              |
//! | `ARROWKEY_RECONNECT_DELAY_SECS` | `1`              |
//!
//! Logs are written to stderr so they never mix with anything on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use arrowkey_core::{PipelineConfig, QualityOfService};
use arrowkey_publisher::application::pipeline::Pipeline;
use arrowkey_publisher::infrastructure::broker::{mqtt, LoggingHandler};
use arrowkey_publisher::infrastructure::terminal::raw::{install_panic_restore, RawTerminal};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Publishes terminal arrow-key presses to an MQTT topic.
#[derive(Debug, Parser)]
#[command(
    name = "arrowkey-publisher",
    about = "Publishes terminal arrow-key presses to an MQTT topic",
    version
)]
struct Cli {
    /// Hostname or IP address of the MQTT broker.
    #[arg(long, default_value = "localhost", env = "ARROWKEY_BROKER_HOST")]
    host: String,

    /// TCP port of the MQTT broker.
    #[arg(long, default_value_t = 1883, env = "ARROWKEY_BROKER_PORT")]
    port: u16,

    /// MQTT keep-alive interval in seconds (minimum 5).
    #[arg(long, default_value_t = 60, env = "ARROWKEY_KEEPALIVE_SECS")]
    keepalive: u64,

    /// Topic every key event is published to.
    #[arg(long, default_value = "keyboard/arrow", env = "ARROWKEY_TOPIC")]
    topic: String,

    /// MQTT client identifier.
    ///
    /// Defaults to `arrowkey-publisher-` plus a random suffix so two running
    /// publishers never kick each other off the broker.
    #[arg(long, env = "ARROWKEY_CLIENT_ID")]
    client_id: Option<String>,

    /// Maximum number of events waiting to be published.  Further key presses
    /// are dropped until the publisher catches up.
    #[arg(long, default_value_t = 20, env = "ARROWKEY_QUEUE_CAPACITY")]
    queue_capacity: usize,

    /// MQTT quality of service level: 0, 1, or 2.
    #[arg(long, default_value_t = 0, env = "ARROWKEY_QOS")]
    qos: u8,

    /// Seconds to wait before reconnecting after a connection error.
    #[arg(long, default_value_t = 1, env = "ARROWKEY_RECONNECT_DELAY_SECS")]
    reconnect_delay: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Converts the parsed CLI arguments into a validated [`PipelineConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--qos` is out of range or any field fails
    /// [`PipelineConfig::validate`].
    fn into_pipeline_config(self) -> anyhow::Result<PipelineConfig> {
        let qos = QualityOfService::from_level(self.qos).context("invalid --qos")?;
        let client_id = self.client_id.unwrap_or_else(random_client_id);

        let config = PipelineConfig {
            broker_host: self.host,
            broker_port: self.port,
            keep_alive: Duration::from_secs(self.keepalive),
            client_id,
            topic: self.topic,
            queue_capacity: self.queue_capacity,
            qos,
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
        };
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn random_client_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("arrowkey-publisher-{}", &suffix[..8])
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.into_pipeline_config()?;
    info!(
        broker = %format!("{}:{}", config.broker_host, config.broker_port),
        topic = %config.topic,
        client_id = %config.client_id,
        "arrowkey-publisher starting"
    );

    // ── Terminal ──────────────────────────────────────────────────────────────
    let terminal = RawTerminal::acquire().context("cannot capture arrow keys")?;
    let restore = terminal.restore_handle();
    install_panic_restore(restore.clone());

    // ── Broker ────────────────────────────────────────────────────────────────
    // On failure `terminal` is dropped here, which restores the terminal.
    let (broker, mut event_loop) = mqtt::connect(&config).with_context(|| {
        format!(
            "cannot connect to broker at {}:{}",
            config.broker_host, config.broker_port
        )
    })?;

    // ── Run ───────────────────────────────────────────────────────────────────
    let pipeline = Pipeline::new(config, Arc::new(broker))?;
    let result = pipeline.run(terminal, &mut event_loop, &LoggingHandler);

    // No-op after a normal shutdown; needed when the capture thread is still
    // blocked in a read because the event loop failed.
    if let Err(e) = restore.restore() {
        warn!("failed to restore terminal mode: {e}");
    }

    let report = result.context("pipeline failed")?;
    info!(
        reason = ?report.capture,
        published = report.stats.published,
        dropped = report.stats.dropped,
        publish_failed = report.stats.publish_failed,
        "arrowkey-publisher stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
