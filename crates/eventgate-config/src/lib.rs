//! Shared configuration for the eventgate gateway.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! (`--config-path` or `EVENTGATE_CONFIG_PATH`), then `EVENTGATE_*`
//! environment variables, then command-line flags. The later layer wins.
//!
//! The upgrade options (buffer sizes, origin policy, capacity, keepalive
//! intervals and identifying headers) are read by the gateway's handshake;
//! `ack_mode` and `dedup_enabled` shape the per-connection pipeline.

mod ack;
mod defaults;
mod endpoint;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use ack::AckMode;
pub use defaults::*;
pub use endpoint::{EndpointParseError, ListenEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "EVENTGATE")]
pub struct Config {
    /// Address the WebSocket listener binds.
    #[ortho_config(default = defaults::default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// Socket read buffer handed to the framing layer, in bytes.
    #[ortho_config(default = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,
    /// Socket write buffer handed to the framing layer, in bytes.
    #[ortho_config(default = DEFAULT_WRITE_BUFFER_SIZE)]
    pub write_buffer_size: usize,
    /// Rejects upgrades whose `Origin` host differs from `Host`.
    #[ortho_config(default = false)]
    pub check_origin: bool,
    /// Maximum simultaneously registered connections.
    #[ortho_config(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// Liveness window in milliseconds.
    #[ortho_config(default = DEFAULT_PONG_WAIT_MS)]
    pub pong_wait_ms: u64,
    /// Interval between server pings in milliseconds.
    #[ortho_config(default = DEFAULT_PING_INTERVAL_MS)]
    pub ping_interval_ms: u64,
    /// Budget for a single frame write in milliseconds.
    #[ortho_config(default = DEFAULT_WRITE_WAIT_MS)]
    pub write_wait_ms: u64,
    /// Upgrade header carrying the connection id.
    #[ortho_config(default = defaults::default_conn_id_header())]
    pub conn_id_header: String,
    /// Upgrade header carrying the connection group.
    #[ortho_config(default = defaults::default_conn_group_header())]
    pub conn_group_header: String,
    /// Group used when the group header is absent or empty.
    #[ortho_config(default = defaults::default_conn_group())]
    pub conn_group_default: String,
    /// When clients receive their acknowledgement.
    #[ortho_config(default = defaults::default_ack_mode())]
    pub ack_mode: AckMode,
    /// Acknowledge replayed request ids without collecting them again.
    #[ortho_config(default = false)]
    pub dedup_enabled: bool,
    /// Collector worker threads.
    #[ortho_config(default = DEFAULT_WORKER_POOL_SIZE)]
    pub worker_pool_size: usize,
    /// Capacity of the collector hand-off channel.
    #[ortho_config(default = DEFAULT_COLLECTOR_BUFFER)]
    pub collector_buffer: usize,
    /// Interval between connection gauge reports in milliseconds.
    #[ortho_config(default = DEFAULT_REPORT_INTERVAL_MS)]
    pub report_interval_ms: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            check_origin: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            pong_wait_ms: DEFAULT_PONG_WAIT_MS,
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            write_wait_ms: DEFAULT_WRITE_WAIT_MS,
            conn_id_header: default_conn_id_header(),
            conn_group_header: default_conn_group_header(),
            conn_group_default: default_conn_group(),
            ack_mode: default_ack_mode(),
            dedup_enabled: false,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            collector_buffer: DEFAULT_COLLECTOR_BUFFER,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] when a layer cannot be read or parsed, or
    /// when a value fails validation (for example an unsupported listen
    /// scheme).
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The environment and configuration file layers still apply; `args`
    /// replaces only the command line.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] under the same conditions as
    /// [`Config::load`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Address the listener binds.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Liveness window.
    #[must_use]
    pub const fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Interval between server pings.
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Budget for a single frame write.
    #[must_use]
    pub const fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    /// Interval between connection gauge reports.
    #[must_use]
    pub const fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}
