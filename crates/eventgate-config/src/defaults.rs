use crate::ack::AckMode;
use crate::endpoint::ListenEndpoint;
use crate::logging::LogFormat;

/// Default host the listener binds.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Default TCP port for WebSocket upgrades.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default socket read buffer, in bytes.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 10_240;

/// Default socket write buffer, in bytes.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 10_240;

/// Default ceiling on simultaneously registered connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 30_000;

/// Default liveness window: a connection silent for this long is dropped.
pub const DEFAULT_PONG_WAIT_MS: u64 = 60_000;

/// Default interval between server pings.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 30_000;

/// Default budget for a single frame write.
pub const DEFAULT_WRITE_WAIT_MS: u64 = 5_000;

/// Default header carrying the connection id.
pub const DEFAULT_CONN_ID_HEADER: &str = "X-User-ID";

/// Default header carrying the connection group.
pub const DEFAULT_CONN_GROUP_HEADER: &str = "X-User-Group";

/// Group assigned when the group header is absent.
pub const DEFAULT_CONN_GROUP: &str = "--default--";

/// Default number of collector worker threads.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 5;

/// Default capacity of the collector hand-off channel.
pub const DEFAULT_COLLECTOR_BUFFER: usize = 10_000;

/// Default interval between connection gauge reports.
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 3_000;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default listen endpoint.
#[must_use]
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT)
}

/// Owned default connection id header.
#[must_use]
pub fn default_conn_id_header() -> String {
    DEFAULT_CONN_ID_HEADER.to_owned()
}

/// Owned default connection group header.
#[must_use]
pub fn default_conn_group_header() -> String {
    DEFAULT_CONN_GROUP_HEADER.to_owned()
}

/// Owned default connection group.
#[must_use]
pub fn default_conn_group() -> String {
    DEFAULT_CONN_GROUP.to_owned()
}

/// Default acknowledgement mode.
#[must_use]
pub const fn default_ack_mode() -> AckMode {
    AckMode::Asynchronous
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
