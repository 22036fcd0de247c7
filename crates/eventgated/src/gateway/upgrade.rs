//! WebSocket upgrade with admission control.
//!
//! The handshake callback reads the connection identifier from the request
//! headers, applies the origin policy and registers the identifier. Any
//! refusal is written as an HTTP error response, so a rejected client is never
//! promoted to a WebSocket.

use std::net::TcpStream;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use tungstenite::handshake::HandshakeError;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::header::{CONTENT_TYPE, HOST, HeaderValue, ORIGIN};
use tungstenite::http::{HeaderMap, StatusCode};
use tungstenite::protocol::WebSocketConfig;
use tungstenite::{WebSocket, accept_hdr_with_config};
use url::Url;

use eventgate_config::Config;
use eventgate_proto::{Code, Codec, SendEventResponse};

use super::GATEWAY_TARGET;
use crate::identifier::Identifier;
use crate::instrumentation::GatewayMetrics;
use crate::registry::{ConnectionTable, RegistryError};
use crate::session::Session;

/// Admission settings taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeSettings {
    /// Header carrying the connection id.
    pub conn_id_header: String,
    /// Header carrying the connection group.
    pub conn_group_header: String,
    /// Group used when the group header is absent or empty.
    pub conn_group_default: String,
    /// Reject cross-origin upgrades.
    pub check_origin: bool,
    /// Framing read buffer in bytes.
    pub read_buffer_size: usize,
    /// Framing write buffer in bytes.
    pub write_buffer_size: usize,
}

impl From<&Config> for UpgradeSettings {
    fn from(config: &Config) -> Self {
        Self {
            conn_id_header: config.conn_id_header.clone(),
            conn_group_header: config.conn_group_header.clone(),
            conn_group_default: config.conn_group_default.clone(),
            check_origin: config.check_origin,
            read_buffer_size: config.read_buffer_size,
            write_buffer_size: config.write_buffer_size,
        }
    }
}

/// Why an upgrade was refused before registration succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The id header was absent or empty.
    #[error("missing connection id header {header}")]
    MissingId {
        /// Configured id header.
        header: String,
    },
    /// The `Origin` host differs from `Host`.
    #[error("origin {origin} not allowed")]
    Origin {
        /// Offending origin value.
        origin: String,
    },
    /// Registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl Rejection {
    /// Metric label value.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MissingId { .. } => "missing_id",
            Self::Origin { .. } => "origin",
            Self::Registry(error) => error.as_str(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingId { .. } => StatusCode::BAD_REQUEST,
            Self::Origin { .. } => StatusCode::FORBIDDEN,
            Self::Registry(RegistryError::MaxCapacity) => StatusCode::TOO_MANY_REQUESTS,
            Self::Registry(RegistryError::Duplicate) => StatusCode::CONFLICT,
        }
    }

    const fn code(&self) -> Code {
        match self {
            Self::MissingId { .. } | Self::Origin { .. } => Code::BadRequest,
            Self::Registry(RegistryError::MaxCapacity) => Code::MaxConnectionLimitReached,
            Self::Registry(RegistryError::Duplicate) => Code::MaxUserLimitReached,
        }
    }

    /// HTTP response written to the refused client.
    fn response(&self) -> ErrorResponse {
        let rejection = SendEventResponse::rejected(self.code(), self.to_string());
        let body = Codec::JSON
            .encode(&rejection)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
        let mut response = ErrorResponse::new(body);
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Failure to upgrade an accepted connection.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The handshake was refused by admission control.
    #[error("upgrade rejected with status {status}")]
    Rejected {
        /// HTTP status written to the client.
        status: u16,
    },
    /// The handshake failed at the protocol level.
    #[error("websocket handshake failed: {0}")]
    Handshake(Box<tungstenite::Error>),
    /// The handshake would block; only possible on non-blocking streams.
    #[error("websocket handshake interrupted")]
    Interrupted,
    /// The handshake completed without running admission.
    #[error("websocket handshake completed without admission")]
    NotAdmitted,
}

impl<R> From<HandshakeError<R>> for UpgradeError
where
    R: tungstenite::handshake::HandshakeRole,
{
    fn from(error: HandshakeError<R>) -> Self {
        match error {
            HandshakeError::Failure(tungstenite::Error::Http(response)) => Self::Rejected {
                status: response.status().as_u16(),
            },
            HandshakeError::Failure(error) => Self::Handshake(Box::new(error)),
            HandshakeError::Interrupted(_) => Self::Interrupted,
        }
    }
}

/// An admitted, upgraded connection.
pub struct Upgraded {
    /// The WebSocket.
    pub socket: WebSocket<TcpStream>,
    /// Registration guard for the connection.
    pub session: Session,
}

/// Performs admission-controlled upgrades.
pub struct Upgrader {
    settings: UpgradeSettings,
    table: Arc<ConnectionTable>,
    metrics: Arc<dyn GatewayMetrics>,
}

impl Upgrader {
    /// Builds an upgrader registering into `table`.
    #[must_use]
    pub const fn new(
        settings: UpgradeSettings,
        table: Arc<ConnectionTable>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            settings,
            table,
            metrics,
        }
    }

    /// Reads the identifier from upgrade headers.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::MissingId`] when the id header is absent, empty or
    /// not valid text.
    pub fn identify(&self, headers: &HeaderMap) -> Result<Identifier, Rejection> {
        let id = header_text(headers, &self.settings.conn_id_header).ok_or_else(|| {
            Rejection::MissingId {
                header: self.settings.conn_id_header.clone(),
            }
        })?;
        let group = header_text(headers, &self.settings.conn_group_header)
            .unwrap_or(self.settings.conn_group_default.as_str());
        Ok(Identifier::new(id, group))
    }

    /// Applies the origin policy.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Origin`] when checking is enabled and the origin
    /// host differs from `Host`.
    pub fn check_origin(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        if !self.settings.check_origin {
            return Ok(());
        }
        let Some(origin_header) = headers.get(ORIGIN) else {
            return Ok(());
        };
        let origin = origin_header.to_str().unwrap_or_default();
        let host = headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        match origin_authority(origin) {
            Some(authority) if authority.eq_ignore_ascii_case(host) => Ok(()),
            _ => Err(Rejection::Origin {
                origin: origin.to_owned(),
            }),
        }
    }

    /// Identifies, checks and registers the connection described by `request`.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] that refused admission.
    pub fn admit(&self, request: &Request) -> Result<Identifier, Rejection> {
        let headers = request.headers();
        let outcome = self.identify(headers).and_then(|identifier| {
            self.check_origin(headers)?;
            self.table.store(&identifier)?;
            Ok(identifier)
        });
        match &outcome {
            Ok(identifier) => {
                self.metrics.connection_accepted(&identifier.group);
                info!(
                    target: GATEWAY_TARGET,
                    connection = %identifier,
                    "connection admitted"
                );
            }
            Err(rejection) => {
                let group = header_text(headers, &self.settings.conn_group_header)
                    .unwrap_or(self.settings.conn_group_default.as_str());
                self.metrics.connection_rejected(rejection.label(), group);
                debug!(
                    target: GATEWAY_TARGET,
                    reason = %rejection,
                    "connection rejected"
                );
            }
        }
        outcome
    }

    fn config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.read_buffer_size = self.settings.read_buffer_size;
        config.write_buffer_size = self.settings.write_buffer_size;
        config
    }

    /// Runs the handshake on `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError`] when the client is refused or the handshake
    /// fails. A registration made before a late handshake failure is undone.
    pub fn upgrade(&self, stream: TcpStream) -> Result<Upgraded, UpgradeError> {
        let mut admitted = None;
        let result = accept_hdr_with_config(
            stream,
            |request: &Request, response: Response| match self.admit(request) {
                Ok(identifier) => {
                    admitted = Some(identifier);
                    Ok(response)
                }
                Err(rejection) => Err(rejection.response()),
            },
            Some(self.config()),
        );
        let socket = match result {
            Ok(socket) => socket,
            Err(failure) => {
                let error = UpgradeError::from(failure);
                if let Some(identifier) = admitted.take() {
                    self.table.remove(&identifier);
                }
                return Err(error);
            }
        };
        let identifier = admitted.ok_or(UpgradeError::NotAdmitted)?;
        Ok(Upgraded {
            socket,
            session: Session::open(identifier, Arc::clone(&self.table), Arc::clone(&self.metrics)),
        })
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}
