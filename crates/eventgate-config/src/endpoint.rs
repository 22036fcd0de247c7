//! Listen address for the gateway's WebSocket listener.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// TCP address the gateway accepts WebSocket upgrades on.
///
/// Parsed from `tcp://host:port` or `ws://host[:port]`; the scheme only selects
/// the notation, both bind a plain TCP listener. `ws` falls back to port 80.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "EndpointRepr", into = "String")]
pub struct ListenEndpoint {
    /// Host name or IP literal to bind.
    pub host: String,
    /// TCP port to bind. Zero asks the OS for an ephemeral port.
    pub port: u16,
}

impl ListenEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if !matches!(url.scheme(), "tcp" | "ws") {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let raw_host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        let host = raw_host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(host, port))
    }
}

/// Accepted serialised shapes: the URL notation used on the command line and in
/// the environment, or an inline `{ host, port }` table.
#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Text(String),
    Parts { host: String, port: u16 },
}

impl TryFrom<EndpointRepr> for ListenEndpoint {
    type Error = EndpointParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Text(text) => text.parse(),
            EndpointRepr::Parts { host, port } => Ok(Self::new(host, port)),
        }
    }
}

impl From<ListenEndpoint> for String {
    fn from(endpoint: ListenEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`ListenEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was neither `tcp` nor `ws`.
    #[error("unsupported listen scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host was missing from the address.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
