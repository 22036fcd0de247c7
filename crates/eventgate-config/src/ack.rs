//! Acknowledgement policy for accepted event batches.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Controls when a client sees the response for a batch.
///
/// Parsing is deliberately permissive: `synchronous`, `sync` and `1` select
/// [`AckMode::Synchronous`]; every other value, recognised or not, selects
/// [`AckMode::Asynchronous`]. A typo therefore degrades to the lower-latency
/// mode instead of refusing to start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum AckMode {
    /// Respond only after the collector reports the batch outcome.
    Synchronous,
    /// Respond as soon as the batch decodes; collector failures stay
    /// server-side.
    #[default]
    Asynchronous,
}

impl AckMode {
    /// Canonical configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AckMode {
    type Err = Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        Ok(match normalised.as_str() {
            "synchronous" | "sync" | "1" => Self::Synchronous,
            _ => Self::Asynchronous,
        })
    }
}

impl From<String> for AckMode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(infallible) => match infallible {},
        }
    }
}

impl From<AckMode> for String {
    fn from(mode: AckMode) -> Self {
        mode.as_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("synchronous", AckMode::Synchronous)]
    #[case("SYNC", AckMode::Synchronous)]
    #[case(" 1 ", AckMode::Synchronous)]
    #[case("asynchronous", AckMode::Asynchronous)]
    #[case("0", AckMode::Asynchronous)]
    #[case("eventually", AckMode::Asynchronous)]
    #[case("", AckMode::Asynchronous)]
    fn parses_permissively(#[case] input: &str, #[case] expected: AckMode) {
        assert_eq!(AckMode::from(input.to_owned()), expected);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for mode in [AckMode::Synchronous, AckMode::Asynchronous] {
            assert_eq!(AckMode::from(mode.to_string()), mode);
        }
    }
}
