//! Builders for the responses the gateway writes.

use std::collections::HashMap;
use std::fmt::Display;

use time::OffsetDateTime;

use crate::schema::{Code, REQ_GUID_KEY, SendEventResponse, Status};

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn echo(req_guid: &str) -> HashMap<String, String> {
    HashMap::from([(REQ_GUID_KEY.to_owned(), req_guid.to_owned())])
}

impl SendEventResponse {
    /// Batch accepted.
    #[must_use]
    pub fn success(req_guid: &str) -> Self {
        Self {
            status: Status::Success as i32,
            code: Code::Ok as i32,
            sent_time: now_unix(),
            reason: String::new(),
            data: echo(req_guid),
        }
    }

    /// Frame could not be decoded. `req_guid` is empty when it could not be
    /// recovered from the payload.
    #[must_use]
    pub fn bad_request(req_guid: &str, err: impl Display) -> Self {
        Self {
            status: Status::Error as i32,
            code: Code::BadRequest as i32,
            sent_time: now_unix(),
            reason: format!("cannot deserialize request: {err}"),
            data: echo(req_guid),
        }
    }

    /// Downstream delivery failed in synchronous mode.
    #[must_use]
    pub fn internal_error(req_guid: &str, err: impl Display) -> Self {
        Self {
            status: Status::Error as i32,
            code: Code::InternalError as i32,
            sent_time: now_unix(),
            reason: format!("cannot publish events: {err}"),
            data: echo(req_guid),
        }
    }

    /// Upgrade refused before any batch was read.
    #[must_use]
    pub fn rejected(code: Code, reason: impl Into<String>) -> Self {
        Self {
            status: Status::Error as i32,
            code: code as i32,
            sent_time: now_unix(),
            reason: reason.into(),
            data: HashMap::new(),
        }
    }

    /// Request id echoed in `data`, if any.
    #[must_use]
    pub fn req_guid(&self) -> Option<&str> {
        self.data.get(REQ_GUID_KEY).map(String::as_str)
    }
}
