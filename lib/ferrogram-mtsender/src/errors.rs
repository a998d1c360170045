// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use ferrogram_mtproto::{transport, DeserializeError};
use ferrogram_tl as tl;
use std::{fmt, io};

/// The error type reported by the server when a request is misused.
///
/// These are returned when the server responds to an RPC with
/// [`tl::types::RpcError`].
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    /// A numerical value similar to HTTP status codes.
    pub code: i32,

    /// The ASCII error name, normally in screaming snake case.
    ///
    /// Digit words are removed from the name and put in the
    /// [`RpcError::value`] instead.
    pub name: String,

    /// If the error contained an additional integer value, it will be
    /// present here and removed from the [`RpcError::name`].
    pub value: Option<u32>,

    /// The constructor identifier of the request that triggered this
    /// error. Won't be present if the error was artificially
    /// constructed.
    pub caused_by: Option<u32>,
}

impl std::error::Error for RpcError {}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.name)?;
        if let Some(caused_by) = self.caused_by {
            write!(f, " caused by {}", tl::name_for_id(caused_by))?;
        }
        if let Some(value) = self.value {
            write!(f, " (value: {})", value)?;
        }
        Ok(())
    }
}

impl From<tl::types::RpcError> for RpcError {
    fn from(error: tl::types::RpcError) -> Self {
        // Extract the numeric value in the error, if any.
        if let Some((value, parsed_value)) = error
            .error_message
            .split(|c: char| !c.is_ascii_digit())
            .flat_map(|value| {
                value
                    .parse::<u32>()
                    .map(|parsed_value| (value, parsed_value))
            })
            .next()
        {
            let mut to_remove = String::with_capacity(1 + value.len());
            to_remove.push('_');
            to_remove.push_str(value);
            Self {
                code: error.error_code,
                name: error.error_message.replace(&to_remove, ""),
                value: Some(parsed_value),
                caused_by: None,
            }
        } else {
            Self {
                code: error.error_code,
                name: error.error_message.clone(),
                value: None,
                caused_by: None,
            }
        }
    }
}

impl RpcError {
    /// Matches on the name of the RPC error (case-sensitive).
    ///
    /// Useful in `match` arm guards. A single trailing or leading
    /// asterisk (`'*'`) is allowed, and will instead check if the
    /// error name starts (or ends with) the input parameter.
    pub fn is(&self, rpc_error: &str) -> bool {
        if let Some(rpc_error) = rpc_error.strip_suffix('*') {
            self.name.starts_with(rpc_error)
        } else if let Some(rpc_error) = rpc_error.strip_prefix('*') {
            self.name.ends_with(rpc_error)
        } else {
            self.name == rpc_error
        }
    }

    /// Attaches the constructor identifier of the request that caused
    /// this error to the error information.
    pub fn with_caused_by(mut self, constructor_id: u32) -> Self {
        self.caused_by = Some(constructor_id);
        self
    }
}

/// This error occurs when a Remote Procedure Call was unsuccessful.
#[derive(Debug)]
pub enum InvocationError {
    /// The request invocation failed because it was invalid or the
    /// server could not process it successfully.
    Rpc(RpcError),

    /// The server notified us that the message carrying this request
    /// was ill-formed, and the condition is not one the sender can
    /// heal on its own.
    BadMessage {
        /// The code of the bad message error.
        code: i32,
    },

    /// Standard I/O error while sending or reading the response.
    Io(io::Error),

    /// Error propagated from attempting to deserialize an invalid
    /// server message.
    Deserialize(DeserializeError),

    /// Error propagated from the underlying [`transport`].
    Transport(transport::Error),

    /// The request was cancelled or dropped, and the results won't
    /// arrive. This happens when the connection goes away while the
    /// request was still tracked.
    Dropped,

    /// The request cannot be enqueued because the sender is not
    /// connected.
    NotConnected,
}

impl InvocationError {
    /// Human-readable description for a bad-message code, adapted
    /// from [Service Messages about Messages].
    ///
    /// [Service Messages about Messages]: https://core.telegram.org/mtproto/service_messages_about_messages
    pub(crate) fn describe_bad_message(code: i32) -> &'static str {
        match code {
            16 => "msg_id too low",
            17 => "msg_id too high",
            18 => "incorrect two lower order msg_id bits; this is a bug",
            19 => "container msg_id is the same as msg_id of a previously received message; this is a bug",
            20 => "message too old",
            32 => "msg_seqno too low",
            33 => "msg_seqno too high",
            34 => "an even msg_seqno expected; this may be a bug",
            35 => "odd msg_seqno expected; this may be a bug",
            48 => "incorrect server salt",
            64 => "invalid container; this is likely a bug",
            _ => "unknown explanation; please report this issue",
        }
    }

    /// Matches on the name of the RPC error (case-sensitive).
    ///
    /// If the error is not a RPC error, returns `false`.
    #[inline]
    pub fn is(&self, rpc_error: &str) -> bool {
        match self {
            Self::Rpc(rpc) => rpc.is(rpc_error),
            _ => false,
        }
    }
}

impl std::error::Error for InvocationError {}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(err) => write!(f, "request error: {}", err),
            Self::BadMessage { code } => write!(
                f,
                "request error: bad message (code {}, {})",
                code,
                Self::describe_bad_message(*code)
            ),
            Self::Io(err) => write!(f, "request error: {}", err),
            Self::Deserialize(err) => write!(f, "request error: {}", err),
            Self::Transport(err) => write!(f, "request error: {}", err),
            Self::Dropped => write!(f, "request error: dropped (cancelled)"),
            Self::NotConnected => write!(f, "request error: not connected"),
        }
    }
}

impl From<DeserializeError> for InvocationError {
    fn from(error: DeserializeError) -> Self {
        Self::Deserialize(error)
    }
}

impl From<transport::Error> for InvocationError {
    fn from(error: transport::Error) -> Self {
        Self::Transport(error)
    }
}

impl From<tl::deserialize::Error> for InvocationError {
    fn from(error: tl::deserialize::Error) -> Self {
        Self::Deserialize(error.into())
    }
}

impl From<io::Error> for InvocationError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
