/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of rets_core, a streaming RETS client.
 *
 * rets_core is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rets_core is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rets_core.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Client and protocol errors.

use std::io;

use thiserror::Error;

use crate::protocol::rets::CapabilityKind;

/// Errors from login, transport, authentication or response parsing.
///
/// Every variant is fatal for the request that produced it. Recoverable conditions
/// (initial 401 discovery, stale digest, session re-login, UA handshake) are handled
/// inside the transport and never reach the caller.
#[derive(Debug, Error)]
pub enum RetsError {
    /// HTTP status other than 200/401 and no RETS envelope in the body.
    #[error("HTTP {status}: {reason}")]
    Transport { status: u16, reason: String },

    /// RETS reply code outside the accepted success set.
    #[error("{code}: {text}")]
    Protocol { code: u32, text: String },

    /// Authentication retry exhausted.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Server challenged with no scheme we can answer.
    #[error("unsupported authentication: {0}")]
    UnsupportedAuth(String),

    /// The server did not advertise a URL for the requested operation.
    #[error("no {0} capability advertised for this session")]
    CapabilityMissing(CapabilityKind),

    /// No recognizable RETS envelope, or an envelope we cannot interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Connect or read timeout expired.
    #[error("request timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("XML error: {0}")]
    Xml(quick_xml::Error),
}

impl RetsError {
    pub fn protocol(code: u32, text: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            text: text.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// RETS reply code, for `Protocol` errors.
    pub fn reply_code(&self) -> Option<u32> {
        match self {
            RetsError::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// RETS reply text, for `Protocol` errors.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            RetsError::Protocol { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl From<io::Error> for RetsError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut {
            RetsError::Timeout
        } else {
            RetsError::Io(e)
        }
    }
}

impl From<quick_xml::Error> for RetsError {
    fn from(e: quick_xml::Error) -> Self {
        // Socket errors surface through the XML reader; keep timeouts distinguishable.
        match e {
            quick_xml::Error::Io(ref io) if io.kind() == io::ErrorKind::TimedOut => RetsError::Timeout,
            other => RetsError::Xml(other),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for RetsError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        RetsError::Xml(quick_xml::Error::from(e))
    }
}

impl From<tokio::time::error::Elapsed> for RetsError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RetsError::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_io_maps_to_timeout() {
        let e: RetsError = io::Error::new(io::ErrorKind::TimedOut, "read").into();
        assert!(matches!(e, RetsError::Timeout));
        let e: RetsError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(e, RetsError::Io(_)));
    }

    #[test]
    fn protocol_error_carries_code_and_text() {
        let e = RetsError::protocol(20000, "Error message goes here.");
        assert_eq!(e.reply_code(), Some(20000));
        assert_eq!(e.reply_text(), Some("Error message goes here."));
        assert_eq!(e.to_string(), "20000: Error message goes here.");
    }
}
