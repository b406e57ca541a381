/*
 * response.rs
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

//! HTTP response head: status line and header fields, in arrival order.

use crate::protocol::http::content_type::{parse_content_type, ContentType};

#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    pub code: u16,
    pub reason: String,
    /// Header fields as received; names may repeat (Set-Cookie, WWW-Authenticate).
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    /// First value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of the named header, in order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn is_chunked(&self) -> bool {
        self.header_values("transfer-encoding")
            .any(|v| v.to_ascii_lowercase().contains("chunked"))
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.header("content-type").and_then(parse_content_type)
    }

    /// Whether this status carries a body at all.
    pub fn has_body(&self) -> bool {
        !(self.code == 204 || self.code == 304 || (100..200).contains(&self.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_headers_are_kept() {
        let mut head = ResponseHead::new(401, "Unauthorized");
        head.headers.push(("WWW-Authenticate".into(), "Basic realm=\"x\"".into()));
        head.headers.push(("www-authenticate".into(), "Digest realm=\"x\"".into()));
        let values: Vec<&str> = head.header_values("WWW-Authenticate").collect();
        assert_eq!(values.len(), 2);
        assert_eq!(head.header("WWW-AUTHENTICATE"), Some("Basic realm=\"x\""));
    }

    #[test]
    fn framing_headers() {
        let mut head = ResponseHead::new(200, "OK");
        head.headers.push(("Content-Length".into(), " 42 ".into()));
        head.headers.push(("Transfer-Encoding".into(), "Chunked".into()));
        assert_eq!(head.content_length(), Some(42));
        assert!(head.is_chunked());
    }
}
