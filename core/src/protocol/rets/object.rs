/*
 * object.rs
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

//! GetObject: photos and documents, either one object per response or several in a
//! `multipart/parallel` body. Multipart bodies are split as they arrive; only the part being
//! read is held in memory.

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RetsError;
use crate::protocol::http::{parse_content_type, ResponseHead};
use crate::protocol::rets::reply::{sniff_envelope, REPLY_NO_OBJECT, REPLY_SUCCESS};
use crate::protocol::rets::transport::ResponseBody;

pub const DEFAULT_ACCEPT: &str = "image/png,image/gif,image/jpeg";

/// Response headers describing a single-part object.
const OBJECT_HEADERS: [&str; 7] = [
    "object-id",
    "description",
    "content-id",
    "content-description",
    "location",
    "content-type",
    "preferred",
];

/// GetObject request parameters.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    pub resource: String,
    /// Object type, e.g. `Photo`.
    pub object_type: String,
    /// `ID`, e.g. `123456:*` or `123456:1:3`.
    pub id: String,
    /// Ask for URLs (`Location=1`) instead of content.
    pub location: bool,
    /// Media types for `Accept`; empty means the image default.
    pub accept: Vec<String>,
    pub read_timeout: Option<Duration>,
}

impl ObjectQuery {
    pub fn new(
        resource: impl Into<String>,
        object_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            object_type: object_type.into(),
            id: id.into(),
            location: false,
            accept: Vec::new(),
            read_timeout: None,
        }
    }

    pub fn location(mut self, location: bool) -> Self {
        self.location = location;
        self
    }

    pub fn accept<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("Resource", Some(self.resource.clone())),
            ("Type", Some(self.object_type.clone())),
            ("Location", Some(if self.location { "1" } else { "0" }.to_string())),
            ("ID", Some(self.id.clone())),
        ]
    }

    pub(crate) fn accept_header(&self) -> String {
        if self.accept.is_empty() {
            DEFAULT_ACCEPT.to_string()
        } else {
            self.accept.join(",")
        }
    }
}

/// One retrieved object: lower-cased header names to values, and the raw content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetsObject {
    pub headers: BTreeMap<String, String>,
    pub content: Bytes,
}

impl RetsObject {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn object_id(&self) -> Option<&str> {
        self.header("object-id")
    }

    pub fn content_id(&self) -> Option<&str> {
        self.header("content-id")
    }

    /// URL of the object when requested with `Location=1`.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// XML content type, or content that opens with a RETS element whatever its label.
    fn may_be_envelope(&self) -> bool {
        if self
            .content_type()
            .and_then(parse_content_type)
            .is_some_and(|ct| ct.is_xml())
        {
            return true;
        }
        let head = &self.content[..self.content.len().min(512)];
        let start = head.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(head.len());
        head[start..].starts_with(b"<")
            && head.windows(5).any(|w| w.eq_ignore_ascii_case(b"<RETS"))
    }
}

/// Parse CRLF separated `Name: value` lines. Names are lower-cased; empty values are
/// dropped; folded continuation lines are joined.
fn parse_part_headers(block: &[u8]) -> BTreeMap<String, String> {
    let text = String::from_utf8_lossy(block);
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut last: Option<String> = None;
    for line in text.split("\r\n") {
        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some(value) = last.as_ref().and_then(|name| headers.get_mut(name)) {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            last = None;
            continue;
        }
        let name = name.trim().to_ascii_lowercase();
        headers.insert(name.clone(), value.to_string());
        last = Some(name);
    }
    headers
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() || from > haystack.len() - needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn truncated(what: &str) -> RetsError {
    io::Error::new(io::ErrorKind::UnexpectedEof, what.to_string()).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultipartState {
    Preamble,
    Headers,
    Done,
}

/// Incremental `multipart/*` splitter (RFC 2046 framing).
pub struct MultipartReader<R> {
    inner: R,
    buf: BytesMut,
    /// `\r\n--boundary`; the body is seeded with CRLF so the first boundary matches too.
    delimiter: Vec<u8>,
    state: MultipartState,
    eof: bool,
}

impl<R: AsyncRead + Unpin> MultipartReader<R> {
    pub fn new(inner: R, boundary: &str) -> Self {
        let mut delimiter = b"\r\n--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        let mut buf = BytesMut::with_capacity(8192);
        buf.extend_from_slice(b"\r\n");
        Self {
            inner,
            buf,
            delimiter,
            state: MultipartState::Preamble,
            eof: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    async fn fill(&mut self) -> Result<bool, RetsError> {
        if self.eof {
            return Ok(false);
        }
        self.buf.reserve(8192);
        let n = self.inner.read_buf(&mut self.buf).await?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n > 0)
    }

    /// Find `needle` in the buffer, reading more as needed. `None` at end of input.
    async fn fill_until(&mut self, needle: &[u8]) -> Result<Option<usize>, RetsError> {
        let mut from = 0;
        loop {
            if let Some(i) = find(&self.buf, needle, from) {
                return Ok(Some(i));
            }
            from = self.buf.len().saturating_sub(needle.len() - 1);
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// After a delimiter: `--` closes the body, otherwise skip to the end of the line.
    async fn after_delimiter(&mut self) -> Result<(), RetsError> {
        while self.buf.len() < 2 && self.fill().await? {}
        if self.buf.starts_with(b"--") {
            self.state = MultipartState::Done;
            return Ok(());
        }
        match self.fill_until(b"\r\n").await? {
            Some(i) => {
                let _ = self.buf.split_to(i + 2);
                self.state = MultipartState::Headers;
                Ok(())
            }
            None => {
                self.state = MultipartState::Done;
                Err(truncated("multipart body ended after a boundary"))
            }
        }
    }

    /// Next part's headers and content; `None` after the closing boundary.
    pub async fn next_part(&mut self) -> Result<Option<RetsObject>, RetsError> {
        if self.state == MultipartState::Preamble {
            let delimiter = self.delimiter.clone();
            match self.fill_until(&delimiter).await? {
                Some(i) => {
                    let _ = self.buf.split_to(i + delimiter.len());
                    self.after_delimiter().await?;
                }
                None => {
                    self.state = MultipartState::Done;
                    return Err(RetsError::malformed("multipart body without a boundary"));
                }
            }
        }
        if self.state == MultipartState::Done {
            return Ok(None);
        }

        while self.buf.len() < 2 && self.fill().await? {}
        let headers = if self.buf.starts_with(b"\r\n") {
            let _ = self.buf.split_to(2);
            BTreeMap::new()
        } else {
            match self.fill_until(b"\r\n\r\n").await? {
                Some(i) => {
                    let block = self.buf.split_to(i + 4);
                    parse_part_headers(&block[..i])
                }
                None => {
                    self.state = MultipartState::Done;
                    return Err(truncated("multipart body ended inside part headers"));
                }
            }
        };

        let delimiter = self.delimiter.clone();
        let content = match self.fill_until(&delimiter).await? {
            Some(i) => {
                let content = self.buf.split_to(i).freeze();
                let _ = self.buf.split_to(delimiter.len());
                self.after_delimiter().await?;
                content
            }
            None => {
                self.state = MultipartState::Done;
                return Err(truncated("multipart body ended inside a part"));
            }
        };
        Ok(Some(RetsObject { headers, content }))
    }
}

enum ObjectSource {
    Single(Option<RetsObject>),
    Multipart(MultipartReader<ResponseBody>),
}

/// Objects from one GetObject response. Single pass, not restartable.
pub struct ObjectStream {
    source: ObjectSource,
    /// Body reader once it is no longer owned by the multipart splitter.
    body: Option<ResponseBody>,
}

impl ObjectStream {
    /// Build the stream from a 200 response. Single-part bodies are read here; multipart
    /// bodies are read part by part from `next()`.
    pub(crate) async fn from_response(
        head: &ResponseHead,
        mut body: ResponseBody,
    ) -> Result<Self, RetsError> {
        let content_type = head.content_type();
        if let Some(ct) = content_type.as_ref().filter(|ct| ct.is_multipart()) {
            let boundary = ct
                .boundary()
                .map(|b| b.trim_matches('"').to_string())
                .filter(|b| !b.is_empty())
                .ok_or_else(|| RetsError::malformed("multipart response without boundary"))?;
            tracing::debug!(boundary = %boundary, "multipart object response");
            return Ok(Self {
                source: ObjectSource::Multipart(MultipartReader::new(body, &boundary)),
                body: None,
            });
        }

        let content = body.read_to_end().await?;
        if body.is_truncated() {
            return Err(truncated("object body ended early"));
        }
        let mut headers = BTreeMap::new();
        for name in OBJECT_HEADERS {
            if let Some(value) = head.header(name).map(str::trim).filter(|v| !v.is_empty()) {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        let object = RetsObject { headers, content };
        let object = if object.may_be_envelope() {
            check_envelope(object)?
        } else {
            Some(object)
        };
        Ok(Self {
            source: ObjectSource::Single(object),
            body: Some(body),
        })
    }

    /// Next object; `None` when there are no more.
    pub async fn next(&mut self) -> Result<Option<RetsObject>, RetsError> {
        match &mut self.source {
            ObjectSource::Single(object) => Ok(object.take()),
            ObjectSource::Multipart(reader) => loop {
                let Some(part) = reader.next_part().await? else {
                    reader.get_mut().close();
                    return Ok(None);
                };
                if part.may_be_envelope() {
                    match check_envelope(part)? {
                        Some(part) => return Ok(Some(part)),
                        None => continue,
                    }
                }
                return Ok(Some(part));
            },
        }
    }

    fn body(&self) -> Option<&ResponseBody> {
        match &self.source {
            ObjectSource::Multipart(reader) => Some(reader.get_ref()),
            ObjectSource::Single(_) => self.body.as_ref(),
        }
    }

    /// True if the response body ended before its framing said it should.
    pub fn is_truncated(&self) -> bool {
        self.body().is_some_and(ResponseBody::is_truncated)
    }

    /// Bytes of the response body consumed so far.
    pub fn request_size(&self) -> u64 {
        self.body().map(ResponseBody::size).unwrap_or(0)
    }

    /// SHA-1 of the response body consumed so far.
    pub fn request_hash(&self) -> String {
        self.body().map(ResponseBody::hash).unwrap_or_default()
    }

    pub fn close(&mut self) {
        match &mut self.source {
            ObjectSource::Multipart(reader) => reader.get_mut().close(),
            ObjectSource::Single(_) => {
                if let Some(body) = self.body.as_mut() {
                    body.close();
                }
            }
        }
    }
}

/// An XML object may be a RETS envelope instead of content: 20403 means no object,
/// other non-zero codes are errors.
fn check_envelope(object: RetsObject) -> Result<Option<RetsObject>, RetsError> {
    match sniff_envelope(&object.content)? {
        Some(env) if env.code == REPLY_NO_OBJECT => {
            tracing::debug!(text = %env.text, "no object found");
            Ok(None)
        }
        Some(env) if env.code != REPLY_SUCCESS => Err(env.into_error()),
        _ => Ok(Some(object)),
    }
}
