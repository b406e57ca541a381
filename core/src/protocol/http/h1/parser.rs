/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked, or
//! read-until-close).
//!
//! The connection drives the status/header states; once the head is complete the parser is
//! handed to the body reader, which drives the body states.

use bytes::Buf;
use bytes::BytesMut;
use std::io;

/// Callback for HTTP/1.1 response events. Body events default to no-ops so a head-only
/// collector need not implement them.
pub trait H1ResponseHandler {
    fn status(&mut self, _code: u16, _reason: Option<&str>) {}
    fn header(&mut self, _name: &str, _value: &str) {}
    fn body_chunk(&mut self, _data: &[u8]) {}
    fn end_body(&mut self) {}
    fn trailer(&mut self, _name: &str, _value: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    StatusLine,
    Headers,
    /// Headers done; caller must call set_body_mode().
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    ChunkTrailer,
}

/// Push parser for HTTP/1.1 response. Feed bytes via `receive`; handler is invoked as complete tokens are parsed.
#[derive(Debug)]
pub struct ResponseParser {
    state: ParseState,
    /// Content-Length when known (-1 for chunked or read-until-close).
    content_length: i64,
    bytes_received: i64,
    /// Bytes left in the current chunk.
    chunk_remaining: i64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            content_length: -1,
            bytes_received: 0,
            chunk_remaining: 0,
        }
    }

    /// Parser positioned at the start of a body with the given framing.
    pub fn body_only(content_length: Option<u64>, chunked: bool) -> Self {
        let mut parser = Self::new();
        parser.state = ParseState::HeadersComplete;
        parser.set_body_mode(content_length, chunked);
        parser
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// True when the body has neither a length nor chunked framing; only EOF ends it.
    pub fn reads_until_close(&self) -> bool {
        self.state == ParseState::Body && self.content_length < 0
    }

    pub fn reset(&mut self) {
        self.state = ParseState::StatusLine;
        self.content_length = -1;
        self.bytes_received = 0;
        self.chunk_remaining = 0;
    }

    /// Find CRLF in the readable part of buf; return number of bytes to the start of CRLF, or None if not found.
    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    /// Consume and parse as much as possible from buf. Handler is called for each complete token.
    /// Partial data remains in buf.
    pub fn receive<H: H1ResponseHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), io::Error> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    let line = buf.split_to(line_end + 2);
                    let line_str = std::str::from_utf8(&line[..line_end]).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "invalid status line UTF-8")
                    })?;
                    // HTTP/1.1 200 OK or HTTP/1.1 200
                    let parts: Vec<&str> = line_str.splitn(3, ' ').collect();
                    if !parts[0].starts_with("HTTP/") {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("not an HTTP status line: {}", line_str),
                        ));
                    }
                    let code = parts
                        .get(1)
                        .and_then(|s| s.parse::<u16>().ok())
                        .unwrap_or(0);
                    let reason = parts.get(2).copied();
                    handler.status(code, reason);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    if line_end == 0 {
                        buf.advance(2);
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    let line = buf.split_to(line_end + 2);
                    let line_str = String::from_utf8_lossy(&line[..line_end]);
                    if let Some(colon) = line_str.find(':') {
                        let name = line_str[..colon].trim();
                        let value = line_str[colon + 1..].trim();
                        handler.header(name, value);
                    }
                }
                ParseState::Body => {
                    if self.content_length >= 0 {
                        let remaining = (self.content_length - self.bytes_received) as usize;
                        let to_read = remaining.min(buf.len());
                        if to_read > 0 {
                            let chunk = buf.split_to(to_read);
                            handler.body_chunk(&chunk);
                            self.bytes_received += to_read as i64;
                        }
                        if self.bytes_received >= self.content_length {
                            handler.end_body();
                            self.state = ParseState::Idle;
                        }
                    } else {
                        // Read until close: deliver all available
                        let chunk = buf.split_to(buf.len());
                        handler.body_chunk(&chunk);
                        return Ok(());
                    }
                }
                ParseState::ChunkSize => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    let line = buf.split_to(line_end + 2);
                    let line_str = String::from_utf8_lossy(&line[..line_end]);
                    let hex_part = line_str.split(';').next().unwrap_or("").trim();
                    // Hex digits only; from_str_radix would accept a sign.
                    self.chunk_remaining = Some(hex_part)
                        .filter(|h| !h.is_empty() && h.bytes().all(|b| b.is_ascii_hexdigit()))
                        .and_then(|h| i64::from_str_radix(h, 16).ok())
                        .ok_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::InvalidData,
                                format!("wrong chunk size line: {}", line_str),
                            )
                        })?;
                    if self.chunk_remaining == 0 {
                        self.state = ParseState::ChunkTrailer;
                    } else {
                        self.state = ParseState::ChunkData;
                    }
                }
                ParseState::ChunkData => {
                    let to_read = (self.chunk_remaining as usize).min(buf.len());
                    if to_read > 0 {
                        let chunk = buf.split_to(to_read);
                        handler.body_chunk(&chunk);
                        self.chunk_remaining -= to_read as i64;
                    }
                    if self.chunk_remaining == 0 {
                        // Need to consume trailing CRLF
                        if buf.len() >= 2 {
                            buf.advance(2);
                            self.state = ParseState::ChunkSize;
                        } else {
                            return Ok(());
                        }
                    } else {
                        return Ok(());
                    }
                }
                ParseState::HeadersComplete => {
                    // Waiting for set_body_mode()
                    return Ok(());
                }
                ParseState::ChunkTrailer => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                    if line_end == 0 {
                        buf.advance(2);
                        handler.end_body();
                        self.state = ParseState::Idle;
                    } else {
                        let line = buf.split_to(line_end + 2);
                        let line_str = String::from_utf8_lossy(&line[..line_end]);
                        if let Some(colon) = line_str.find(':') {
                            let name = line_str[..colon].trim();
                            let value = line_str[colon + 1..].trim();
                            handler.trailer(name, value);
                        }
                    }
                }
                ParseState::Idle => return Ok(()),
            }
        }
        Ok(())
    }

    /// Called after headers are received (state HeadersComplete).
    pub fn set_body_mode(&mut self, content_length: Option<u64>, chunked: bool) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        if chunked {
            self.content_length = -1;
            self.state = ParseState::ChunkSize;
        } else if let Some(cl) = content_length {
            self.content_length = cl as i64;
            self.bytes_received = 0;
            if cl == 0 {
                self.state = ParseState::Idle;
            } else {
                self.state = ParseState::Body;
            }
        } else {
            self.content_length = -1;
            self.state = ParseState::Body; // read until close
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
