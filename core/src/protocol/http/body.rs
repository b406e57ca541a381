/*
 * body.rs
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

//! Streaming response body: pulls raw bytes from the socket, strips HTTP framing
//! (fixed length, chunked, or read-until-close) and hands out the decoded payload.
//!
//! Nothing beyond one socket read is buffered. A running SHA-1 and byte count cover exactly
//! the bytes returned to the caller. When the response declares a non-UTF-8 charset the
//! payload is transcoded to UTF-8 before it is counted, so the hash does not depend on the
//! server's charset.

use std::future::{poll_fn, Future};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use encoding_rs::{Decoder, Encoding, UTF_8};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::ResponseHead;

const READ_SIZE: usize = 8192;

/// How the body is delimited and which charset it declares. This is all the reader needs to
/// know about the HTTP response it belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyFraming {
    pub content_length: Option<u64>,
    pub chunked: bool,
    /// Source encoding to normalize to UTF-8; None means pass bytes through.
    pub encoding: Option<&'static Encoding>,
}

impl BodyFraming {
    pub fn fixed(content_length: u64) -> Self {
        Self {
            content_length: Some(content_length),
            ..Self::default()
        }
    }

    pub fn chunked() -> Self {
        Self {
            chunked: true,
            ..Self::default()
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Framing declared by a response head. Chunked wins over Content-Length; a status
    /// without a body is an empty fixed-length body.
    pub fn from_head(head: &ResponseHead) -> Self {
        if !head.has_body() {
            Self::fixed(0)
        } else if head.is_chunked() {
            Self::chunked()
        } else {
            match head.content_length() {
                Some(len) => Self::fixed(len),
                None => Self::unbounded(),
            }
        }
    }

    /// Set the source charset from a Content-Type label. UTF-8 and unknown labels leave
    /// the payload untouched.
    pub fn with_charset(mut self, label: Option<&str>) -> Self {
        self.encoding = match label.map(str::trim) {
            None | Some("") => None,
            Some(label) => match Encoding::for_label(label.as_bytes()) {
                Some(enc) if enc == UTF_8 => None,
                Some(enc) => Some(enc),
                None => {
                    tracing::warn!(charset = label, "unknown charset, passing body through");
                    None
                }
            },
        };
        self
    }
}

/// Collects decoded body bytes from the push parser, transcoding when asked.
struct BodySink<'a> {
    out: &'a mut BytesMut,
    transcoder: Option<&'a mut Decoder>,
}

impl H1ResponseHandler for BodySink<'_> {
    fn body_chunk(&mut self, data: &[u8]) {
        match self.transcoder.as_deref_mut() {
            Some(decoder) => transcode(decoder, data, false, self.out),
            None => self.out.extend_from_slice(data),
        }
    }
}

fn transcode(decoder: &mut Decoder, data: &[u8], last: bool, out: &mut BytesMut) {
    let capacity = decoder
        .max_utf8_buffer_length(data.len())
        .unwrap_or(data.len() * 3 + 16);
    let mut s = String::with_capacity(capacity);
    let _ = decoder.decode_to_string(data, &mut s, last);
    out.extend_from_slice(s.as_bytes());
}

/// Pull-based body decoder over a raw byte stream.
///
/// `read(n)` returns up to `n` decoded bytes or `None` at end of body. Once the body ends,
/// is truncated, or the socket fails, the stream is closed (once) and every later call
/// returns `None`. Read timeouts are the only socket condition surfaced as an error.
pub struct ChunkedStreamReader<S> {
    stream: Option<S>,
    /// Raw bytes read from the socket but not yet parsed.
    raw: BytesMut,
    parser: ResponseParser,
    /// Decoded bytes not yet handed out.
    pending: BytesMut,
    transcoder: Option<Decoder>,
    size: u64,
    hasher: Sha1,
    finished: bool,
    truncated: bool,
    read_timeout: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl<S: AsyncRead + Unpin> ChunkedStreamReader<S> {
    /// `buffered` holds bytes already read past the response head.
    pub fn new(stream: S, buffered: BytesMut, framing: BodyFraming) -> Self {
        Self {
            stream: Some(stream),
            raw: buffered,
            parser: ResponseParser::body_only(framing.content_length, framing.chunked),
            pending: BytesMut::new(),
            transcoder: framing.encoding.map(|e| e.new_decoder_without_bom_handling()),
            size: 0,
            hasher: Sha1::new(),
            finished: false,
            truncated: false,
            read_timeout: None,
            deadline: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bytes handed out so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercase hex SHA-1 of the bytes handed out so far.
    pub fn hash(&self) -> String {
        crate::to_hex(&self.hasher.clone().finalize())
    }

    /// True if the body ended before its framing said it should.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Drop the underlying connection. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!(size = self.size, truncated = self.truncated, "body stream closed");
        }
    }

    /// Read up to `n` decoded bytes; `None` at end of body.
    pub async fn read(&mut self, n: usize) -> io::Result<Option<Bytes>> {
        poll_fn(|cx| self.poll_read_decoded(cx, n)).await
    }

    /// Read the remainder of the body into memory.
    pub async fn read_to_end(&mut self) -> io::Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.read(READ_SIZE).await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    pub fn poll_read_decoded(
        &mut self,
        cx: &mut Context<'_>,
        max: usize,
    ) -> Poll<io::Result<Option<Bytes>>> {
        let max = max.max(1);
        loop {
            if !self.pending.is_empty() {
                let n = max.min(self.pending.len());
                let out = self.pending.split_to(n).freeze();
                self.hasher.update(&out);
                self.size += n as u64;
                return Poll::Ready(Ok(Some(out)));
            }
            if self.finished {
                self.close();
                return Poll::Ready(Ok(None));
            }
            if self.parser.state() == ParseState::Idle {
                self.finish();
                continue;
            }
            if !self.raw.is_empty() {
                let before = (self.raw.len(), self.parser.state());
                let mut sink = BodySink {
                    out: &mut self.pending,
                    transcoder: self.transcoder.as_mut(),
                };
                if let Err(e) = self.parser.receive(&mut self.raw, &mut sink) {
                    self.truncated = true;
                    self.finished = true;
                    self.close();
                    return Poll::Ready(Err(e));
                }
                if self.parser.state() == ParseState::Idle {
                    self.finish();
                    continue;
                }
                if self.raw.len() != before.0
                    || self.parser.state() != before.1
                    || !self.pending.is_empty()
                {
                    continue;
                }
            }
            match ready!(self.poll_fill(cx)) {
                Ok(0) => {
                    if !self.parser.reads_until_close() {
                        self.truncated = true;
                        tracing::warn!(size = self.size, "response body truncated");
                    }
                    self.finish();
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    self.finished = true;
                    self.close();
                    return Poll::Ready(Err(e));
                }
                Err(e) => {
                    tracing::warn!(error = %e, size = self.size, "socket error while reading body");
                    self.truncated = true;
                    self.finish();
                }
            }
        }
    }

    /// Flush the transcoder and mark the body complete.
    fn finish(&mut self) {
        if let Some(mut decoder) = self.transcoder.take() {
            transcode(&mut decoder, &[], true, &mut self.pending);
        }
        self.finished = true;
        self.close();
    }

    /// One socket read into `raw`. Ok(0) means EOF.
    fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Poll::Ready(Ok(0)),
        };
        let mut tmp = [0u8; READ_SIZE];
        let mut rb = ReadBuf::new(&mut tmp);
        match Pin::new(stream).poll_read(cx, &mut rb) {
            Poll::Ready(Ok(())) => {
                self.deadline = None;
                let filled = rb.filled();
                self.raw.extend_from_slice(filled);
                Poll::Ready(Ok(filled.len()))
            }
            Poll::Ready(Err(e)) => {
                self.deadline = None;
                Poll::Ready(Err(e))
            }
            Poll::Pending => {
                if let Some(timeout) = self.read_timeout {
                    let deadline = self
                        .deadline
                        .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                    if deadline.as_mut().poll(cx).is_ready() {
                        self.deadline = None;
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "read timed out",
                        )));
                    }
                }
                Poll::Pending
            }
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ChunkedStreamReader<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        match ready!(this.poll_read_decoded(cx, buf.remaining())) {
            Ok(Some(bytes)) => {
                buf.put_slice(&bytes);
                Poll::Ready(Ok(()))
            }
            Ok(None) => Poll::Ready(Ok(())),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipisicing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim id est laborum.";

    const LOREM_CHUNKED: &str = "1a\r\nLorem ipsum dolor sit amet\r\n62\r\n, consectetur adipisicing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\r\nb2\r\n Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in reprehenderit in voluptate velit esse cillum\r\n5\r\n dolo\r\n6\r\nre eu \r\na\r\nfugiat nul\r\n24\r\nla pariatur. Excepteur sint occaecat\r\n7\r\n cupida\r\n50\r\ntat non proident, sunt in culpa qui officia deserunt mollit anim id est laborum.\r\n0\r\n\r\n";

    fn sha1_hex(data: &[u8]) -> String {
        crate::to_hex(&Sha1::digest(data))
    }

    async fn read_with_pattern<S: AsyncRead + Unpin>(
        reader: &mut ChunkedStreamReader<S>,
        pattern: &[usize],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while let Some(chunk) = reader.read(pattern[i % pattern.len()]).await.unwrap() {
            assert!(chunk.len() <= pattern[i % pattern.len()]);
            out.extend_from_slice(&chunk);
            i += 1;
        }
        out
    }

    #[tokio::test]
    async fn fixed_length_in_four_byte_groups() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let mut reader = ChunkedStreamReader::new(
            text.as_bytes(),
            BytesMut::new(),
            BodyFraming::fixed(text.len() as u64),
        );
        for i in 0..11 {
            let chunk = reader.read(4).await.unwrap().unwrap();
            assert_eq!(&chunk[..], &text.as_bytes()[i * 4..i * 4 + 4]);
        }
        assert!(reader.read(4).await.unwrap().is_none());
        assert_eq!(reader.size(), 44);
        assert_eq!(reader.hash(), sha1_hex(text.as_bytes()));
    }

    #[tokio::test]
    async fn chunked_reconstructs_payload_for_any_read_pattern() {
        let patterns: [&[usize]; 5] = [&[6, 4, 20, 21, 2, 80, 2], &[1], &[7, 3], &[4000], &[26]];
        for pattern in patterns {
            let mut reader = ChunkedStreamReader::new(
                LOREM_CHUNKED.as_bytes(),
                BytesMut::new(),
                BodyFraming::chunked(),
            );
            let out = read_with_pattern(&mut reader, pattern).await;
            assert_eq!(out, LOREM.as_bytes(), "pattern {:?}", pattern);
            assert_eq!(reader.size(), LOREM.len() as u64);
            assert_eq!(reader.hash(), sha1_hex(LOREM.as_bytes()));
            assert!(!reader.is_truncated());
        }
    }

    #[tokio::test]
    async fn bytes_buffered_past_head_are_used_first() {
        let (head, rest) = LOREM_CHUNKED.as_bytes().split_at(40);
        let mut reader =
            ChunkedStreamReader::new(rest, BytesMut::from(head), BodyFraming::chunked());
        let out = reader.read_to_end().await.unwrap();
        assert_eq!(&out[..], LOREM.as_bytes());
    }

    #[tokio::test]
    async fn works_as_async_read() {
        let mut reader = ChunkedStreamReader::new(
            LOREM_CHUNKED.as_bytes(),
            BytesMut::new(),
            BodyFraming::chunked(),
        );
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, LOREM);
        assert_eq!(reader.hash(), sha1_hex(LOREM.as_bytes()));
    }

    #[tokio::test]
    async fn truncated_stream_returns_partial_then_eof() {
        let mut reader = ChunkedStreamReader::new(
            &b"a\r\nabc"[..],
            BytesMut::new(),
            BodyFraming::chunked(),
        );
        assert_eq!(&reader.read(100).await.unwrap().unwrap()[..], b"abc");
        assert!(reader.read(100).await.unwrap().is_none());
        assert!(reader.read(100).await.unwrap().is_none());
        assert!(reader.is_truncated());
        assert_eq!(reader.size(), 3);
        reader.close();
    }

    #[tokio::test]
    async fn short_fixed_length_is_truncated() {
        let mut reader =
            ChunkedStreamReader::new(&b"abc"[..], BytesMut::new(), BodyFraming::fixed(10));
        let out = reader.read_to_end().await.unwrap();
        assert_eq!(&out[..], b"abc");
        assert!(reader.is_truncated());
    }

    #[tokio::test]
    async fn unbounded_body_ends_at_eof() {
        let mut reader = ChunkedStreamReader::new(
            &b"<RETS ReplyCode=\"0\"/>"[..],
            BytesMut::new(),
            BodyFraming::unbounded(),
        );
        let out = reader.read_to_end().await.unwrap();
        assert_eq!(&out[..], b"<RETS ReplyCode=\"0\"/>");
        assert!(!reader.is_truncated());
    }

    #[tokio::test]
    async fn declared_charset_is_normalized_before_hashing() {
        let latin1 = b"caf\xe9 cr\xe8me";
        let framing = BodyFraming::fixed(latin1.len() as u64).with_charset(Some("ISO-8859-1"));
        let mut reader = ChunkedStreamReader::new(&latin1[..], BytesMut::new(), framing);
        let out = reader.read_to_end().await.unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), "café crème");
        assert_eq!(reader.size(), "café crème".len() as u64);
        assert_eq!(reader.hash(), sha1_hex("café crème".as_bytes()));
    }

    #[tokio::test]
    async fn multibyte_sequence_split_across_chunks() {
        // Shift_JIS "日本" split in the middle of the first character.
        let body = b"1\r\n\x93\r\n3\r\n\xfa\x96\x7b\r\n0\r\n\r\n";
        let framing = BodyFraming::chunked().with_charset(Some("shift_jis"));
        let mut reader = ChunkedStreamReader::new(&body[..], BytesMut::new(), framing);
        let out = reader.read_to_end().await.unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), "日本");
    }

    #[test]
    fn utf8_and_unknown_labels_pass_through() {
        assert!(BodyFraming::chunked().with_charset(Some("utf-8")).encoding.is_none());
        assert!(BodyFraming::chunked().with_charset(Some("UTF8")).encoding.is_none());
        assert!(BodyFraming::chunked().with_charset(Some("x-bogus")).encoding.is_none());
        assert!(BodyFraming::chunked().with_charset(Some("windows-1252")).encoding.is_some());
    }
}
