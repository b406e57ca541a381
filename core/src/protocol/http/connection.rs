/*
 * connection.rs
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

//! HTTP connection: one TCP or TLS stream carrying exactly one request.
//!
//! `send()` writes the request and reads the response head; the body stays on the socket
//! until the caller turns the connection into a `ChunkedStreamReader`.

use bytes::BytesMut;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream as TokioTlsStream;

use crate::protocol::http::body::{BodyFraming, ChunkedStreamReader};
use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::request::RequestBuilder;
use crate::protocol::http::response::ResponseHead;

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Collects the status line and header fields from the parser.
struct HeadCollector<'a> {
    head: &'a mut ResponseHead,
}

impl H1ResponseHandler for HeadCollector<'_> {
    fn status(&mut self, code: u16, reason: Option<&str>) {
        self.head.code = code;
        self.head.reason = reason.unwrap_or_default().to_string();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.head.headers.push((name.to_string(), value.to_string()));
    }
}

/// HTTP connection: holds the stream and the bytes read past the response head.
pub struct HttpConnection {
    stream: HttpStream,
    host: String,
    port: u16,
    secure: bool,
    read_buf: BytesMut,
    parser: ResponseParser,
    read_timeout: Option<Duration>,
}

impl HttpConnection {
    /// Create from an already-connected stream. Used by HttpClient::connect().
    pub fn new(stream: HttpStream, host: String, port: u16, secure: bool) -> Self {
        Self {
            stream,
            host,
            port,
            secure,
            read_buf: BytesMut::with_capacity(8192),
            parser: ResponseParser::new(),
            read_timeout: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Write the request and read the response head. `read_timeout` bounds every socket
    /// wait, here and later in the body.
    pub async fn send(
        &mut self,
        request: &RequestBuilder,
        read_timeout: Option<Duration>,
    ) -> io::Result<ResponseHead> {
        self.read_timeout = read_timeout;
        self.parser.reset();
        self.read_buf.clear();

        self.write_request(request).await?;

        let mut head = ResponseHead::default();
        loop {
            let mut tmp = [0u8; 8192];
            let n = match read_timeout {
                Some(limit) => timeout(limit, self.stream.read(&mut tmp))
                    .await
                    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))??,
                None => self.stream.read(&mut tmp).await?,
            };
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before response head",
                ));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
            self.parser.receive(
                &mut self.read_buf,
                &mut HeadCollector { head: &mut head },
            )?;
            if self.parser.state() == ParseState::HeadersComplete {
                tracing::debug!(
                    status = head.code,
                    reason = %head.reason,
                    host = %self.host,
                    "response head received"
                );
                return Ok(head);
            }
        }
    }

    /// Hand the socket over to a body reader. Bytes already buffered past the head are
    /// read first.
    pub fn into_body(self, framing: BodyFraming) -> ChunkedStreamReader<HttpStream> {
        ChunkedStreamReader::new(self.stream, self.read_buf, framing)
            .with_read_timeout(self.read_timeout)
    }

    async fn write_request(&mut self, request: &RequestBuilder) -> io::Result<()> {
        let host_header = if (self.secure && self.port != 443) || (!self.secure && self.port != 80) {
            format!("{}:{}", self.host, self.port)
        } else {
            self.host.clone()
        };
        let mut req = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\n",
            request.method.as_str(),
            request.path,
            host_header
        );
        for (k, v) in &request.headers {
            req.push_str(k);
            req.push_str(": ");
            req.push_str(v);
            req.push_str("\r\n");
        }
        req.push_str("Connection: close\r\n\r\n");
        tracing::trace!(method = request.method.as_str(), path = %request.path, "writing request");
        self.stream.write_all(req.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
