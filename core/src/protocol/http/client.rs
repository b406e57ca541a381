/*
 * client.rs
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

//! HTTP client: connect to a host, then send one request over the returned connection.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;

use crate::net::http_connector;
use crate::protocol::http::connection::{HttpConnection, HttpStream};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client. `HttpClient::connect(host, port, use_tls, ..)` returns a connection ready
/// for a single request.
pub struct HttpClient;

impl HttpClient {
    /// Connect to the given host and port. If `use_tls` is true, performs the TLS handshake
    /// with ALPN http/1.1. IPv6 literals may be given with or without brackets.
    pub async fn connect(
        host: &str,
        port: u16,
        use_tls: bool,
        connect_timeout: Duration,
    ) -> io::Result<HttpConnection> {
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        let tcp = timeout(connect_timeout, TcpStream::connect((bare_host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TCP connect timed out"))??;
        tcp.set_nodelay(true)?;
        tracing::debug!(host = bare_host, port, tls = use_tls, "connected");

        if use_tls {
            let server_name = ServerName::try_from(bare_host.to_string())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
            let tls = timeout(connect_timeout, http_connector().connect(server_name, tcp))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"))?
                .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
            Ok(HttpConnection::new(
                HttpStream::Tls(Box::new(tls)),
                host.to_string(),
                port,
                true,
            ))
        } else {
            Ok(HttpConnection::new(
                HttpStream::Plain(tcp),
                host.to_string(),
                port,
                false,
            ))
        }
    }
}
