/*
 * transport.rs
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

//! One logical RETS request: headers from the auth and session state, one HTTP exchange per
//! attempt, and the retries that stay invisible to the caller.
//!
//! A logical request makes at most three exchanges: the first attempt, one HTTP-auth
//! handshake (401 or stale digest) and one User-Agent handshake (embedded 20037). A second
//! event of either kind is `Unauthorized`.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;
use url::Url;

use crate::error::RetsError;
use crate::protocol::http::{
    BodyFraming, ChunkedStreamReader, HttpClient, HttpStream, Method, RequestBuilder, ResponseHead,
};
use crate::protocol::rets::auth::{AuthNegotiator, AuthScheme};
use crate::protocol::rets::reply::{sniff_envelope, REPLY_SUCCESS, REPLY_UA_AUTH_REQUIRED};
use crate::protocol::rets::session::{CookieJar, SessionTimer};
use crate::uri::{build_query, request_uri};

/// Decoded body of a RETS response, straight off the socket.
pub type ResponseBody = ChunkedStreamReader<HttpStream>;

/// Most of an error response's body read when looking for a RETS envelope.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Read at most `limit` bytes of the body.
async fn read_prefix<S>(body: &mut ChunkedStreamReader<S>, limit: usize) -> Result<Bytes, RetsError>
where
    S: AsyncRead + Unpin,
{
    let mut out = BytesMut::new();
    while out.len() < limit {
        match body.read(limit - out.len()).await? {
            Some(chunk) => out.extend_from_slice(&chunk),
            None => break,
        }
    }
    Ok(out.freeze())
}

/// A GET against one capability URL.
#[derive(Debug, Clone)]
pub struct RetsRequest {
    pub url: Url,
    pub query: String,
    pub accept: Option<String>,
    pub read_timeout: Option<Duration>,
    /// Read the body before returning and check it for an embedded 20037.
    pub buffered: bool,
}

impl RetsRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            query: String::new(),
            accept: None,
            read_timeout: None,
            buffered: false,
        }
    }

    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Option<String>)>,
    {
        let params: Vec<(&'static str, Option<String>)> = params.into_iter().collect();
        self.query = build_query(params.iter().map(|(k, v)| (*k, v.as_deref())));
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }
}

/// A 200 response: its head, the body reader, and the body itself when the request was
/// buffered.
pub struct RetsResponse {
    pub head: ResponseHead,
    pub body: ResponseBody,
    pub buffered: Option<Bytes>,
}

/// Owns the authentication, cookie and session-timeout state for one session.
pub struct TransportClient {
    auth: AuthNegotiator,
    cookies: CookieJar,
    timer: SessionTimer,
    login_url: Option<Url>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TransportClient {
    pub fn new(auth: AuthNegotiator, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            auth,
            cookies: CookieJar::new(),
            timer: SessionTimer::default(),
            login_url: None,
            connect_timeout,
            read_timeout,
        }
    }

    pub fn auth(&self) -> &AuthNegotiator {
        &self.auth
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn session_id(&self) -> Option<&str> {
        self.cookies.session_id()
    }

    /// Where to log in again when the session times out.
    pub fn set_login_url(&mut self, url: Url) {
        self.login_url = Some(url);
    }

    pub fn arm_session_timer(&mut self, seconds: Option<u64>) {
        self.timer.arm(seconds);
        if let Some(timeout) = self.timer.timeout() {
            tracing::debug!(seconds = timeout.as_secs(), "session timer armed");
        }
    }

    pub fn disarm_session_timer(&mut self) {
        self.timer.disarm();
    }

    /// Send a request, logging in again first if the session has timed out.
    pub async fn request(&mut self, request: &RetsRequest) -> Result<RetsResponse, RetsError> {
        if self.timer.is_expired() {
            if let Some(login_url) = self.login_url.clone() {
                self.relogin(login_url).await?;
            }
        }
        self.exchange(request).await
    }

    async fn relogin(&mut self, login_url: Url) -> Result<(), RetsError> {
        tracing::info!("session timed out, logging in again");
        self.cookies.clear();
        let response = self.exchange(&RetsRequest::new(login_url).buffered()).await?;
        let body = response.buffered.unwrap_or_default();
        match sniff_envelope(&body)? {
            Some(env) if env.code != REPLY_SUCCESS && env.code != REPLY_UA_AUTH_REQUIRED => {
                return Err(env.into_error());
            }
            Some(_) => {}
            None => return Err(RetsError::malformed("login response has no RETS envelope")),
        }
        // Left expired on failure so the next request tries again.
        self.timer.rearm();
        Ok(())
    }

    /// The bounded retry loop around single exchanges.
    async fn exchange(&mut self, request: &RetsRequest) -> Result<RetsResponse, RetsError> {
        let mut http_handshake = false;
        let mut ua_handshake = false;
        loop {
            let (head, mut body) = self.send_once(request).await?;
            self.store_cookies(&head);

            let stale = matches!(self.auth.scheme(), AuthScheme::Digest(_))
                && AuthNegotiator::has_stale_challenge(head.header_values("www-authenticate"));
            if head.code == 401 || stale {
                body.close();
                if http_handshake {
                    return Err(RetsError::Unauthorized(format!(
                        "{} {} after authenticating with {}",
                        head.code,
                        head.reason,
                        self.auth.scheme().name()
                    )));
                }
                http_handshake = true;
                if stale {
                    tracing::debug!("digest nonce stale, retrying");
                } else {
                    tracing::debug!(scheme = self.auth.scheme().name(), "authentication challenge");
                }
                self.auth.note_server_version(head.header("rets-version"));
                self.auth
                    .accept_challenges(head.header_values("www-authenticate"))?;
                continue;
            }

            if head.code != 200 {
                let content = read_prefix(&mut body, ERROR_BODY_LIMIT).await?;
                body.close();
                return Err(match sniff_envelope(&content) {
                    Ok(Some(env)) => env.into_error(),
                    _ => RetsError::Transport {
                        status: head.code,
                        reason: head.reason.clone(),
                    },
                });
            }

            if !request.buffered {
                return Ok(RetsResponse {
                    head,
                    body,
                    buffered: None,
                });
            }

            let content = body.read_to_end().await?;
            if body.is_truncated() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "response body ended early",
                )
                .into());
            }
            let needs_ua = matches!(
                sniff_envelope(&content),
                Ok(Some(ref env)) if env.code == REPLY_UA_AUTH_REQUIRED
            );
            if needs_ua && self.auth.has_user_agent_password() {
                if ua_handshake {
                    return Err(RetsError::Unauthorized(
                        "User-Agent authentication rejected".to_string(),
                    ));
                }
                ua_handshake = true;
                self.auth.note_server_version(head.header("rets-version"));
                self.auth.enable_user_agent_auth()?;
                continue;
            }
            return Ok(RetsResponse {
                head,
                body,
                buffered: Some(content),
            });
        }
    }

    fn store_cookies(&mut self, head: &ResponseHead) {
        for value in head.header_values("set-cookie") {
            if self.cookies.store(value) {
                tracing::debug!("session id changed");
            }
        }
    }

    fn build_request(&mut self, uri: &str, request: &RetsRequest) -> RequestBuilder {
        let mut builder = RequestBuilder::new(Method::Get, uri.to_string());
        builder.header("User-Agent", self.auth.user_agent());
        builder.header("RETS-Version", self.auth.rets_version());
        if let Some(value) = self.auth.authorization(Method::Get, uri) {
            builder.header("Authorization", value);
        }
        if let Some(value) = self.auth.ua_authorization(self.cookies.session_id()) {
            builder.header("RETS-UA-Authorization", value);
        }
        if let Some(value) = self.cookies.header() {
            builder.header("Cookie", value);
        }
        if let Some(accept) = &request.accept {
            builder.header("Accept", accept.as_str());
        }
        builder
    }

    /// One HTTP exchange: connect, write, read the head. The body is left on the socket.
    async fn send_once(
        &mut self,
        request: &RetsRequest,
    ) -> Result<(ResponseHead, ResponseBody), RetsError> {
        let url = &request.url;
        let host = url
            .host_str()
            .ok_or_else(|| RetsError::InvalidUrl(format!("{}: no host", url)))?;
        let tls = url.scheme().eq_ignore_ascii_case("https");
        let port = url.port_or_known_default().unwrap_or(if tls { 443 } else { 80 });
        let uri = request_uri(url, &request.query);
        let builder = self.build_request(&uri, request);

        tracing::debug!(
            host,
            path = url.path(),
            auth = self.auth.scheme().name(),
            ua_auth = self.auth.ua_active(),
            "GET"
        );
        let read_timeout = request.read_timeout.unwrap_or(self.read_timeout);
        let mut connection = HttpClient::connect(host, port, tls, self.connect_timeout).await?;
        let head = connection.send(&builder, Some(read_timeout)).await?;

        let charset = head
            .content_type()
            .filter(|ct| ct.is_textual())
            .and_then(|ct| ct.charset().map(str::to_string));
        let framing = BodyFraming::from_head(&head).with_charset(charset.as_deref());
        Ok((head, connection.into_body(framing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_body_read_is_bounded() {
        let body = vec![b'x'; ERROR_BODY_LIMIT * 2];
        let mut reader = ChunkedStreamReader::new(
            &body[..],
            BytesMut::new(),
            BodyFraming::fixed(body.len() as u64),
        );
        let prefix = read_prefix(&mut reader, ERROR_BODY_LIMIT).await.unwrap();
        assert_eq!(prefix.len(), ERROR_BODY_LIMIT);
    }

    #[tokio::test]
    async fn stalled_error_body_times_out() {
        let (_writer, stream) = tokio::io::duplex(64);
        let mut reader = ChunkedStreamReader::new(
            stream,
            BytesMut::from(&b"<RETS ReplyCode=\"20"[..]),
            BodyFraming::fixed(1000),
        )
        .with_read_timeout(Some(Duration::from_millis(50)));
        let err = read_prefix(&mut reader, ERROR_BODY_LIMIT).await.unwrap_err();
        assert!(matches!(err, RetsError::Timeout), "{err:?}");
    }
}
