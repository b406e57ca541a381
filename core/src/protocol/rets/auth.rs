/*
 * auth.rs
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

//! HTTP authentication for RETS: Basic, Digest (RFC 2617 subset) and the RETS
//! User-Agent digest carried in `RETS-UA-Authorization`.
//!
//! The negotiator only computes header values and records what the server asked for; the
//! transport decides when to retry.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::{Digest, Md5};

use crate::error::RetsError;
use crate::protocol::http::Method;

/// Sent in `RETS-Version` when neither forced nor learned from the server.
pub const DEFAULT_RETS_VERSION: &str = "RETS/1.7";

/// How HTTP authentication is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Send nothing until challenged, then answer the best offered scheme.
    #[default]
    Auto,
    /// Send Basic from the first request.
    Basic,
    /// Only answer Digest challenges.
    Digest,
}

/// User-Agent name and password registered with the RETS server.
#[derive(Clone)]
pub struct UserAgentCredentials {
    pub name: String,
    pub password: Option<String>,
}

impl fmt::Debug for UserAgentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAgentCredentials")
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Login credentials plus the authentication hints that go with them.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub user_agent: Option<UserAgentCredentials>,
    /// Send `RETS-UA-Authorization` from the first request rather than waiting to be asked.
    pub ua_auth: bool,
    /// Value for the `RETS-Version` header, e.g. `RETS/1.8`.
    pub rets_version: Option<String>,
    pub auth_mode: AuthMode,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            user_agent: None,
            ua_auth: false,
            rets_version: None,
            auth_mode: AuthMode::Auto,
        }
    }

    pub fn with_user_agent(mut self, name: impl Into<String>, password: Option<String>) -> Self {
        self.user_agent = Some(UserAgentCredentials {
            name: name.into(),
            password,
        });
        self
    }

    pub fn with_ua_auth(mut self, ua_auth: bool) -> Self {
        self.ua_auth = ua_auth;
        self
    }

    pub fn with_rets_version(mut self, version: impl Into<String>) -> Self {
        self.rets_version = Some(version.into());
        self
    }

    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    fn ua_password(&self) -> Option<(&str, &str)> {
        let ua = self.user_agent.as_ref()?;
        Some((ua.name.as_str(), ua.password.as_deref()?))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("ua_auth", &self.ua_auth)
            .field("rets_version", &self.rets_version)
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

pub(crate) fn md5_hex(input: &str) -> String {
    crate::to_hex(&Md5::digest(input.as_bytes()))
}

/// Split an auth-param list (`key=value, key="quoted, value"`). Keys are lower-cased.
pub fn parse_auth_params(s: &str) -> Vec<(String, String)> {
    let b = s.as_bytes();
    let len = b.len();
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        while i < len && (b[i] == b',' || b[i].is_ascii_whitespace()) {
            i += 1;
        }
        if i >= len {
            break;
        }
        let start = i;
        while i < len && b[i] != b'=' && b[i] != b',' {
            i += 1;
        }
        let key = s[start..i].trim().to_ascii_lowercase();
        if i >= len || b[i] == b',' {
            if !key.is_empty() {
                out.push((key, String::new()));
            }
            continue;
        }
        i += 1;
        while i < len && b[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = if i < len && b[i] == b'"' {
            i += 1;
            let mut v = Vec::new();
            while i < len {
                match b[i] {
                    b'\\' if i + 1 < len => {
                        v.push(b[i + 1]);
                        i += 2;
                    }
                    b'"' => {
                        i += 1;
                        break;
                    }
                    c => {
                        v.push(c);
                        i += 1;
                    }
                }
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let start = i;
            while i < len && b[i] != b',' {
                i += 1;
            }
            s[start..i].trim().to_string()
        };
        if !key.is_empty() {
            out.push((key, value));
        }
    }
    out
}

/// Parameters of a `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Raw qop list as sent, e.g. `auth` or `auth,auth-int`.
    pub qop: Option<String>,
    pub algorithm: Option<String>,
    pub stale: bool,
}

impl DigestChallenge {
    /// Parse the parameter part of a Digest challenge (everything after `Digest `).
    pub fn parse(params: &str) -> Self {
        let mut challenge = DigestChallenge::default();
        for (key, value) in parse_auth_params(params) {
            match key.as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = Some(value),
                "qop" => challenge.qop = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                "stale" => challenge.stale = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        challenge
    }

    fn qop_tokens(&self) -> impl Iterator<Item = &str> {
        self.qop
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// True when the server asked for `qop=auth`; false for the legacy form without qop.
    pub fn uses_qop_auth(&self) -> bool {
        self.qop_tokens().any(|t| t.eq_ignore_ascii_case("auth"))
    }

    /// A qop list that does not offer `auth` cannot be answered.
    pub fn is_answerable(&self) -> bool {
        self.qop.is_none() || self.uses_qop_auth()
    }

    fn is_sess(&self) -> bool {
        self.algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("MD5-sess"))
    }

    /// The `response` field: a pure function of the challenge, credentials, request and
    /// nonce count.
    pub fn response(
        &self,
        username: &str,
        password: &str,
        method: Method,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let mut ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        if self.is_sess() {
            ha1 = md5_hex(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = md5_hex(&format!("{}:{}", method.as_str(), uri));
        if self.uses_qop_auth() {
            md5_hex(&format!(
                "{}:{}:{:08X}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        }
    }

    /// Full `Authorization` header value.
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: Method,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let response = self.response(username, password, method, uri, nc, cnonce);
        let mut out = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            username,
            self.realm,
            self.nonce,
            uri,
            self.algorithm.as_deref().unwrap_or("MD5"),
            response
        );
        if let Some(opaque) = &self.opaque {
            out.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        if self.uses_qop_auth() {
            out.push_str(&format!(", qop=\"auth\", nc={:08X}, cnonce=\"{}\"", nc, cnonce));
        }
        out
    }
}

/// One `WWW-Authenticate` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Digest(DigestChallenge),
    Other(String),
}

/// Parse one `WWW-Authenticate` value. A bare parameter list with no scheme token is read
/// as Digest; some servers send it that way.
pub fn parse_challenge(value: &str) -> Challenge {
    let value = value.trim();
    let (scheme, rest) = match value.find(|c: char| c.is_ascii_whitespace()) {
        Some(i) => (&value[..i], &value[i..]),
        None => (value, ""),
    };
    if scheme.contains('=') {
        return Challenge::Digest(DigestChallenge::parse(value));
    }
    if scheme.eq_ignore_ascii_case("digest") {
        Challenge::Digest(DigestChallenge::parse(rest))
    } else if scheme.eq_ignore_ascii_case("basic") {
        Challenge::Basic
    } else {
        Challenge::Other(scheme.to_string())
    }
}

pub fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", username, password)))
}

/// `RETS-UA-Authorization` value: `Digest MD5(MD5(name:password)::session_id:version)`.
/// The empty field is the request id, which this client never sends.
pub fn user_agent_authorization(
    name: &str,
    password: &str,
    session_id: &str,
    version: &str,
) -> String {
    let a1 = md5_hex(&format!("{}:{}", name, password));
    format!(
        "Digest {}",
        md5_hex(&format!("{}::{}:{}", a1, session_id, version))
    )
}

/// HTTP scheme currently in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    Basic,
    Digest(DigestChallenge),
}

impl AuthScheme {
    pub fn name(&self) -> &'static str {
        match self {
            AuthScheme::None => "none",
            AuthScheme::Basic => "basic",
            AuthScheme::Digest(_) => "digest",
        }
    }
}

/// Credential material and authentication state for one session.
pub struct AuthNegotiator {
    credentials: Credentials,
    user_agent: String,
    scheme: AuthScheme,
    nonce_count: u32,
    ua_active: bool,
    server_version: Option<String>,
}

impl AuthNegotiator {
    /// `default_user_agent` is used when no RETS User-Agent name is configured.
    pub fn new(credentials: Credentials, default_user_agent: &str) -> Self {
        let user_agent = credentials
            .user_agent
            .as_ref()
            .map(|ua| ua.name.clone())
            .unwrap_or_else(|| default_user_agent.to_string());
        let scheme = match credentials.auth_mode {
            AuthMode::Basic => AuthScheme::Basic,
            _ => AuthScheme::None,
        };
        let ua_active = credentials.ua_auth && credentials.ua_password().is_some();
        Self {
            credentials,
            user_agent,
            scheme,
            nonce_count: 0,
            ua_active,
            server_version: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn ua_active(&self) -> bool {
        self.ua_active
    }

    /// Whether a User-Agent handshake could be answered.
    pub fn has_user_agent_password(&self) -> bool {
        self.credentials.ua_password().is_some()
    }

    /// `RETS-Version` header value: forced, else learned, else the default.
    pub fn rets_version(&self) -> &str {
        self.credentials
            .rets_version
            .as_deref()
            .or(self.server_version.as_deref())
            .unwrap_or(DEFAULT_RETS_VERSION)
    }

    /// Remember the version a server advertised during a handshake. Empty values are ignored.
    pub fn note_server_version(&mut self, version: Option<&str>) {
        if let Some(v) = version.map(str::trim).filter(|v| !v.is_empty()) {
            if self.server_version.as_deref() != Some(v) {
                tracing::debug!(version = v, "server RETS version");
                self.server_version = Some(v.to_string());
            }
        }
    }

    /// `Authorization` value for the next request. Each Digest use advances the nonce count.
    pub fn authorization(&mut self, method: Method, uri: &str) -> Option<String> {
        match &self.scheme {
            AuthScheme::None => None,
            AuthScheme::Basic => Some(basic_authorization(
                &self.credentials.username,
                &self.credentials.password,
            )),
            AuthScheme::Digest(challenge) => {
                self.nonce_count = self.nonce_count.wrapping_add(1);
                let cnonce = md5_hex(&format!(
                    "{}:{}:{}:{}",
                    self.user_agent, self.credentials.password, self.nonce_count, challenge.nonce
                ));
                Some(challenge.authorization(
                    &self.credentials.username,
                    &self.credentials.password,
                    method,
                    uri,
                    self.nonce_count,
                    &cnonce,
                ))
            }
        }
    }

    /// `RETS-UA-Authorization` value, once the UA scheme is active.
    pub fn ua_authorization(&self, session_id: Option<&str>) -> Option<String> {
        if !self.ua_active {
            return None;
        }
        let (name, password) = self.credentials.ua_password()?;
        Some(user_agent_authorization(
            name,
            password,
            session_id.unwrap_or(""),
            self.rets_version(),
        ))
    }

    /// Switch the UA scheme on. Fails when there is no UA password to answer with.
    pub fn enable_user_agent_auth(&mut self) -> Result<(), RetsError> {
        if self.credentials.ua_password().is_none() {
            return Err(RetsError::Unauthorized(
                "server requires User-Agent authentication but no User-Agent password is configured"
                    .to_string(),
            ));
        }
        if !self.ua_active {
            tracing::debug!(user_agent = %self.user_agent, "User-Agent authentication enabled");
            self.ua_active = true;
        }
        Ok(())
    }

    /// True if any of the values is a Digest challenge flagged stale.
    pub fn has_stale_challenge<'a, I>(values: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        values
            .into_iter()
            .any(|v| matches!(parse_challenge(v), Challenge::Digest(d) if d.stale))
    }

    /// Adopt the best scheme from a set of `WWW-Authenticate` values. Digest is preferred
    /// over Basic regardless of order. With no usable scheme the UA scheme alone may still
    /// answer, if configured.
    pub fn accept_challenges<'a, I>(&mut self, values: I) -> Result<(), RetsError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut digest = None;
        let mut basic = false;
        let mut offered = Vec::new();
        for value in values {
            match parse_challenge(value) {
                Challenge::Digest(d) => {
                    offered.push("Digest".to_string());
                    if digest.is_none() {
                        digest = Some(d);
                    }
                }
                Challenge::Basic => {
                    offered.push("Basic".to_string());
                    basic = true;
                }
                Challenge::Other(scheme) => offered.push(scheme),
            }
        }
        let ua_available = self.credentials.ua_password().is_some();
        if ua_available {
            self.enable_user_agent_auth()?;
        }

        let mode = self.credentials.auth_mode;
        match digest {
            Some(d) if !d.is_answerable() => {
                return Err(RetsError::UnsupportedAuth(format!(
                    "digest qop {} without auth",
                    d.qop.as_deref().unwrap_or("")
                )));
            }
            Some(d) if !(mode == AuthMode::Basic && basic) => {
                tracing::debug!(realm = %d.realm, stale = d.stale, "using digest authentication");
                self.scheme = AuthScheme::Digest(d);
                self.nonce_count = 0;
                return Ok(());
            }
            _ => {}
        }
        if basic && mode != AuthMode::Digest {
            tracing::debug!("using basic authentication");
            self.scheme = AuthScheme::Basic;
            return Ok(());
        }
        if offered.is_empty() && ua_available {
            return Ok(());
        }
        Err(RetsError::UnsupportedAuth(if offered.is_empty() {
            "no challenge offered".to_string()
        } else {
            offered.join(", ")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: &str = r#"realm="Foo Bar",nonce="7d8ca69b352016f88d7c3d8a040dc9e0",opaque="431d3681382c9550ffc0525839a37aa3",qop="auth""#;

    #[test]
    fn parses_digest_challenge_with_or_without_spaces() {
        let d = DigestChallenge::parse(r#"realm="Foo Bar",nonce="4e3b90a132bd197a1319bdf4fc7371bf",opaque="4805755a42ac82d4837fb50a7d3babeb",qop="auth""#);
        assert_eq!(d.realm, "Foo Bar");
        assert_eq!(d.nonce, "4e3b90a132bd197a1319bdf4fc7371bf");
        assert_eq!(d.opaque.as_deref(), Some("4805755a42ac82d4837fb50a7d3babeb"));
        assert_eq!(d.qop.as_deref(), Some("auth"));
        assert!(!d.stale);

        let spaced = DigestChallenge::parse(r#"realm="Foo Bar", nonce="7d8ca69b352016f88d7c3d8a040dc9e0", Stale=TRUE, algorithm=MD5"#);
        assert_eq!(spaced.nonce, "7d8ca69b352016f88d7c3d8a040dc9e0");
        assert!(spaced.stale);
        assert_eq!(spaced.algorithm.as_deref(), Some("MD5"));
        assert!(spaced.qop.is_none());
    }

    #[test]
    fn quoted_commas_do_not_split() {
        let params = parse_auth_params(r#"realm="a, b", qop="auth,auth-int", nonce=abc"#);
        assert_eq!(
            params,
            vec![
                ("realm".to_string(), "a, b".to_string()),
                ("qop".to_string(), "auth,auth-int".to_string()),
                ("nonce".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn digest_reference_vector() {
        let d = DigestChallenge::parse(CHALLENGE);
        let header = d.authorization(
            "foo",
            "bar",
            Method::Get,
            "/foo/bar?a=b&c=d",
            0,
            "581f450f288591672b0279e2986aaf03",
        );
        assert_eq!(
            header,
            r#"Digest username="foo", realm="Foo Bar", nonce="7d8ca69b352016f88d7c3d8a040dc9e0", uri="/foo/bar?a=b&c=d", algorithm=MD5, response="f899245806b35d375fe99ee440496ac7", opaque="431d3681382c9550ffc0525839a37aa3", qop="auth", nc=00000000, cnonce="581f450f288591672b0279e2986aaf03""#
        );
    }

    #[test]
    fn legacy_digest_without_qop() {
        let d = DigestChallenge::parse(r#"realm="Foo Bar",nonce="7d8ca69b352016f88d7c3d8a040dc9e0",opaque="431d3681382c9550ffc0525839a37aa3""#);
        let header = d.authorization("foo", "bar", Method::Get, "/foo/bar?a=b&c=d", 1, "ignored");
        assert!(header.contains(r#"response="c8f61181984b43eeba6a7eed7ff7470e""#));
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce="));
    }

    #[test]
    fn negotiated_digest_uses_user_agent_cnonce() {
        let creds = Credentials::new("foo", "bar").with_user_agent("FooBar", None);
        let mut auth = AuthNegotiator::new(creds, "rets_core");
        auth.accept_challenges([format!("Digest {}", CHALLENGE).as_str()])
            .unwrap();
        let header = auth.authorization(Method::Get, "/login/login.bar").unwrap();
        assert_eq!(
            header,
            r#"Digest username="foo", realm="Foo Bar", nonce="7d8ca69b352016f88d7c3d8a040dc9e0", uri="/login/login.bar", algorithm=MD5, response="f08d9e44c4c45c47da3d676ce686754b", opaque="431d3681382c9550ffc0525839a37aa3", qop="auth", nc=00000001, cnonce="d5f19e5717bda6762e373e9c9be24e7b""#
        );
        let second = auth.authorization(Method::Get, "/login/login.bar").unwrap();
        assert!(second.contains("nc=00000002"));
    }

    #[test]
    fn digest_preferred_over_basic_in_any_order() {
        let mut auth = AuthNegotiator::new(Credentials::new("foo", "bar"), "ua");
        let digest = format!("Digest {}", CHALLENGE);
        auth.accept_challenges(["Basic realm=\"x\"", digest.as_str()])
            .unwrap();
        assert_eq!(auth.scheme().name(), "digest");
    }

    #[test]
    fn basic_header() {
        assert_eq!(basic_authorization("foo", "bar"), "Basic Zm9vOmJhcg==");
        let creds = Credentials::new("foo", "bar").with_auth_mode(AuthMode::Basic);
        let mut auth = AuthNegotiator::new(creds, "ua");
        assert_eq!(
            auth.authorization(Method::Get, "/").as_deref(),
            Some("Basic Zm9vOmJhcg==")
        );
    }

    #[test]
    fn unknown_scheme_is_unsupported() {
        let mut auth = AuthNegotiator::new(Credentials::new("foo", "bar"), "ua");
        let err = auth.accept_challenges(["Negotiate abc"]).unwrap_err();
        assert!(matches!(err, RetsError::UnsupportedAuth(_)));
        let err = auth
            .accept_challenges([r#"Digest realm="r", nonce="n", qop="auth-int""#])
            .unwrap_err();
        assert!(matches!(err, RetsError::UnsupportedAuth(_)));
    }

    #[test]
    fn digest_only_mode_refuses_basic() {
        let creds = Credentials::new("foo", "bar").with_auth_mode(AuthMode::Digest);
        let mut auth = AuthNegotiator::new(creds, "ua");
        assert!(auth.accept_challenges(["Basic realm=\"x\""]).is_err());
    }

    #[test]
    fn user_agent_digest_vectors() {
        assert_eq!(
            user_agent_authorization("FooBar", "foo", "", "RETS/1.8"),
            "Digest aaeef7c65ff28b5b475acb42e66268f8"
        );
        assert_eq!(
            user_agent_authorization("FooBar", "foo", "4f220ee66794dc9281000002", "RETS/1.8"),
            "Digest 3f56217348ed45a08e8669ed2a37c8da"
        );
    }

    #[test]
    fn empty_challenge_enables_user_agent_scheme() {
        let creds = Credentials::new("foo", "bar").with_user_agent("FooBar", Some("foo".into()));
        let mut auth = AuthNegotiator::new(creds, "ua");
        assert!(auth.ua_authorization(None).is_none());
        auth.note_server_version(Some("RETS/1.8"));
        auth.accept_challenges(std::iter::empty::<&str>()).unwrap();
        assert_eq!(auth.scheme(), &AuthScheme::None);
        assert_eq!(
            auth.ua_authorization(None).as_deref(),
            Some("Digest aaeef7c65ff28b5b475acb42e66268f8")
        );
    }

    #[test]
    fn version_precedence() {
        let mut auth = AuthNegotiator::new(Credentials::new("a", "b"), "ua");
        assert_eq!(auth.rets_version(), DEFAULT_RETS_VERSION);
        auth.note_server_version(Some(" "));
        assert_eq!(auth.rets_version(), DEFAULT_RETS_VERSION);
        auth.note_server_version(Some("RETS/1.8"));
        assert_eq!(auth.rets_version(), "RETS/1.8");
        let forced = AuthNegotiator::new(Credentials::new("a", "b").with_rets_version("RETS/1.5"), "ua");
        assert_eq!(forced.rets_version(), "RETS/1.5");
    }

    #[test]
    fn stale_detection() {
        let stale = format!("Digest {},stale=true", CHALLENGE);
        assert!(AuthNegotiator::has_stale_challenge([stale.as_str()]));
        assert!(!AuthNegotiator::has_stale_challenge([CHALLENGE]));
    }

    #[test]
    fn debug_hides_passwords() {
        let creds = Credentials::new("foo", "secret").with_user_agent("UA", Some("uapass".into()));
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret"));
        assert!(!shown.contains("uapass"));
    }
}
