/*
 * session.rs
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

//! Session state kept across requests: cookies and the login timeout.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Cookie carrying the RETS session id; it also feeds the User-Agent digest.
pub const SESSION_COOKIE: &str = "RETS-Session-ID";

/// Cookies by name. Attributes (path, expiry, HttpOnly) are dropped; the server only ever
/// needs its values echoed back.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
    header: Option<String>,
    dirty: bool,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one `Set-Cookie` value. Returns true if the session id changed.
    pub fn store(&mut self, set_cookie: &str) -> bool {
        let pair = set_cookie.split(';').next().unwrap_or("").trim();
        let (name, value) = match pair.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            None => return false,
        };
        if name.is_empty() {
            return false;
        }
        // Names match case-insensitively; the latest spelling is the one sent back.
        let existing = self
            .cookies
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned();
        if let Some(existing) = existing {
            if existing == name && self.cookies[&existing] == value {
                return false;
            }
            self.cookies.remove(&existing);
        }
        tracing::debug!(cookie = name, "cookie updated");
        self.cookies.insert(name.to_string(), value.to_string());
        self.dirty = true;
        name.eq_ignore_ascii_case(SESSION_COOKIE)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get(SESSION_COOKIE)
    }

    /// `Cookie` header value; rebuilt only after a value changed.
    pub fn header(&mut self) -> Option<&str> {
        if self.dirty {
            self.header = if self.cookies.is_empty() {
                None
            } else {
                Some(
                    self.cookies
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            };
            self.dirty = false;
        }
        self.header.as_deref()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
        self.header = None;
        self.dirty = false;
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Expiry for the server-side session, from the login listing's `TimeoutSeconds`.
#[derive(Debug, Default, Clone)]
pub struct SessionTimer {
    timeout: Option<Duration>,
    expires_at: Option<Instant>,
}

impl SessionTimer {
    /// Arm from a timeout in seconds; zero disables the timer.
    pub fn arm(&mut self, seconds: Option<u64>) {
        self.timeout = seconds.filter(|s| *s > 0).map(Duration::from_secs);
        self.rearm();
    }

    /// Restart the countdown with the configured timeout.
    pub fn rearm(&mut self) {
        self.expires_at = self.timeout.map(|t| Instant::now() + t);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn disarm(&mut self) {
        self.timeout = None;
        self.expires_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_rebuilt_on_change() {
        let mut jar = CookieJar::new();
        assert!(jar.header().is_none());
        assert!(!jar.store("ASP.NET_SessionId=4f220ee66794dc9281000001; path=/; HttpOnly"));
        assert!(jar.store("RETS-Session-ID=4f220ee66794dc9281000002; path=/"));
        assert_eq!(
            jar.header(),
            Some("ASP.NET_SessionId=4f220ee66794dc9281000001; RETS-Session-ID=4f220ee66794dc9281000002")
        );
        assert!(!jar.store("RETS-Session-ID=4f220ee66794dc9281000002"));
        assert!(!jar.dirty);
        assert_eq!(jar.session_id(), Some("4f220ee66794dc9281000002"));
    }

    #[test]
    fn session_cookie_name_is_case_insensitive() {
        let mut jar = CookieJar::new();
        assert!(jar.store("rets-session-id=abc"));
        assert_eq!(jar.session_id(), Some("abc"));
    }

    #[test]
    fn same_cookie_in_another_case_replaces_it() {
        let mut jar = CookieJar::new();
        assert!(jar.store("RETS-Session-ID=old"));
        assert!(jar.store("rets-session-id=new"));
        assert_eq!(jar.session_id(), Some("new"));
        assert_eq!(jar.header(), Some("rets-session-id=new"));
        assert_eq!(jar.cookies.len(), 1);
    }

    #[test]
    fn malformed_cookies_are_ignored() {
        let mut jar = CookieJar::new();
        assert!(!jar.store("RETS-Session-ID: foobar"));
        assert!(!jar.store("=value"));
        assert!(jar.is_empty());
    }

    #[test]
    fn clear_drops_header() {
        let mut jar = CookieJar::new();
        jar.store("a=1");
        assert!(jar.header().is_some());
        jar.clear();
        assert!(jar.header().is_none());
    }

    #[test]
    fn timer_zero_disables() {
        let mut timer = SessionTimer::default();
        timer.arm(Some(0));
        assert!(!timer.is_expired());
        assert!(timer.timeout().is_none());
    }

    #[test]
    fn timer_expires() {
        let mut timer = SessionTimer::default();
        timer.arm(Some(1));
        assert!(!timer.is_expired());
        timer.expires_at = Some(Instant::now() - Duration::from_millis(1));
        assert!(timer.is_expired());
        timer.rearm();
        assert!(!timer.is_expired());
    }
}
