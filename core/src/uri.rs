/*
 * uri.rs
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

//! RETS URLs: query-string encoding for request parameters and resolution of capability
//! URLs advertised at login (absolute, or relative to the login URL's origin).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Query value safe set: encode everything except RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode one query parameter value.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Build `key=value&key=value` from parameters; absent values are skipped.
pub fn build_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut out = String::new();
    for (key, value) in params {
        let value = match value {
            Some(v) => v,
            None => continue,
        };
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&encode_query_value(value));
    }
    out
}

/// Path and query as sent on the request line (and in the Digest `uri` field).
pub fn request_uri(url: &Url, query: &str) -> String {
    let mut uri = url.path().to_string();
    if uri.is_empty() {
        uri.push('/');
    }
    let existing = url.query().filter(|q| !q.is_empty());
    match (existing, query.is_empty()) {
        (Some(q), true) => {
            uri.push('?');
            uri.push_str(q);
        }
        (Some(q), false) => {
            uri.push('?');
            uri.push_str(q);
            uri.push('&');
            uri.push_str(query);
        }
        (None, false) => {
            uri.push('?');
            uri.push_str(query);
        }
        (None, true) => {}
    }
    uri
}

/// Parse the login URL; only http and https are accepted.
pub fn parse_http_url(input: &str) -> Result<Url, String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("{}: {}", input, e))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(format!("{}: not an http(s) URL", input)),
    }
}

/// Resolve a capability URL against the login URL's origin.
/// Values with their own scheme and host pass through unchanged; anything else is a path on
/// the login server (a missing leading slash is added).
pub fn resolve_capability_url(login: &Url, value: &str) -> Result<Url, String> {
    let value = value.trim();
    if let Ok(url) = Url::parse(value) {
        if url.host_str().is_some() {
            return Ok(url);
        }
    }
    let path = if value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{}", value)
    };
    let mut origin = login.clone();
    origin.set_query(None);
    origin.set_fragment(None);
    origin
        .join(&path)
        .map_err(|e| format!("{}: {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_skips_absent_values() {
        let q = build_query([
            ("Format", Some("COMPACT")),
            ("Limit", None),
            ("Query", Some("(FOO=BAR)")),
        ]);
        assert_eq!(q, "Format=COMPACT&Query=%28FOO%3DBAR%29");
    }

    #[test]
    fn query_encodes_spaces_and_commas() {
        assert_eq!(encode_query_value("A,B C"), "A%2CB%20C");
        assert_eq!(encode_query_value("0:0:*"), "0%3A0%3A%2A");
    }

    #[test]
    fn request_uri_appends_query() {
        let url = Url::parse("http://foobar.com/rets/search").unwrap();
        assert_eq!(request_uri(&url, ""), "/rets/search");
        assert_eq!(request_uri(&url, "a=b&c=d"), "/rets/search?a=b&c=d");
        let url = Url::parse("http://foobar.com/rets/search?x=1").unwrap();
        assert_eq!(request_uri(&url, "a=b"), "/rets/search?x=1&a=b");
    }

    #[test]
    fn relative_capability_resolves_against_origin() {
        let login = Url::parse("http://foobar.com/Login.asmx/Login").unwrap();
        let u = resolve_capability_url(&login, "/Search.asmx/Search").unwrap();
        assert_eq!(u.as_str(), "http://foobar.com/Search.asmx/Search");
        let u = resolve_capability_url(&login, "GetObject.asmx/GetObject").unwrap();
        assert_eq!(u.as_str(), "http://foobar.com/GetObject.asmx/GetObject");
    }

    #[test]
    fn relative_capability_keeps_port() {
        let login = Url::parse("http://foobar.com:1234/rets/login?a=1").unwrap();
        let u = resolve_capability_url(&login, "/rets/logout").unwrap();
        assert_eq!(u.as_str(), "http://foobar.com:1234/rets/logout");
    }

    #[test]
    fn absolute_capability_passes_through() {
        let login = Url::parse("http://foobar.com/rets/login").unwrap();
        let u = resolve_capability_url(&login, "https://other.example.com:8443/rets/search").unwrap();
        assert_eq!(u.as_str(), "https://other.example.com:8443/rets/search");
    }

    #[test]
    fn login_url_must_be_http() {
        assert!(parse_http_url("http://foobar.com/login").is_ok());
        assert!(parse_http_url("ftp://foobar.com/login").is_err());
        assert!(parse_http_url("not a url").is_err());
    }
}
