/*
 * capability.rs
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

//! Capability URLs advertised in the login response.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::uri::resolve_capability_url;

/// Server operations a capability URL can be advertised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    Login,
    Logout,
    Search,
    GetMetadata,
    GetObject,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::Login,
        CapabilityKind::Logout,
        CapabilityKind::Search,
        CapabilityKind::GetMetadata,
        CapabilityKind::GetObject,
    ];

    /// Key used in the login listing.
    pub fn key(&self) -> &'static str {
        match self {
            CapabilityKind::Login => "Login",
            CapabilityKind::Logout => "Logout",
            CapabilityKind::Search => "Search",
            CapabilityKind::GetMetadata => "GetMetadata",
            CapabilityKind::GetObject => "GetObject",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Absolute URL per advertised capability. Read-only once login completes.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    urls: BTreeMap<CapabilityKind, Url>,
}

impl CapabilityTable {
    pub fn get(&self, kind: CapabilityKind) -> Option<&Url> {
        self.urls.get(&kind)
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.urls.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CapabilityKind, &Url)> {
        self.urls.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub(crate) fn insert(&mut self, kind: CapabilityKind, url: Url) {
        self.urls.insert(kind, url);
    }
}

/// Everything the login response listed.
#[derive(Debug, Clone, Default)]
pub struct LoginListing {
    pub capabilities: CapabilityTable,
    /// `TimeoutSeconds`, when present and non-zero.
    pub timeout_seconds: Option<u64>,
    /// Remaining `Key=Value` pairs (MemberName, Broker, MetadataVersion, ...).
    pub info: BTreeMap<String, String>,
}

/// Parse the newline separated `Key = Value` listing of a login response. Capability
/// values are resolved against the login URL; the login URL itself is always present.
pub fn parse_listing(login_url: &Url, text: &str) -> LoginListing {
    let mut listing = LoginListing::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("TimeoutSeconds") {
            listing.timeout_seconds = value.parse::<u64>().ok().filter(|s| *s > 0);
            continue;
        }
        match CapabilityKind::from_key(key) {
            Some(kind) if !value.is_empty() => match resolve_capability_url(login_url, value) {
                Ok(url) => listing.capabilities.insert(kind, url),
                Err(e) => tracing::warn!(capability = %kind, error = %e, "skipping capability URL"),
            },
            Some(_) => {}
            None => {
                listing.info.insert(key.to_string(), value.to_string());
            }
        }
    }
    if !listing.capabilities.contains(CapabilityKind::Login) {
        listing
            .capabilities
            .insert(CapabilityKind::Login, login_url.clone());
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> Url {
        Url::parse("http://foobar.com:1234/rets/Login").unwrap()
    }

    #[test]
    fn relative_and_absolute_urls() {
        let text = "\n    MemberName = Jane Doe\n    User=jdoe,1,2,3\n    GETOBJECT = http://objects.example.com/rets/GetObject\n    Search=/rets/Search\n    getMetadata=rets/GetMetadata\n    TimeoutSeconds=1800\n";
        let listing = parse_listing(&login(), text);
        assert_eq!(
            listing.capabilities.get(CapabilityKind::GetObject).unwrap().as_str(),
            "http://objects.example.com/rets/GetObject"
        );
        assert_eq!(
            listing.capabilities.get(CapabilityKind::Search).unwrap().as_str(),
            "http://foobar.com:1234/rets/Search"
        );
        assert_eq!(
            listing.capabilities.get(CapabilityKind::GetMetadata).unwrap().as_str(),
            "http://foobar.com:1234/rets/GetMetadata"
        );
        assert_eq!(listing.capabilities.get(CapabilityKind::Login), Some(&login()));
        assert!(!listing.capabilities.contains(CapabilityKind::Logout));
        assert_eq!(listing.timeout_seconds, Some(1800));
        assert_eq!(listing.info.get("MemberName").map(String::as_str), Some("Jane Doe"));
        assert_eq!(listing.info.get("User").map(String::as_str), Some("jdoe,1,2,3"));
        assert!(!listing.info.contains_key("TimeoutSeconds"));
    }

    #[test]
    fn zero_or_bad_timeout_disables() {
        assert_eq!(parse_listing(&login(), "TimeoutSeconds=0").timeout_seconds, None);
        assert_eq!(parse_listing(&login(), "TimeoutSeconds=soon").timeout_seconds, None);
    }

    #[test]
    fn kind_keys() {
        assert_eq!(CapabilityKind::from_key(" logout "), Some(CapabilityKind::Logout));
        assert_eq!(CapabilityKind::from_key("Update"), None);
        assert_eq!(CapabilityKind::GetMetadata.to_string(), "GetMetadata");
    }
}
