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

//! RETS client: login, capability lookup and the metadata, search and object operations.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::BufReader;
use url::Url;

use crate::error::RetsError;
use crate::protocol::http::client::DEFAULT_CONNECT_TIMEOUT;
use crate::protocol::rets::auth::{AuthNegotiator, Credentials};
use crate::protocol::rets::capability::{parse_listing, CapabilityKind, CapabilityTable};
use crate::protocol::rets::metadata::{MetadataParser, MetadataQuery, MetadataStream};
use crate::protocol::rets::object::{ObjectQuery, ObjectStream};
use crate::protocol::rets::reply::{sniff_envelope, REPLY_SUCCESS, REPLY_UA_AUTH_REQUIRED};
use crate::protocol::rets::search::{SearchParser, SearchQuery, SearchResults};
use crate::protocol::rets::transport::{RetsRequest, TransportClient};
use crate::uri::parse_http_url;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection and login behaviour.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// `User-Agent` when no RETS User-Agent name is configured.
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Default read timeout; query structs may override it per call.
    pub read_timeout: Duration,
    /// Require reply code 0 at login. When false a 20037 login reply is accepted too.
    pub strict: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("rets_core/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            strict: true,
        }
    }
}

/// A logged-in RETS session.
///
/// Every operation takes `&mut self`: one request is in flight at a time. The sequences
/// returned by `get_metadata`, `search` and `get_object` own their connection and do not
/// borrow the client.
pub struct RetsClient {
    transport: TransportClient,
    capabilities: CapabilityTable,
    login_info: BTreeMap<String, String>,
    server_version: Option<String>,
    reply: (u32, String),
}

impl RetsClient {
    /// Log in and read the capability listing.
    pub async fn login(
        url: &str,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self, RetsError> {
        let login_url = parse_http_url(url).map_err(RetsError::InvalidUrl)?;
        let auth = AuthNegotiator::new(credentials, &options.user_agent);
        let mut transport =
            TransportClient::new(auth, options.connect_timeout, options.read_timeout);

        let response = transport
            .request(&RetsRequest::new(login_url.clone()).buffered())
            .await?;
        let body = response.buffered.unwrap_or_default();
        let envelope = sniff_envelope(&body)?.ok_or_else(|| {
            RetsError::malformed("login response does not look like a RETS server")
        })?;
        match envelope.code {
            REPLY_SUCCESS => {}
            REPLY_UA_AUTH_REQUIRED if !options.strict => {
                tracing::warn!(text = %envelope.text, "login accepted with reply code 20037");
            }
            _ => return Err(envelope.into_error()),
        }

        let listing = parse_listing(&login_url, &envelope.body);
        let relogin_url = listing
            .capabilities
            .get(CapabilityKind::Login)
            .cloned()
            .unwrap_or(login_url);
        transport.set_login_url(relogin_url);
        transport.arm_session_timer(listing.timeout_seconds);

        let server_version = response
            .head
            .header("rets-version")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        tracing::info!(
            capabilities = listing.capabilities.len(),
            version = server_version.as_deref().unwrap_or("unknown"),
            "logged in"
        );
        Ok(Self {
            transport,
            capabilities: listing.capabilities,
            login_info: listing.info,
            server_version,
            reply: (envelope.code, envelope.text),
        })
    }

    /// Log out. Without an advertised Logout capability this does nothing.
    pub async fn logout(&mut self) -> Result<(), RetsError> {
        let Some(url) = self.capabilities.get(CapabilityKind::Logout).cloned() else {
            tracing::debug!("no Logout capability, nothing to do");
            return Ok(());
        };
        let response = self
            .transport
            .request(&RetsRequest::new(url).buffered())
            .await?;
        self.transport.disarm_session_timer();
        let body = response.buffered.unwrap_or_default();
        if let Some(env) = sniff_envelope(&body)? {
            if env.code != REPLY_SUCCESS {
                return Err(env.into_error());
            }
        }
        tracing::info!("logged out");
        Ok(())
    }

    pub fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains(kind)
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Listing entries other than capability URLs and `TimeoutSeconds`.
    pub fn login_info(&self) -> &BTreeMap<String, String> {
        &self.login_info
    }

    /// `RETS-Version` the server sent with the login response.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Reply code and text of the login response.
    pub fn login_reply(&self) -> (u32, &str) {
        (self.reply.0, &self.reply.1)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.transport.session_id()
    }

    fn capability(&self, kind: CapabilityKind) -> Result<Url, RetsError> {
        self.capabilities
            .get(kind)
            .cloned()
            .ok_or(RetsError::CapabilityMissing(kind))
    }

    /// Stream metadata groups of one type.
    pub async fn get_metadata(&mut self, query: &MetadataQuery) -> Result<MetadataStream, RetsError> {
        let url = self.capability(CapabilityKind::GetMetadata)?;
        let request = RetsRequest::new(url)
            .params(query.params())
            .read_timeout(query.read_timeout);
        let response = self.transport.request(&request).await?;
        Ok(MetadataParser::new(BufReader::new(response.body)))
    }

    /// Stream the records matching a query.
    pub async fn search(&mut self, query: &SearchQuery) -> Result<SearchResults, RetsError> {
        let url = self.capability(CapabilityKind::Search)?;
        let request = RetsRequest::new(url)
            .params(query.params())
            .read_timeout(query.read_timeout);
        let response = self.transport.request(&request).await?;
        Ok(SearchParser::new(BufReader::new(response.body)))
    }

    /// Fetch objects. A "no object found" reply yields an empty stream.
    pub async fn get_object(&mut self, query: &ObjectQuery) -> Result<ObjectStream, RetsError> {
        let url = self.capability(CapabilityKind::GetObject)?;
        let request = RetsRequest::new(url)
            .params(query.params())
            .accept(query.accept_header())
            .read_timeout(query.read_timeout);
        let response = self.transport.request(&request).await?;
        ObjectStream::from_response(&response.head, response.body).await
    }
}
