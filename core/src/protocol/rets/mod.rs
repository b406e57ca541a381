/*
 * mod.rs
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

//! RETS protocol: authentication, session keeping, COMPACT parsing and the client facade.
//!
//! - `transport`: one logical request with its auth retries and session re-login.
//! - `metadata`, `search`, `object`: pull sequences over one response body each.
//! - `client`: `RetsClient::login` and the public operations.

pub mod auth;
pub mod capability;
pub mod client;
pub mod compact;
pub mod metadata;
pub mod object;
pub mod reply;
pub mod search;
pub mod session;
pub mod transport;

pub use auth::{AuthMode, AuthNegotiator, Credentials, DigestChallenge, UserAgentCredentials};
pub use capability::{CapabilityKind, CapabilityTable};
pub use client::{ClientOptions, RetsClient};
pub use compact::Record;
pub use metadata::{MetadataGroup, MetadataParser, MetadataQuery, MetadataStream, MetadataSummary};
pub use object::{ObjectQuery, ObjectStream, RetsObject};
pub use search::{CountMode, SearchParser, SearchQuery, SearchResults, SearchSummary};
pub use session::{CookieJar, SessionTimer};
pub use transport::{ResponseBody, RetsRequest, RetsResponse, TransportClient};
