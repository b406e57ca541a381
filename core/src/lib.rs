/*
 * lib.rs
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

//! rets_core: a streaming client for the Real Estate Transaction Standard (RETS).
//!
//! Log in with [`RetsClient::login`], then pull metadata groups, search records or
//! objects from the returned sequences. Each sequence reads its response body
//! incrementally and reports the size and SHA-1 of the bytes consumed.

pub mod error;
pub mod net;
pub mod protocol;
pub mod uri;

pub use error::RetsError;
pub use protocol::rets::{
    AuthMode, CapabilityKind, ClientOptions, CountMode, Credentials, MetadataGroup,
    MetadataQuery, MetadataStream, ObjectQuery, ObjectStream, Record, RetsClient, RetsObject,
    SearchQuery, SearchResults, UserAgentCredentials,
};

/// Lowercase hex of a digest.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(HEX[(b >> 4) as usize] as char);
        s.push(HEX[(b & 15) as usize] as char);
    }
    s
}

#[cfg(test)]
mod tests {
    #[test]
    fn hex_is_lowercase() {
        assert_eq!(super::to_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}
