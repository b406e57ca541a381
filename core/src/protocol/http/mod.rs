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

//! HTTP/1.1 client for RETS: one connection per request, streamed response bodies.
//!
//! - Buffers: `bytes` crate (BytesMut for parse buffer, Bytes for payload slices).
//! - HTTP/1.1: state-machine response parser, reused for body framing after the head.
//! - TLS via rustls; ALPN advertises http/1.1 only.
//! - The head is read eagerly; the body is handed out as a `ChunkedStreamReader` the caller
//!   pulls from. Multipart and XML are the caller's business.

mod request;
mod response;

pub mod body;
pub mod content_type;
pub mod h1;

pub use body::{BodyFraming, ChunkedStreamReader};
pub use content_type::{parse_content_type, ContentType};
pub use h1::H1ResponseHandler;
pub use request::{Method, RequestBuilder};
pub use response::ResponseHead;

pub mod client;
pub mod connection;

pub use client::HttpClient;
pub use connection::{HttpConnection, HttpStream};
