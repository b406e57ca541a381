/*
 * support/mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Shared fixtures for the client integration tests: a mock RETS server with a login
 * transaction and helpers to inspect what the client sent.
 */

#![allow(dead_code)]

use sha1::{Digest, Sha1};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const LOGIN_PATH: &str = "/rets/login";

/// Capability listing with every transaction, relative to the login origin.
pub fn login_body(timeout_seconds: Option<u64>) -> String {
    let mut listing = String::from(
        "MemberName=Jane Doe\n\
         User=jdoe,1,2,3\n\
         Search=/rets/search\n\
         GetMetadata=/rets/metadata\n\
         GetObject=/rets/object\n\
         Logout=/rets/logout\n",
    );
    if let Some(t) = timeout_seconds {
        listing.push_str(&format!("TimeoutSeconds={}\n", t));
    }
    format!(
        "<RETS ReplyCode=\"0\" ReplyText=\"Operation Successful\">\n<RETS-RESPONSE>\n{}</RETS-RESPONSE>\n</RETS>\n",
        listing
    )
}

/// Listing without Logout or GetObject.
pub fn minimal_login_body() -> String {
    "<RETS ReplyCode=\"0\" ReplyText=\"V2.7.0 2315: Success\">\n<RETS-RESPONSE>\nSearch=/rets/search\n</RETS-RESPONSE>\n</RETS>\n".to_string()
}

pub fn reply(code: u32, text: &str) -> String {
    format!("<RETS ReplyCode=\"{}\" ReplyText=\"{}\" />\n", code, text)
}

pub fn xml(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/xml")
}

/// Mount a plain login transaction answering with `body`.
pub async fn mount_login(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(
            xml(body)
                .insert_header("RETS-Version", "RETS/1.7.2")
                .append_header("Set-Cookie", "RETS-Session-ID=abc123; path=/"),
        )
        .mount(server)
        .await;
}

pub fn login_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), LOGIN_PATH)
}

/// Requests the server saw for one path, in arrival order.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

pub fn header_of<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn sha1_hex(data: &[u8]) -> String {
    Sha1::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}
