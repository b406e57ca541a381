/*
 * content_type.rs
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

//! Content-Type header (RFC 2045): media type plus `charset` and `boundary` parameters.

use std::collections::HashMap;

/// Checks if a character is valid in an RFC 2045 token.
#[inline]
fn is_token_char(c: u8) -> bool {
    matches!(c,
        b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' |
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~'
    )
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameter_map: HashMap<String, String>,
}

impl ContentType {
    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(primary) && self.sub_type.eq_ignore_ascii_case(sub)
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameter_map.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn charset(&self) -> Option<&str> {
        self.get_parameter("charset")
    }

    pub fn boundary(&self) -> Option<&str> {
        self.get_parameter("boundary")
    }

    pub fn is_multipart(&self) -> bool {
        self.primary_type.eq_ignore_ascii_case("multipart")
    }

    /// text/xml, application/xml, image/xml and the like.
    pub fn is_xml(&self) -> bool {
        self.sub_type.eq_ignore_ascii_case("xml") || self.sub_type.to_ascii_lowercase().ends_with("+xml")
    }

    /// Whether the body is character data (safe to transcode).
    pub fn is_textual(&self) -> bool {
        self.primary_type.eq_ignore_ascii_case("text") || self.is_xml()
    }
}

/// Parse Content-Type header value.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (type_part, params_part) = match value.find(';') {
        Some(i) => {
            let (a, b) = value.split_at(i);
            (a.trim(), b[1..].trim())
        }
        None => (value, ""),
    };
    let slash = type_part.find('/')?;
    let primary = type_part[..slash].trim();
    let sub = type_part[slash + 1..].trim();
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    Some(ContentType {
        primary_type: primary.to_string(),
        sub_type: sub.to_string(),
        parameter_map: parse_parameter_list(params_part),
    })
}

/// Parse semicolon-separated parameter list (name=value; name="value").
/// Names are lower-cased; malformed entries are skipped.
fn parse_parameter_list(params_part: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let bytes = params_part.as_bytes();
    let len = bytes.len();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let eq = match bytes[pos..].iter().position(|&b| b == b'=') {
            Some(i) => pos + i,
            None => break,
        };
        let name = String::from_utf8_lossy(&bytes[pos..eq]).trim().to_string();
        pos = eq + 1;
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                let c = bytes[pos];
                if c == b'\\' && pos + 1 < len {
                    v.push(bytes[pos + 1]);
                    pos += 2;
                } else if c == b'"' {
                    pos += 1;
                    break;
                } else {
                    v.push(c);
                    pos += 1;
                }
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b';')
                .map(|i| pos + i)
                .unwrap_or(len);
            let v = String::from_utf8_lossy(&bytes[pos..end]).trim().to_string();
            pos = end;
            v
        };
        if is_token(&name) {
            parameters.insert(name.to_lowercase(), value);
        }
    }
    parameters
}
