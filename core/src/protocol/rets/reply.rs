/*
 * reply.rs
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

//! The `<RETS ReplyCode=".." ReplyText="..">` envelope every response is wrapped in.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::RetsError;

pub const REPLY_SUCCESS: u32 = 0;
/// Success, but no records matched; parsers continue normally.
pub const REPLY_NO_RECORDS: u32 = 20201;
/// The server wants `RETS-UA-Authorization`.
pub const REPLY_UA_AUTH_REQUIRED: u32 = 20037;
/// GetObject: no object found.
pub const REPLY_NO_OBJECT: u32 = 20403;

/// Reply codes a parser may continue past.
pub fn is_accepted(code: u32) -> bool {
    code == REPLY_SUCCESS || code == REPLY_NO_RECORDS
}

/// Reply code and text from a root element, plus the listing text when the body was read
/// whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub code: u32,
    pub text: String,
    /// Text of `RETS-RESPONSE`, else the root element's own text.
    pub body: String,
}

impl Envelope {
    pub fn into_error(self) -> RetsError {
        RetsError::protocol(self.code, self.text)
    }
}

pub(crate) fn is_rets_root(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"RETS")
}

/// Read `ReplyCode` and `ReplyText` from the root element. Attribute names are matched
/// case-insensitively.
pub fn reply_attributes(start: &BytesStart<'_>) -> Result<(u32, String), RetsError> {
    let mut code = None;
    let mut text = String::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key.eq_ignore_ascii_case(b"ReplyCode") {
            let value = attr.unescape_value()?;
            code = Some(value.trim().parse::<u32>().map_err(|_| {
                RetsError::malformed(format!("non-numeric ReplyCode {:?}", value))
            })?);
        } else if key.eq_ignore_ascii_case(b"ReplyText") {
            text = attr.unescape_value()?.into_owned();
        }
    }
    match code {
        Some(code) => Ok((code, text)),
        None => Err(RetsError::malformed("RETS element without ReplyCode")),
    }
}

/// Look for a RETS envelope in a buffered body. `Ok(None)` when the body is not XML or its
/// root is not `RETS`.
pub fn sniff_envelope(body: &[u8]) -> Result<Option<Envelope>, RetsError> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut envelope: Option<Envelope> = None;
    let mut depth = 0usize;
    let mut in_response = false;
    let mut saw_response = false;
    let mut root_text = String::new();
    let mut response_text = String::new();
    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                if envelope.is_none() {
                    return Ok(None);
                }
                tracing::debug!(error = %e, "XML error inside RETS envelope");
                break;
            }
        };
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                if envelope.is_none() {
                    if !is_rets_root(e.name().as_ref()) {
                        return Ok(None);
                    }
                    let (code, text) = reply_attributes(e)?;
                    envelope = Some(Envelope {
                        code,
                        text,
                        body: String::new(),
                    });
                    if empty {
                        break;
                    }
                } else if depth == 1 && e.name().as_ref().eq_ignore_ascii_case(b"RETS-RESPONSE") {
                    saw_response = true;
                    in_response = !empty;
                }
                if !empty {
                    depth += 1;
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                if e.name().as_ref().eq_ignore_ascii_case(b"RETS-RESPONSE") {
                    in_response = false;
                }
                if depth == 0 {
                    break;
                }
            }
            Event::Text(ref t) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    Err(_) => String::from_utf8_lossy(t).into_owned(),
                };
                if in_response {
                    response_text.push_str(&text);
                } else if depth == 1 {
                    root_text.push_str(&text);
                }
            }
            Event::CData(ref t) => {
                let text = String::from_utf8_lossy(t);
                if in_response {
                    response_text.push_str(&text);
                } else if depth == 1 {
                    root_text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(envelope.map(|mut env| {
        env.body = if saw_response { response_text } else { root_text };
        env
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_case_attribute_names() {
        let env = sniff_envelope(br#"<RETS ReplyCode="20037" replytext="Failure message goes here."></RETS>"#)
            .unwrap()
            .unwrap();
        assert_eq!(env.code, 20037);
        assert_eq!(env.text, "Failure message goes here.");
    }

    #[test]
    fn listing_text_from_rets_response() {
        let body = b"<?xml version=\"1.0\"?>\r\n<RETS ReplyCode=\"0\" ReplyText=\"Operation Successful\">\r\n<RETS-RESPONSE>\r\nMemberName=Jane\r\nSearch=/search\r\n</RETS-RESPONSE>\r\n</RETS>\r\n";
        let env = sniff_envelope(body).unwrap().unwrap();
        assert_eq!(env.code, 0);
        assert!(env.body.contains("MemberName=Jane"));
        assert!(env.body.contains("Search=/search"));
    }

    #[test]
    fn listing_text_from_root_element() {
        let body = b"<RETS ReplyCode=\"0\" ReplyText=\"OK\">\nLogin=/login\nSearch=/search?a=1&b=2\n</RETS>";
        let env = sniff_envelope(body).unwrap().unwrap();
        assert!(env.body.contains("Search=/search?a=1&b=2"));
    }

    #[test]
    fn not_rets() {
        assert!(sniff_envelope(b"<html><body>Not here</body></html>").unwrap().is_none());
        assert!(sniff_envelope(b"Internal error").unwrap().is_none());
        assert!(sniff_envelope(b"").unwrap().is_none());
    }

    #[test]
    fn missing_reply_code_is_malformed() {
        let err = sniff_envelope(b"<RETS ReplyText=\"x\"/>").unwrap_err();
        assert!(matches!(err, RetsError::MalformedResponse(_)));
    }

    #[test]
    fn self_closing_envelope() {
        let env = sniff_envelope(b"<RETS ReplyCode=\"20403\" ReplyText=\"No Object Found\" />")
            .unwrap()
            .unwrap();
        assert_eq!(env.code, REPLY_NO_OBJECT);
        assert!(env.body.is_empty());
        assert!(!is_accepted(env.code));
        assert!(is_accepted(REPLY_NO_RECORDS));
    }
}
