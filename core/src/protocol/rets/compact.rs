/*
 * compact.rs
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

//! COMPACT payloads: `DELIMITER`, `COLUMNS` and `DATA` rows inside a RETS envelope.
//!
//! `CompactReader` pulls XML events from an async byte source and turns them into rows and
//! structural events. Only the text of the element being read is buffered, so memory is
//! bounded by the longest row.

use std::collections::BTreeMap;
use std::io;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::io::AsyncBufRead;

use crate::error::RetsError;
use crate::protocol::rets::reply::{is_accepted, is_rets_root, reply_attributes};

/// One row: column name to value. Columns with an empty name are never present.
pub type Record = BTreeMap<String, String>;

pub const DEFAULT_DELIMITER: char = '\t';

/// Element events a dialect parser cares about; rows arrive already split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompactEvent {
    Row(Record),
    Start {
        name: String,
        attributes: BTreeMap<String, String>,
    },
    End {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Columns,
    Data,
}

pub(crate) struct CompactReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    reply: Option<(u32, String)>,
    delimiter: char,
    columns: Vec<String>,
    capture: Option<Capture>,
    text: String,
    /// End event owed for a self-closing element.
    pending_end: Option<String>,
    /// The root element has been closed.
    closed: bool,
    done: bool,
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attribute_map(start: &BytesStart<'_>) -> Result<BTreeMap<String, String>, RetsError> {
    let mut map = BTreeMap::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        map.insert(key, value);
    }
    Ok(map)
}

/// Field separator from a `DELIMITER value="09"` element: a decimal character code.
fn parse_delimiter(start: &BytesStart<'_>) -> Result<Option<char>, RetsError> {
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref().eq_ignore_ascii_case(b"value") {
            let value = attr.unescape_value()?;
            return Ok(value.trim().parse::<u32>().ok().and_then(char::from_u32));
        }
    }
    Ok(None)
}

/// Split a COMPACT line into fields by position. Leading and trailing delimiters yield
/// empty fields, which line up with the empty column names around them.
pub(crate) fn split_fields(text: &str, delimiter: char) -> Vec<String> {
    text.split(delimiter).map(str::to_string).collect()
}

/// Zip a DATA row against the column list. Empty-named columns are dropped; a short row
/// yields only the fields present.
pub(crate) fn build_record(columns: &[String], text: &str, delimiter: char) -> Record {
    columns
        .iter()
        .zip(text.split(delimiter))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

impl<R: AsyncBufRead + Unpin> CompactReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(1024),
            reply: None,
            delimiter: DEFAULT_DELIMITER,
            columns: Vec::new(),
            capture: None,
            text: String::new(),
            pending_end: None,
            closed: false,
            done: false,
        }
    }

    /// Root reply code and text, once the root element has been read.
    pub fn reply(&self) -> Option<(u32, &str)> {
        self.reply.as_ref().map(|(c, t)| (*c, t.as_str()))
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.reader.get_mut()
    }

    /// Next row or structural event; `None` once the envelope closes or the input ends.
    pub async fn next_event(&mut self) -> Result<Option<CompactEvent>, RetsError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(CompactEvent::End { name }));
        }
        loop {
            if self.done {
                return Ok(None);
            }
            self.buf.clear();
            let event = self.reader.read_event_into_async(&mut self.buf).await?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    if self.reply.is_none() {
                        if !is_rets_root(e.name().as_ref()) {
                            self.done = true;
                            return Err(RetsError::malformed(format!(
                                "expected RETS root element, found {}",
                                element_name(e)
                            )));
                        }
                        let (code, text) = reply_attributes(e)?;
                        if !is_accepted(code) {
                            self.done = true;
                            return Err(RetsError::protocol(code, text));
                        }
                        self.reply = Some((code, text));
                        if empty {
                            self.closed = true;
                            self.done = true;
                        }
                        continue;
                    }
                    let name = element_name(e);
                    if name.eq_ignore_ascii_case("DELIMITER") {
                        match parse_delimiter(e)? {
                            Some(c) => self.delimiter = c,
                            None => tracing::warn!("unusable DELIMITER value, keeping tab"),
                        }
                        continue;
                    }
                    let capture = if name.eq_ignore_ascii_case("COLUMNS") {
                        Some(Capture::Columns)
                    } else if name.eq_ignore_ascii_case("DATA") {
                        Some(Capture::Data)
                    } else {
                        None
                    };
                    if let Some(capture) = capture {
                        self.text.clear();
                        if !empty {
                            self.capture = Some(capture);
                            continue;
                        }
                        let event = finish_capture(
                            capture,
                            &mut self.text,
                            &mut self.columns,
                            self.delimiter,
                        );
                        if let Some(event) = event {
                            return Ok(Some(event));
                        }
                        continue;
                    }
                    let attributes = attribute_map(e)?;
                    if empty {
                        self.pending_end = Some(name.clone());
                    }
                    return Ok(Some(CompactEvent::Start { name, attributes }));
                }
                Event::Text(ref t) => {
                    if self.capture.is_some() {
                        match t.unescape() {
                            Ok(s) => self.text.push_str(&s),
                            Err(_) => self.text.push_str(&String::from_utf8_lossy(t)),
                        }
                    }
                }
                Event::CData(ref t) => {
                    if self.capture.is_some() {
                        self.text.push_str(&String::from_utf8_lossy(t));
                    }
                }
                Event::End(ref e) => {
                    if is_rets_root(e.name().as_ref()) {
                        self.closed = true;
                        self.done = true;
                        continue;
                    }
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if let Some(capture) = self.capture.take() {
                        let event = finish_capture(
                            capture,
                            &mut self.text,
                            &mut self.columns,
                            self.delimiter,
                        );
                        if let Some(event) = event {
                            return Ok(Some(event));
                        }
                        continue;
                    }
                    if name.eq_ignore_ascii_case("DELIMITER") {
                        continue;
                    }
                    return Ok(Some(CompactEvent::End { name }));
                }
                Event::Eof => {
                    self.done = true;
                    if self.reply.is_none() {
                        return Err(RetsError::malformed("response has no RETS envelope"));
                    }
                    if !self.closed {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "response ended before the RETS envelope closed",
                        )
                        .into());
                    }
                }
                _ => {}
            }
        }
    }
}

fn finish_capture(
    capture: Capture,
    text: &mut String,
    columns: &mut Vec<String>,
    delimiter: char,
) -> Option<CompactEvent> {
    let text = std::mem::take(text);
    match capture {
        Capture::Columns => {
            *columns = split_fields(&text, delimiter);
            None
        }
        Capture::Data => Some(CompactEvent::Row(build_record(columns, &text, delimiter))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(xml: &str) -> Result<Vec<CompactEvent>, RetsError> {
        let mut reader = CompactReader::new(xml.as_bytes());
        let mut out = Vec::new();
        while let Some(event) = reader.next_event().await? {
            out.push(event);
        }
        Ok(out)
    }

    #[test]
    fn record_drops_empty_columns_and_keeps_empty_values() {
        let columns = split_fields("\tA\t\tB\t", '\t');
        assert_eq!(columns, vec!["", "A", "", "B", ""]);
        let record = build_record(&columns, "\t1\tx\t\t", '\t');
        assert_eq!(record.len(), 2);
        assert_eq!(record["A"], "1");
        assert_eq!(record["B"], "");
    }

    #[test]
    fn short_row_yields_present_fields() {
        let columns = split_fields("|A|B|C|", '|');
        let record = build_record(&columns, "|1", '|');
        assert_eq!(record.len(), 1);
        assert_eq!(record["A"], "1");
    }

    #[tokio::test]
    async fn rows_use_declared_delimiter() {
        let events = collect(
            "<RETS ReplyCode=\"0\" ReplyText=\"OK\"><DELIMITER value=\"124\"/><COLUMNS>|A|B|</COLUMNS><DATA>|1|a &amp; b|</DATA></RETS>",
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            CompactEvent::Row(r) => {
                assert_eq!(r["A"], "1");
                assert_eq!(r["B"], "a & b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn other_elements_come_through_with_attributes() {
        let events = collect("<RETS ReplyCode=\"0\" ReplyText=\"OK\"><COUNT Records=\"5\"/><MAXROWS/></RETS>")
            .await
            .unwrap();
        assert_eq!(events.len(), 4);
        match &events[0] {
            CompactEvent::Start { name, attributes } => {
                assert_eq!(name, "COUNT");
                assert_eq!(attributes["Records"], "5");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(events[1], CompactEvent::End { name: "COUNT".into() });
    }

    #[tokio::test]
    async fn rejected_reply_code() {
        let err = collect("<RETS ReplyCode=\"20000\" ReplyText=\"Error message goes here.\"></RETS>")
            .await
            .unwrap_err();
        assert_eq!(err.reply_code(), Some(20000));
        assert_eq!(err.reply_text(), Some("Error message goes here."));
    }

    #[tokio::test]
    async fn unclosed_envelope_is_an_error() {
        let mut reader = CompactReader::new(
            &b"<RETS ReplyCode=\"0\" ReplyText=\"OK\"><COLUMNS>\tA\t</COLUMNS><DATA>\t1\t</DATA><DATA>\t2"[..],
        );
        assert!(matches!(
            reader.next_event().await.unwrap(),
            Some(CompactEvent::Row(_))
        ));
        let err = reader.next_event().await.unwrap_err();
        match err {
            RetsError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected {:?}", other),
        }
        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn not_an_envelope() {
        assert!(matches!(
            collect("<html></html>").await.unwrap_err(),
            RetsError::MalformedResponse(_)
        ));
        assert!(matches!(
            collect("").await.unwrap_err(),
            RetsError::MalformedResponse(_)
        ));
    }
}
