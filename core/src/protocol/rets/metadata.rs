/*
 * metadata.rs
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

//! GetMetadata in COMPACT format: rows grouped under `METADATA-<type>` elements.
//!
//! A group is held in memory until its closing tag, then handed out whole. Groups are small
//! (one resource's classes, one class's tables); the response as a whole never is.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncBufRead, BufReader};

use crate::error::RetsError;
use crate::protocol::rets::compact::{CompactEvent, CompactReader, Record};
use crate::protocol::rets::transport::ResponseBody;

const GROUP_PREFIX: &str = "METADATA-";

/// GetMetadata request parameters.
#[derive(Debug, Clone)]
pub struct MetadataQuery {
    /// `Type`, e.g. `METADATA-CLASS`.
    pub metadata_type: String,
    /// `ID`, e.g. `0` or `Property`.
    pub id: String,
    pub read_timeout: Option<Duration>,
}

impl MetadataQuery {
    pub fn new(metadata_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            metadata_type: metadata_type.into(),
            id: id.into(),
            read_timeout: None,
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("Format", Some("COMPACT".to_string())),
            ("Type", Some(self.metadata_type.clone())),
            ("ID", Some(self.id.clone())),
        ]
    }
}

/// One `METADATA-*` element: its type with the prefix removed, its attributes
/// (Resource, Class, Version, Date, ...) and its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataGroup {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
    pub rows: Vec<Record>,
}

/// Reply and system information seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSummary {
    pub reply_code: Option<u32>,
    pub reply_text: Option<String>,
    pub system_id: Option<String>,
    pub system_description: Option<String>,
    pub delimiter: Option<char>,
}

/// Pull parser over a COMPACT metadata body.
pub struct MetadataParser<R> {
    compact: CompactReader<R>,
    open: Vec<(String, MetadataGroup)>,
    system: BTreeMap<String, String>,
}

/// Metadata groups streamed from a GetMetadata response.
pub type MetadataStream = MetadataParser<BufReader<ResponseBody>>;

fn group_kind(name: &str) -> Option<&str> {
    let prefix = name.get(..GROUP_PREFIX.len())?;
    let kind = name.get(GROUP_PREFIX.len()..)?;
    (prefix.eq_ignore_ascii_case(GROUP_PREFIX) && !kind.is_empty()).then_some(kind)
}

impl<R: AsyncBufRead + Unpin> MetadataParser<R> {
    pub fn new(inner: R) -> Self {
        Self {
            compact: CompactReader::new(inner),
            open: Vec::new(),
            system: BTreeMap::new(),
        }
    }

    /// Next complete group; `None` once the response is exhausted.
    pub async fn next(&mut self) -> Result<Option<MetadataGroup>, RetsError> {
        loop {
            let event = match self.compact.next_event().await? {
                Some(event) => event,
                None => {
                    if let Some((name, _)) = self.open.last() {
                        return Err(RetsError::malformed(format!(
                            "metadata ended inside an open {} group",
                            name
                        )));
                    }
                    return Ok(None);
                }
            };
            match event {
                CompactEvent::Start { name, attributes } => {
                    if let Some(kind) = group_kind(&name) {
                        let group = MetadataGroup {
                            kind: kind.to_string(),
                            attributes,
                            rows: Vec::new(),
                        };
                        self.open.push((name, group));
                    } else if name.eq_ignore_ascii_case("SYSTEM") {
                        self.system = attributes;
                    }
                }
                CompactEvent::Row(record) => match self.open.last_mut() {
                    Some((_, group)) => group.rows.push(record),
                    None => tracing::debug!("metadata row outside any group"),
                },
                CompactEvent::End { name } => {
                    if self.open.last().is_some_and(|(open, _)| *open == name) {
                        if let Some((_, group)) = self.open.pop() {
                            return Ok(Some(group));
                        }
                    }
                }
            }
        }
    }

    pub fn summary(&self) -> MetadataSummary {
        let (reply_code, reply_text) = match self.compact.reply() {
            Some((code, text)) => (Some(code), Some(text.to_string())),
            None => (None, None),
        };
        MetadataSummary {
            reply_code,
            reply_text,
            system_id: self.system_attribute("SystemID"),
            system_description: self.system_attribute("SystemDescription"),
            delimiter: reply_code.map(|_| self.compact.delimiter()),
        }
    }

    fn system_attribute(&self, name: &str) -> Option<String> {
        self.system
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

impl MetadataParser<BufReader<ResponseBody>> {
    /// Bytes of the response body consumed so far.
    pub fn request_size(&self) -> u64 {
        self.compact.get_ref().get_ref().size()
    }

    /// SHA-1 of the response body consumed so far.
    pub fn request_hash(&self) -> String {
        self.compact.get_ref().get_ref().hash()
    }

    /// True if the connection ended before the body was complete.
    pub fn is_truncated(&self) -> bool {
        self.compact.get_ref().get_ref().is_truncated()
    }

    /// Close the connection without reading the rest of the response.
    pub fn close(&mut self) {
        self.compact.get_mut().get_mut().close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: &str = "<RETS ReplyCode=\"0\" ReplyText=\"Operation Successful\">\n<METADATA-CLASS Resource=\"Property\" Version=\"1.00.00011\" Date=\"Tue, 15 Jun 2010 17:29:55 GMT\">\n<COLUMNS>\tClassName\tStandardName\t\tDescription\t</COLUMNS>\n<DATA>\tRES\tResidentialProperty\tx\tResidential\t</DATA>\n<DATA>\tLND\tLots\tx\tLand\t</DATA>\n<DATA>\tCOM\tCommonInterest\tx\tCondo\t</DATA>\n</METADATA-CLASS>\n</RETS>\n";

    #[tokio::test]
    async fn one_group_with_all_rows() {
        let mut parser = MetadataParser::new(CLASSES.as_bytes());
        let group = parser.next().await.unwrap().unwrap();
        assert_eq!(group.kind, "CLASS");
        assert_eq!(group.attributes["Resource"], "Property");
        assert_eq!(group.attributes["Version"], "1.00.00011");
        assert_eq!(group.rows.len(), 3);
        assert_eq!(group.rows[0].len(), 3);
        assert_eq!(group.rows[0]["ClassName"], "RES");
        assert_eq!(group.rows[1]["StandardName"], "Lots");
        assert_eq!(group.rows[2]["Description"], "Condo");
        assert!(!group.rows[0].contains_key(""));
        assert!(parser.next().await.unwrap().is_none());
        assert_eq!(parser.summary().reply_code, Some(0));
    }

    #[tokio::test]
    async fn system_group_and_summary() {
        let xml = "<RETS ReplyCode=\"0\" ReplyText=\"OK\"><METADATA-SYSTEM Version=\"1.1\" Date=\"2012-01-01\"><SYSTEM SystemID=\"DEMO\" SystemDescription=\"Demo MLS\"/><COMMENTS>hi</COMMENTS></METADATA-SYSTEM><METADATA-RESOURCE Version=\"1.1\"><COLUMNS>\tResourceID\t</COLUMNS><DATA>\tProperty\t</DATA><DATA>\tAgent\t</DATA></METADATA-RESOURCE></RETS>";
        let mut parser = MetadataParser::new(xml.as_bytes());
        let system = parser.next().await.unwrap().unwrap();
        assert_eq!(system.kind, "SYSTEM");
        assert!(system.rows.is_empty());
        let resources = parser.next().await.unwrap().unwrap();
        assert_eq!(resources.kind, "RESOURCE");
        assert_eq!(resources.rows.len(), 2);
        assert!(parser.next().await.unwrap().is_none());
        let summary = parser.summary();
        assert_eq!(summary.system_id.as_deref(), Some("DEMO"));
        assert_eq!(summary.system_description.as_deref(), Some("Demo MLS"));
        assert_eq!(summary.delimiter, Some('\t'));
    }

    #[tokio::test]
    async fn group_left_open_is_an_error() {
        let xml = "<RETS ReplyCode=\"0\" ReplyText=\"OK\"><METADATA-CLASS Resource=\"Property\"><COLUMNS>\tClassName\t</COLUMNS><DATA>\tRES\t</DATA></RETS>";
        let mut parser = MetadataParser::new(xml.as_bytes());
        assert!(parser.next().await.is_err());
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        use bytes::BytesMut;

        use crate::protocol::http::{BodyFraming, ChunkedStreamReader};

        let body = "<RETS ReplyCode=\"0\" ReplyText=\"OK\"><METADATA-CLASS Resource=\"Property\"><COLUMNS>\tClassName\t</COLUMNS><DATA>\tRES\tResid";
        let reader = ChunkedStreamReader::new(
            body.as_bytes(),
            BytesMut::new(),
            BodyFraming::fixed(body.len() as u64 + 100),
        );
        let mut parser = MetadataParser::new(BufReader::new(reader));
        let err = parser.next().await.unwrap_err();
        assert!(matches!(err, RetsError::Io(_)), "{err:?}");
        assert!(parser.compact.get_ref().get_ref().is_truncated());
    }

    #[tokio::test]
    async fn error_reply_aborts() {
        let mut parser = MetadataParser::new(&b"<RETS ReplyCode=\"20502\" ReplyText=\"Invalid Identifier\"/>"[..]);
        let err = parser.next().await.unwrap_err();
        assert_eq!(err.reply_code(), Some(20502));
    }

    #[tokio::test]
    async fn no_records_is_empty() {
        let mut parser = MetadataParser::new(&b"<RETS ReplyCode=\"20201\" ReplyText=\"No Metadata\"/>"[..]);
        assert!(parser.next().await.unwrap().is_none());
        assert_eq!(parser.summary().reply_code, Some(20201));
    }

    #[test]
    fn query_params() {
        let q = MetadataQuery::new("METADATA-TABLE", "Property:RES");
        let params = q.params();
        assert_eq!(params[0], ("Format", Some("COMPACT".to_string())));
        assert_eq!(params[2], ("ID", Some("Property:RES".to_string())));
    }
}
