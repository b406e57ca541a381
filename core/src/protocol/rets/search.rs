/*
 * search.rs
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

//! Search in COMPACT(-DECODED) format: one record per `DATA` row, handed out as soon as the
//! row closes.

use std::time::Duration;

use tokio::io::{AsyncBufRead, BufReader};

use crate::error::RetsError;
use crate::protocol::rets::compact::{CompactEvent, CompactReader, Record};
use crate::protocol::rets::transport::ResponseBody;

/// Whether the server should report the number of matching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Records only.
    #[default]
    None,
    /// Records plus a `COUNT` element.
    Both,
    /// Only the `COUNT` element; the sequence of records is empty.
    Only,
}

impl CountMode {
    fn param(&self) -> Option<&'static str> {
        match self {
            CountMode::None => None,
            CountMode::Both => Some("1"),
            CountMode::Only => Some("2"),
        }
    }
}

/// Search request parameters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub search_type: String,
    pub class: String,
    /// DMQL query, e.g. `(ListPrice=300000+)`.
    pub query: String,
    pub format: String,
    pub query_type: String,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub restricted_indicator: Option<String>,
    pub select: Vec<String>,
    pub standard_names: bool,
    pub count: CountMode,
    pub read_timeout: Option<Duration>,
}

impl SearchQuery {
    pub fn new(
        search_type: impl Into<String>,
        class: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            search_type: search_type.into(),
            class: class.into(),
            query: query.into(),
            format: "COMPACT-DECODED".to_string(),
            query_type: "DMQL2".to_string(),
            limit: None,
            offset: None,
            restricted_indicator: None,
            select: Vec::new(),
            standard_names: false,
            count: CountMode::None,
            read_timeout: None,
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn standard_names(mut self, standard_names: bool) -> Self {
        self.standard_names = standard_names;
        self
    }

    pub fn count(mut self, mode: CountMode) -> Self {
        self.count = mode;
        self
    }

    pub fn restricted_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.restricted_indicator = Some(indicator.into());
        self
    }

    /// `COMPACT` keeps lookup codes; the default `COMPACT-DECODED` expands them.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("Format", Some(self.format.clone())),
            ("SearchType", Some(self.search_type.clone())),
            ("QueryType", Some(self.query_type.clone())),
            ("Query", Some(self.query.clone())),
            ("Class", Some(self.class.clone())),
            ("Limit", self.limit.map(|l| l.to_string())),
            ("Offset", self.offset.map(|o| o.to_string())),
            ("RestrictedIndicator", self.restricted_indicator.clone()),
            (
                "Select",
                (!self.select.is_empty()).then(|| self.select.join(",")),
            ),
            ("StandardNames", self.standard_names.then(|| "1".to_string())),
            ("Count", self.count.param().map(str::to_string)),
        ]
    }
}

/// Out-of-band data from a search response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub reply_code: Option<u32>,
    pub reply_text: Option<String>,
    /// `COUNT Records`: total matches on the server.
    pub count: Option<u64>,
    /// Records handed out so far.
    pub rows: u64,
    pub delimiter: Option<char>,
    /// The server truncated the result at its row limit.
    pub max_rows: bool,
}

/// Pull parser over a COMPACT search body.
pub struct SearchParser<R> {
    compact: CompactReader<R>,
    count: Option<u64>,
    rows: u64,
    max_rows: bool,
}

/// Records streamed from a Search response. Single pass, not restartable.
pub type SearchResults = SearchParser<BufReader<ResponseBody>>;

impl<R: AsyncBufRead + Unpin> SearchParser<R> {
    pub fn new(inner: R) -> Self {
        Self {
            compact: CompactReader::new(inner),
            count: None,
            rows: 0,
            max_rows: false,
        }
    }

    /// Next record; `None` once the response is exhausted.
    pub async fn next(&mut self) -> Result<Option<Record>, RetsError> {
        while let Some(event) = self.compact.next_event().await? {
            match event {
                CompactEvent::Row(record) => {
                    self.rows += 1;
                    return Ok(Some(record));
                }
                CompactEvent::Start { name, attributes } => {
                    if name.eq_ignore_ascii_case("COUNT") {
                        self.count = attributes
                            .iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case("Records"))
                            .and_then(|(_, v)| v.trim().parse().ok());
                    } else if name.eq_ignore_ascii_case("MAXROWS") {
                        self.max_rows = true;
                    }
                }
                CompactEvent::End { .. } => {}
            }
        }
        Ok(None)
    }

    /// Column names from the `COLUMNS` element, empty positions included.
    pub fn columns(&self) -> &[String] {
        self.compact.columns()
    }

    pub fn summary(&self) -> SearchSummary {
        let (reply_code, reply_text) = match self.compact.reply() {
            Some((code, text)) => (Some(code), Some(text.to_string())),
            None => (None, None),
        };
        SearchSummary {
            reply_code,
            reply_text,
            count: self.count,
            rows: self.rows,
            delimiter: reply_code.map(|_| self.compact.delimiter()),
            max_rows: self.max_rows,
        }
    }
}

impl SearchParser<BufReader<ResponseBody>> {
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
