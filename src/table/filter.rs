//! Live row filtering over an immutable [`Table`].
//!
//! A query is interpreted as a case-insensitive regular expression. Queries
//! that do not compile are matched as plain case-insensitive substrings, so
//! filtering never fails while the user is still typing.

use crate::table::Table;
use regex::{Regex, RegexBuilder};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Compiled form of a query.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Empty or whitespace-only query: every row is visible.
    All,
    Pattern(Regex),
    /// Lowercased literal, used when the query is not a valid pattern.
    Literal(String),
}

impl Matcher {
    pub fn compile(query: &str) -> Self {
        if query.trim().is_empty() {
            return Matcher::All;
        }

        match RegexBuilder::new(query).case_insensitive(true).build() {
            Ok(regex) => Matcher::Pattern(regex),
            Err(err) => {
                debug!("Query {:?} is not a valid pattern, matching literally: {}", query, err);
                Matcher::Literal(query.to_lowercase())
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Pattern(regex) => regex.is_match(text),
            Matcher::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Matcher::Literal(_))
    }
}

pub struct FilterEngine;

impl FilterEngine {
    /// Indices of the rows in which any cell matches `query`, in table order.
    pub fn apply(table: &Table, query: &str) -> Vec<usize> {
        let matcher = Matcher::compile(query);
        Self::apply_matcher(table, &matcher)
    }

    pub fn apply_matcher(table: &Table, matcher: &Matcher) -> Vec<usize> {
        if let Matcher::All = matcher {
            return (0..table.row_count()).collect();
        }

        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, record)| record.cells().iter().any(|cell| matcher.is_match(cell)))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Current query and the rows it leaves visible.
#[derive(Debug, Clone)]
pub struct FilterState {
    query: String,
    matcher: Matcher,
    visible: Vec<usize>,
}

impl FilterState {
    pub fn new(table: &Table) -> Self {
        Self {
            query: String::new(),
            matcher: Matcher::All,
            visible: (0..table.row_count()).collect(),
        }
    }

    /// Recomputes the visible rows if `query` differs from the current one.
    pub fn set_query(&mut self, table: &Table, query: &str) -> &[usize] {
        if query != self.query {
            let start = Instant::now();
            self.matcher = Matcher::compile(query);
            self.visible = FilterEngine::apply_matcher(table, &self.matcher);
            self.query = query.to_string();
            trace!(
                "Filter {:?} -> {} of {} rows in {:?}",
                query,
                self.visible.len(),
                table.row_count(),
                start.elapsed()
            );
        }
        &self.visible
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn visible(&self) -> &[usize] {
        &self.visible
    }
}

/// Coalesces bursts of query changes into the latest one.
///
/// Hosts push every change and only apply the query returned by
/// [`QueryDebouncer::take_ready`]; intermediate queries are dropped.
#[derive(Debug, Clone)]
pub struct QueryDebouncer {
    quiet_period: Duration,
    pending: Option<(String, Instant)>,
}

impl QueryDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    pub fn push(&mut self, query: impl Into<String>, now: Instant) {
        self.pending = Some((query.into(), now));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the latest query once no change arrived for the quiet period.
    pub fn take_ready(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.quiet_period => {
                self.pending.take().map(|(query, _)| query)
            }
            _ => None,
        }
    }

    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(query, _)| query)
    }
}
