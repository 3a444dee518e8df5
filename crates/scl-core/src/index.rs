//! In-memory need index and occurrence scanning.

use crate::error::Result;
use crate::need::Need;
use crate::snapshot::NeedsSnapshot;
use crate::text::{LineIndex, Span};
use aho_corasick::AhoCorasick;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Every place a need ID appears in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedOccurrence {
    pub need: Arc<Need>,
    pub spans: Vec<Span>,
}

/// Lookup table from need ID to record for one loaded snapshot.
///
/// The index is immutable: a reload builds a new index and swaps it in
/// whole. Construction also builds an Aho-Corasick automaton over all IDs,
/// so scanning a document is linear in its length regardless of how many
/// needs are known.
///
/// # Examples
///
/// ```
/// use scl_core::{Need, NeedIndex};
///
/// let index = NeedIndex::from_needs([
///     Need { id: "REQ_001".into(), ..Need::default() },
///     Need { id: "REQ_002".into(), ..Need::default() },
/// ]);
///
/// let occurrences = index.scan("see REQ_002 and REQ_002");
/// assert_eq!(occurrences.len(), 1);
/// assert_eq!(occurrences[0].need.id, "REQ_002");
/// assert_eq!(occurrences[0].spans.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct NeedIndex {
    needs: BTreeMap<String, Arc<Need>>,
    /// Needs in automaton pattern order.
    patterns: Vec<Arc<Need>>,
    matcher: Option<AhoCorasick>,
}

impl NeedIndex {
    /// An index with no needs; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an index from the `needs` map of a snapshot version.
    ///
    /// The map key is the authoritative ID; a record whose own `id` differs
    /// is rewritten to match its key.
    pub fn new(needs: BTreeMap<String, Need>) -> Self {
        let needs: BTreeMap<String, Arc<Need>> = needs
            .into_iter()
            .map(|(id, mut need)| {
                if need.id != id {
                    need.id.clone_from(&id);
                }
                (id, Arc::new(need))
            })
            .collect();

        let patterns: Vec<Arc<Need>> = needs
            .values()
            .filter(|need| !need.id.is_empty())
            .map(Arc::clone)
            .collect();

        let matcher = if patterns.is_empty() {
            None
        } else {
            match AhoCorasick::new(patterns.iter().map(|need| need.id.as_str())) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    tracing::warn!(
                        pattern_count = patterns.len(),
                        "need ID automaton build failed, falling back to per-ID search ({e})"
                    );
                    None
                }
            }
        };

        Self {
            needs,
            patterns,
            matcher,
        }
    }

    /// Builds an index keyed by each record's own `id`.
    pub fn from_needs(needs: impl IntoIterator<Item = Need>) -> Self {
        Self::new(
            needs
                .into_iter()
                .map(|need| (need.id.clone(), need))
                .collect(),
        )
    }

    /// Reads the snapshot at `path` and indexes the needs of `version`.
    pub fn load(path: &Path, version: &str) -> Result<Self> {
        let snapshot = NeedsSnapshot::from_path(path)?;
        let version = snapshot.into_version(version, path)?;
        Ok(Self::new(version.needs))
    }

    pub fn len(&self) -> usize {
        self.needs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.needs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Need>> {
        self.needs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.needs.contains_key(id)
    }

    /// Needs in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Need>> {
        self.needs.values()
    }

    /// Finds every occurrence of every known ID in `content`.
    ///
    /// Matching is case-sensitive plain substring search: an ID embedded in
    /// a longer token still matches, and different IDs may overlap. For each
    /// single ID, matches are taken left to right without overlap. The result
    /// lists needs in ascending ID order and omits needs that do not occur.
    pub fn scan(&self, content: &str) -> Vec<NeedOccurrence> {
        let lines = LineIndex::new(content);
        let spans = match &self.matcher {
            Some(matcher) => self.scan_automaton(matcher, content, &lines),
            None => self.scan_naive(content, &lines),
        };

        self.patterns
            .iter()
            .zip(spans)
            .filter(|(_, spans)| !spans.is_empty())
            .map(|(need, spans)| NeedOccurrence {
                need: Arc::clone(need),
                spans,
            })
            .collect()
    }

    fn scan_automaton(
        &self,
        matcher: &AhoCorasick,
        content: &str,
        lines: &LineIndex<'_>,
    ) -> Vec<Vec<Span>> {
        let mut spans = vec![Vec::new(); self.patterns.len()];
        let mut last_end = vec![0usize; self.patterns.len()];

        // Overlapping matches arrive ordered by end offset, which for a
        // single fixed-length pattern is also start order.
        for found in matcher.find_overlapping_iter(content) {
            let pattern = found.pattern().as_usize();
            if found.start() < last_end[pattern] {
                continue;
            }
            last_end[pattern] = found.end();
            spans[pattern].push(lines.span(found.start(), found.end()));
        }

        spans
    }

    fn scan_naive(&self, content: &str, lines: &LineIndex<'_>) -> Vec<Vec<Span>> {
        self.patterns
            .iter()
            .map(|need| {
                content
                    .match_indices(need.id.as_str())
                    .map(|(start, matched)| lines.span(start, start + matched.len()))
                    .collect()
            })
            .collect()
    }
}
