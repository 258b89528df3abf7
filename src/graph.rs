//! Projects the active entries and their citation edges into a filtered
//! node/edge graph. The projection is rebuilt in full on every call; at
//! journal scale there is nothing to gain from incremental maintenance.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{DateRange, Entry, EntryId, HierarchicalTag};

/// Hint for the consuming renderer; has no effect on projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphLayout {
    #[default]
    Force,
    Radial,
    Grid,
}

#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    pub date_range: DateRange,
    /// OR semantics: an entry survives if it carries any of these tag ids.
    /// Empty means no tag filtering.
    pub selected_tag_ids: Vec<String>,
    /// When false, entries with no visible citation edges are dropped.
    pub show_isolated: bool,
    pub layout: GraphLayout,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: EntryId,
    pub title: String,
    pub date: NaiveDate,
    pub tags: Vec<HierarchicalTag>,
    pub cited_entries: Vec<EntryId>,
    /// Number of surviving entries that cite this node.
    pub citation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: EntryId,
    pub target: EntryId,
}

#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Build the graph for the given filter.
///
/// Isolation and citation counts are computed against the filtered set, so a
/// node is isolated relative to what is visible, not the whole corpus.
/// Edges to filtered-out or nonexistent targets are dropped silently.
pub fn project(entries: &[Entry], filter: &GraphFilter) -> CitationGraph {
    let mut visible: Vec<&Entry> = entries
        .iter()
        .filter(|e| filter.date_range.contains(e.date))
        .filter(|e| {
            filter.selected_tag_ids.is_empty()
                || filter.selected_tag_ids.iter().any(|id| e.has_tag(id))
        })
        .collect();

    if !filter.show_isolated {
        let ids: HashSet<&str> = visible.iter().map(|e| e.id.as_str()).collect();
        let mut incoming: HashSet<&str> = HashSet::new();
        for entry in &visible {
            for cited in &entry.cited_entries {
                if ids.contains(cited.as_str()) {
                    incoming.insert(cited.as_str());
                }
            }
        }
        visible.retain(|e| {
            let has_outgoing = e
                .cited_entries
                .iter()
                .any(|c| ids.contains(c.as_str()) && c != &e.id);
            has_outgoing || incoming.contains(e.id.as_str())
        });
    }

    let surviving: HashSet<&str> = visible.iter().map(|e| e.id.as_str()).collect();
    let mut citation_counts: HashMap<&str, usize> = HashMap::new();
    let mut edges = Vec::new();
    for entry in &visible {
        for cited in &entry.cited_entries {
            if surviving.contains(cited.as_str()) {
                *citation_counts.entry(cited.as_str()).or_insert(0) += 1;
                edges.push(GraphEdge {
                    source: entry.id.clone(),
                    target: cited.clone(),
                });
            }
        }
    }

    let nodes = visible
        .iter()
        .map(|e| GraphNode {
            id: e.id.clone(),
            title: e.title.clone(),
            date: e.date,
            tags: e.tags.clone(),
            cited_entries: e.cited_entries.clone(),
            citation_count: *citation_counts.get(e.id.as_str()).unwrap_or(&0),
        })
        .collect();

    CitationGraph { nodes, edges }
}
