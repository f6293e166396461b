//! The reference graph.
//!
//! A [Web] is a directed graph with one node per unique (normalized) title and an edge from each
//! track to every title it references. Node indices are handed out in discovery order and never
//! change, so they double as the node identity in every export.
//!
//! Tracks arrive through [Web::append], typically once per source. Titles a source scans as
//! subjects are remembered; when a later append scans the same subject again, the caller must
//! have said what to do about it through a [DuplicatePolicy]. Anything else is a
//! [NsndError::DuplicateSubject], because silently merging two sources' opinions of one track is
//! exactly how bad data gets in.

use petgraph::{graph::NodeIndex, visit::EdgeRef, Direction, Graph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{codec::CROSS_REFERENCE_PLACEHOLDERS, error::NsndError, properties::Track};

pub mod export;
pub mod snapshot;

pub use snapshot::{NodeSnapshot, SnapshotConfig};


/// What to do when an appended track's subject was already scanned by an earlier track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePolicy {
    /// The new track's references replace the old ones.
    #[serde(default)]
    pub override_on_duplicate: BTreeSet<String>,
    /// The new track is ignored.
    #[serde(default)]
    pub skip_on_duplicate: BTreeSet<String>,
}

impl DuplicatePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overriding<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.override_on_duplicate
            .extend(titles.into_iter().map(Into::into));
        self
    }

    pub fn skipping<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_on_duplicate
            .extend(titles.into_iter().map(Into::into));
        self
    }

    /// A title may not be both overridden and skipped.
    pub fn validate(&self) -> Result<(), NsndError> {
        let overlap: Vec<&str> = self
            .override_on_duplicate
            .intersection(&self.skip_on_duplicate)
            .map(String::as_str)
            .collect();
        if overlap.is_empty() {
            Ok(())
        } else {
            Err(NsndError::Config(format!(
                "Titles both overridden and skipped on duplicate: {}",
                overlap.join(", ")
            )))
        }
    }
}

/// Counts of what one [Web::append] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendStats {
    pub tracks: usize,
    pub new_nodes: usize,
    pub edges_added: usize,
    pub overridden: usize,
    pub skipped: usize,
    pub self_references: usize,
    pub duplicate_edges: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "WebDump", into = "WebDump")]
pub struct Web {
    graph: Graph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
    discovered: BTreeSet<NodeIndex>,
}

/// The structural serialization of a [Web]. The title index is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WebDump {
    graph: Graph<String, ()>,
    discovered: BTreeSet<usize>,
}

impl From<Web> for WebDump {
    fn from(web: Web) -> Self {
        WebDump {
            discovered: web.discovered.iter().map(|idx| idx.index()).collect(),
            graph: web.graph,
        }
    }
}

impl TryFrom<WebDump> for Web {
    type Error = NsndError;

    fn try_from(dump: WebDump) -> Result<Self, Self::Error> {
        let mut index = BTreeMap::new();
        for idx in dump.graph.node_indices() {
            let title = &dump.graph[idx];
            if index.insert(title.clone(), idx).is_some() {
                return Err(NsndError::Serialization(format!(
                    "Web dump names \"{title}\" more than once"
                )));
            }
        }
        let node_count = dump.graph.node_count();
        if let Some(bad) = dump.discovered.iter().find(|i| **i >= node_count) {
            return Err(NsndError::Serialization(format!(
                "Web dump marks node {bad} as discovered but only has {node_count} nodes"
            )));
        }
        Ok(Web {
            discovered: dump.discovered.into_iter().map(NodeIndex::new).collect(),
            graph: dump.graph,
            index,
        })
    }
}

impl Web {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The index of `title`, creating a node for it if it is new.
    pub fn get_or_create_node(&mut self, title: &str) -> usize {
        if let Some(idx) = self.index.get(title) {
            return idx.index();
        }
        tracing::debug!("Discovered a new song, \"{}\"", title);
        let idx = self.graph.add_node(title.to_string());
        self.index.insert(title.to_string(), idx);
        idx.index()
    }

    pub fn node_index(&self, title: &str) -> Option<usize> {
        self.index.get(title).map(|idx| idx.index())
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.graph
            .node_weight(NodeIndex::new(index))
            .map(String::as_str)
    }

    /// Titles in index order.
    pub fn titles(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    /// Every edge as `(source, target)` indices.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index(), edge.target().index()))
    }

    pub fn has_edge(&self, source: usize, target: usize) -> bool {
        self.graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(target))
            .is_some()
    }

    /// Whether the node was the subject of an appended track, rather than only referenced.
    pub fn is_discovered(&self, index: usize) -> bool {
        self.discovered.contains(&NodeIndex::new(index))
    }

    /// Indices of nodes that were only ever referenced, in index order.
    pub fn unknown(&self) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .node_indices()
            .filter(|idx| !self.discovered.contains(idx))
            .map(|idx| idx.index())
    }

    /// The titles `index` references, in the order they were added.
    pub fn references(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Outgoing)
    }

    /// The titles that reference `index`, in the order they were added.
    pub fn referrers(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Incoming)
    }

    pub fn in_degree(&self, index: usize) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(index), Direction::Incoming)
            .count()
    }

    pub fn out_degree(&self, index: usize) -> usize {
        self.graph
            .edges_directed(NodeIndex::new(index), Direction::Outgoing)
            .count()
    }

    fn neighbors(&self, index: usize, dir: Direction) -> Vec<usize> {
        let idx = NodeIndex::new(index);
        if self.graph.node_weight(idx).is_none() {
            return Vec::new();
        }
        // petgraph walks adjacency lists newest first.
        let mut found: Vec<usize> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| n.index())
            .collect();
        found.reverse();
        found
    }

    /// Adds `tracks` to the web.
    ///
    /// The policy is checked before anything changes, and the append is all or nothing: if any
    /// track is an undeclared duplicate subject, the web is left exactly as it was.
    #[tracing::instrument(skip_all)]
    pub fn append(
        &mut self,
        tracks: &[Track],
        policy: &DuplicatePolicy,
    ) -> Result<AppendStats, NsndError> {
        policy.validate()?;
        let mut staged = self.clone();
        let stats = staged.append_tracks(tracks, policy)?;
        *self = staged;
        tracing::info!(
            "Appended {} tracks: {} new nodes, {} edges added, {} overridden, {} skipped",
            stats.tracks,
            stats.new_nodes,
            stats.edges_added,
            stats.overridden,
            stats.skipped
        );
        Ok(stats)
    }

    fn append_tracks(
        &mut self,
        tracks: &[Track],
        policy: &DuplicatePolicy,
    ) -> Result<AppendStats, NsndError> {
        let nodes_before = self.node_count();
        let mut stats = AppendStats::default();
        for track in tracks {
            // Subjects and references are matched by the same trimmed text.
            let title = track.title.trim();
            if title.is_empty() {
                tracing::debug!("Skipping a null song");
                continue;
            }
            let subject = NodeIndex::new(self.get_or_create_node(title));
            if self.discovered.contains(&subject) {
                if policy.override_on_duplicate.contains(title) {
                    tracing::debug!("Overriding the references of \"{}\"", title);
                    self.clear_references(subject);
                    stats.overridden += 1;
                } else if policy.skip_on_duplicate.contains(title) {
                    tracing::debug!("Skipping duplicate \"{}\"", title);
                    stats.skipped += 1;
                    continue;
                } else {
                    tracing::error!("\"{}\" was scanned twice", title);
                    return Err(NsndError::DuplicateSubject {
                        title: title.to_string(),
                    });
                }
            } else {
                self.discovered.insert(subject);
            }
            stats.tracks += 1;

            for reference in track.references.iter() {
                let reference = reference.trim();
                if reference.is_empty() || CROSS_REFERENCE_PLACEHOLDERS.contains(&reference) {
                    continue;
                }
                let target = NodeIndex::new(self.get_or_create_node(reference));
                if target == subject {
                    stats.self_references += 1;
                    continue;
                }
                if self.graph.find_edge(subject, target).is_some() {
                    stats.duplicate_edges += 1;
                    continue;
                }
                self.graph.add_edge(subject, target, ());
                stats.edges_added += 1;
                tracing::debug!(
                    "Followed a reference from \"{}\" to \"{}\"",
                    title,
                    reference
                );
            }
        }
        stats.new_nodes = self.node_count() - nodes_before;
        Ok(stats)
    }

    fn clear_references(&mut self, subject: NodeIndex) {
        while let Some(edge) = self
            .graph
            .edges_directed(subject, Direction::Outgoing)
            .next()
            .map(|edge| edge.id())
        {
            self.graph.remove_edge(edge);
        }
    }
}
