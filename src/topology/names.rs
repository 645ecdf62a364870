//! Canonical node naming.
//!
//! GML labels are free text: spaces, dots, non-ASCII and duplicates are all
//! common in Topology Zoo files. Emulator identifiers must be unique and
//! match `^[A-Za-z][A-Za-z0-9_-]*$`, so every vertex is named after its
//! position instead: vertex `i` becomes switch `s<i>` and host `h<i>`.

use crate::gml_parser::Graph;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("Invalid identifier regex"));

/// Whether `name` is acceptable as an emulator node identifier
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn switch_name(index: usize) -> String {
    format!("s{index}")
}

pub fn host_name(index: usize) -> String {
    format!("h{index}")
}

/// Bijection between graph vertices and indices `0..|V|`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    keys: Vec<String>,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl NameMap {
    /// Number vertices in the order the graph yields them. No sorting: the
    /// loader's order is authoritative, so a file always maps the same way.
    pub fn assign(graph: &Graph) -> Self {
        let mut map = NameMap::default();
        for (i, vertex) in graph.vertices().iter().enumerate() {
            map.keys.push(vertex.key.clone());
            map.labels.push(vertex.label.clone());
            map.index.insert(vertex.key.clone(), i);
        }
        log::debug!("Assigned canonical names to {} vertices", map.len());
        map
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the vertex with the given GML key
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// GML key of vertex `index`
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    /// Original label of vertex `index`
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// `(index, key, label)` for every vertex, in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.keys
            .iter()
            .zip(&self.labels)
            .enumerate()
            .map(|(i, (key, label))| (i, key.as_str(), label.as_str()))
    }
}
