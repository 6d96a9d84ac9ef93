//! Project hierarchy reconstruction and path resolution.
//!
//! The server hands back projects as a flat list where each record only
//! carries a nullable parent id. `Forest` rebuilds the tree as an index-based
//! arena: nodes live in one `Vec`, parent/child links are integer indices,
//! and an id map gives O(1) lookup. All traversal is iterative, so deeply
//! nested hierarchies cannot blow the stack.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::contract::ProjectRecord;

const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace filesystem-unsafe characters (and `;`) with underscores.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == ';' || INVALID_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Short display label for a project: everything after the first `/` of the
/// raw name is dropped, the remainder trimmed, then sanitized.
pub fn short_label(raw: &str) -> String {
    let head = raw.split('/').next().unwrap_or("").trim();
    sanitize(head)
}

#[derive(Debug)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// The reconstructed project tree(s). Built once per run, never mutated
/// afterwards.
#[derive(Debug)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Forest {
    /// Build the forest from a flat listing.
    ///
    /// Records whose parent id does not resolve become additional roots.
    /// Duplicate ids are not rejected: the id index is last-write-wins, which
    /// mirrors the listing snapshot being treated as authoritative.
    pub fn build(records: Vec<ProjectRecord>) -> Self {
        let mut nodes = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut raw_parents = Vec::with_capacity(records.len());

        for rec in records {
            let i = nodes.len();
            index.insert(rec.id.clone(), i);
            raw_parents.push(rec.parent_id);
            nodes.push(Node {
                id: rec.id,
                name: short_label(&rec.name),
                depth: 0,
                parent: None,
                children: Vec::new(),
            });
        }

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = raw_parents[i]
                .as_deref()
                .and_then(|pid| index.get(pid).copied())
                .filter(|&p| p != i);
            match parent {
                Some(p) => {
                    nodes[i].parent = Some(p);
                    nodes[p].children.push(i);
                }
                None => roots.push(i),
            }
        }

        // Depths are assigned top-down from the roots so the invariant
        // depth(child) = depth(parent) + 1 holds regardless of input order.
        let mut stack: Vec<usize> = roots.clone();
        while let Some(i) = stack.pop() {
            let depth = nodes[i].depth;
            let children = nodes[i].children.clone();
            for child in children {
                nodes[child].depth = depth + 1;
                stack.push(child);
            }
        }

        Forest {
            nodes,
            roots,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        match self.index.get(id) {
            Some(&i) => self.nodes[i].children.iter().map(|&c| &self.nodes[c]).collect(),
            None => Vec::new(),
        }
    }

    /// Resolve the directory path for a node: the sanitized names from its
    /// root down to the node itself, joined under `base`. Returns `None` when
    /// the id is unknown; the caller decides the policy for unmapped content.
    pub fn resolve_path(&self, target_id: &str, base: &Path) -> Option<PathBuf> {
        let mut i = *self.index.get(target_id)?;
        let mut segments = vec![self.nodes[i].name.as_str()];
        while let Some(p) = self.nodes[i].parent {
            // The listing is remote input and may carry a parent cycle; a
            // valid chain never has more segments than there are nodes.
            if segments.len() > self.nodes.len() {
                return None;
            }
            segments.push(self.nodes[p].name.as_str());
            i = p;
        }

        let mut path = base.to_path_buf();
        for segment in segments.iter().rev() {
            path.push(segment);
        }
        Some(path)
    }

    /// Log the whole tree at debug level, indented by depth.
    pub fn trace_tree(&self) {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            debug!(
                id = %node.id,
                depth = node.depth,
                "{}- {}",
                "  ".repeat(node.depth),
                node.name
            );
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }
}
