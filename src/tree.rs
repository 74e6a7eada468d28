// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology construction, kept small and separate from the protocol core
//! so that core logic never has to know how a tree was assembled.
//!
//! `Tree::from_edges` builds an arbitrary tree from a node set and an edge
//! list; `line` and `star` are convenience constructors for the two
//! topologies used throughout this crate's tests.

use crate::node::NodeId;
use std::collections::BTreeMap;

/// An undirected tree: a fixed adjacency list plus a designated starter.
///
/// Construction validates only that the edge set actually forms a tree
/// (connected, `|edges| == |nodes| - 1`); it does not validate that
/// `starter` is a member, since callers build `starter` from the same node
/// set they pass in.
#[derive(Debug, Clone)]
pub struct Tree {
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    starter: NodeId,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree must have at least one node")]
    Empty,
    #[error("edge set has {0} edges for {1} nodes; a tree needs exactly {1} - 1")]
    WrongEdgeCount(usize, usize),
    #[error("tree is not connected")]
    Disconnected,
    #[error("starter {0} is not one of the tree's nodes")]
    UnknownStarter(NodeId),
}

impl Tree {
    /// Build a tree from an explicit edge list. Each edge is undirected;
    /// duplicating an edge in both directions is harmless (the adjacency
    /// list dedups).
    pub fn from_edges(
        nodes: &[NodeId],
        edges: &[(NodeId, NodeId)],
        starter: NodeId,
    ) -> Result<Tree, TreeError> {
        if nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        if !nodes.contains(&starter) {
            return Err(TreeError::UnknownStarter(starter));
        }

        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> =
            nodes.iter().map(|&n| (n, Vec::new())).collect();

        let mut unique_edges = std::collections::BTreeSet::new();
        for &(a, b) in edges {
            let key = if a.0 <= b.0 { (a, b) } else { (b, a) };
            unique_edges.insert(key);
        }

        if unique_edges.len() != nodes.len() - 1 {
            return Err(TreeError::WrongEdgeCount(unique_edges.len(), nodes.len()));
        }

        for (a, b) in unique_edges {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }

        let tree = Tree { adjacency, starter };
        if !tree.is_connected() {
            return Err(TreeError::Disconnected);
        }
        Ok(tree)
    }

    /// A line of `n` nodes `0 - 1 - 2 - ... - (n-1)`, starter at one end.
    pub fn line(n: u32, starter: NodeId) -> Result<Tree, TreeError> {
        let nodes: Vec<NodeId> = (0..n).map(NodeId).collect();
        let edges: Vec<_> = (0..n.saturating_sub(1))
            .map(|i| (NodeId(i), NodeId(i + 1)))
            .collect();
        Tree::from_edges(&nodes, &edges, starter)
    }

    /// A star with `center` connected to `leaves` other nodes, starter at
    /// the center.
    pub fn star(center: NodeId, leaves: &[NodeId]) -> Result<Tree, TreeError> {
        let mut nodes = vec![center];
        nodes.extend_from_slice(leaves);
        let edges: Vec<_> = leaves.iter().map(|&l| (center, l)).collect();
        Tree::from_edges(&nodes, &edges, center)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn starter(&self) -> NodeId {
        self.starter
    }

    pub fn is_starter(&self, node: NodeId) -> bool {
        node == self.starter
    }

    fn is_connected(&self) -> bool {
        let Some(&start) = self.adjacency.keys().next() else {
            return true;
        };
        let mut seen = std::collections::BTreeSet::new();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if seen.insert(n) {
                stack.extend(self.neighbors(n).iter().copied());
            }
        }
        seen.len() == self.adjacency.len()
    }
}
