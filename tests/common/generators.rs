// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `proptest` generators for random tree topologies and random command
//! interleavings, used by the invariant checks in `tests/properties.rs`.

use raymond_mutex::node::NodeId;
use raymond_mutex::tree::Tree;
use raymond_mutex::UserCommand;
use proptest::prelude::*;

/// A tree of between 2 and `max_nodes` nodes, built by attaching each new
/// node to a uniformly chosen earlier one. Every such attachment sequence
/// is already a valid spanning tree, so this never needs to retry.
pub fn arb_tree(max_nodes: u32) -> impl Strategy<Value = Tree> {
    (2..=max_nodes).prop_flat_map(|n| {
        let parent_choices: Vec<_> = (1..n).map(|i| 0..i).collect();
        parent_choices
            .prop_map(move |parents| {
                let nodes: Vec<NodeId> = (0..n).map(NodeId).collect();
                let edges: Vec<(NodeId, NodeId)> = parents
                    .into_iter()
                    .enumerate()
                    .map(|(i, parent)| (NodeId(parent), NodeId(i as u32 + 1)))
                    .collect();
                Tree::from_edges(&nodes, &edges, NodeId(0))
                    .expect("attachment sequence always forms a spanning tree")
            })
    })
}

/// One command a test issues at a chosen node: requesting the critical
/// section, or crashing it.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledCommand {
    pub node: u32,
    pub command: UserCommand,
}

fn arb_command() -> impl Strategy<Value = UserCommand> {
    prop_oneof![Just(UserCommand::Request), Just(UserCommand::Crash)]
}

/// A bounded sequence of commands, each targeting a node index modulo the
/// tree's actual size (applied by the caller, which knows `n`).
pub fn arb_commands(max_len: usize) -> impl Strategy<Value = Vec<ScheduledCommand>> {
    prop::collection::vec((0u32..16, arb_command()), 0..=max_len)
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(node, command)| ScheduledCommand { node, command })
                .collect()
        })
}
