// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared test harness: build a [`Tree`], wrap it in a [`SimNetwork`], and
//! expose the core invariants as free functions any test can call after
//! driving the simulation to quiescence.

pub mod generators;
pub mod network;

use network::SimNetwork;
use raymond_mutex::node::{Holder, Node, NodeId, Phase};
use raymond_mutex::{Bootstrap, Config};
use raymond_mutex::tree::Tree;
use std::collections::BTreeMap;
use std::time::Duration;

/// A `Config` with short, test-friendly timers. The virtual clock in
/// [`SimNetwork`] doesn't actually sleep, so these only need to be
/// distinguishable from each other and from the wire delay, not realistic.
pub fn test_config() -> Config {
    Config {
        bootstrap_delay: Duration::from_millis(0),
        critical_section_time: Duration::from_millis(10),
        crash_time: Duration::from_millis(20),
    }
}

/// Build a `SimNetwork` from `tree` and run the bootstrap flood to
/// quiescence, so every node starts the test in `Normal` phase with
/// `holder` set.
pub fn bootstrap(tree: &Tree, config: Config) -> SimNetwork {
    let nodes: BTreeMap<NodeId, Node> = tree
        .nodes()
        .map(|id| {
            let bootstrap = Bootstrap {
                neighbors: tree.neighbors(id).to_vec(),
                is_starter: tree.is_starter(id),
            };
            (id, Node::new(id, &bootstrap, config))
        })
        .collect();

    let mut net = SimNetwork::new(nodes);
    net.start_bootstrap(tree.starter());
    net.run_until_quiescent();
    net
}

/// Safety: at most one node is executing its critical section.
pub fn safety_holds(net: &SimNetwork) -> bool {
    net.nodes.values().filter(|n| n.using()).count() <= 1
}

/// Single token: in any `Normal` snapshot, exactly one node has
/// `holder == self`, and following `holder` edges from every other node
/// reaches it.
pub fn single_token_holds(net: &SimNetwork) -> bool {
    let normal: Vec<&Node> = net
        .nodes
        .values()
        .filter(|n| matches!(n.phase(), Phase::Normal))
        .collect();
    if normal.is_empty() {
        // Nothing to check while every node is mid-crash/recovery.
        return true;
    }

    let holders: Vec<&Node> = normal
        .iter()
        .copied()
        .filter(|n| n.holder() == Some(Holder::SelfHeld))
        .collect();
    if holders.len() != 1 {
        return false;
    }

    for node in &normal {
        let mut current = node.id;
        let mut steps = 0;
        loop {
            if current == holders[0].id {
                break;
            }
            steps += 1;
            if steps > net.nodes.len() {
                return false; // cycle or dangling edge
            }
            let Some(n) = net.nodes.get(&current) else { return false };
            match n.holder() {
                Some(Holder::SelfHeld) => return false, // reached a different root
                Some(Holder::Neighbor(next)) => current = next,
                None => return false,
            }
        }
    }
    true
}

/// Queue consistency: if `asked`, then `request_queue` is non-empty and
/// `holder != self`.
pub fn queue_consistency_holds(net: &SimNetwork) -> bool {
    net.nodes.values().all(|n| {
        if !matches!(n.phase(), Phase::Normal) {
            return true;
        }
        if n.asked() {
            !n.request_queue().is_empty() && n.holder() != Some(Holder::SelfHeld)
        } else {
            true
        }
    })
}

pub fn all_invariants_hold(net: &SimNetwork) -> bool {
    safety_holds(net) && single_token_holds(net) && queue_consistency_holds(net)
}
