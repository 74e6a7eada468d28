// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The recovery reasoner: reconciles conflicting neighbor advisories into
//! a fresh, consistent local state after a crash.
//!
//! This is deliberately a standalone module, separate from the per-phase
//! handlers in [`super`], the same way `unsafe_recovery.rs` in
//! `raftstore` is kept apart from the ordinary peer message handlers:
//! reconciling conflicting evidence about distributed state after a crash
//! is a different kind of reasoning from normal-path message handling, and
//! reads better on its own.
//!
//! Advisory collection is a `BTreeMap` keyed by neighbor; iterating it
//! gives a deterministic neighbor order, which matters for reproducible
//! tests.

use super::{Holder, Node, NodeId};
use crate::node::output::{NodeEvent, Output};
use std::collections::BTreeMap;

/// One neighbor's report of the state of its edge to the recovering node,
/// collected in response to a `Restart` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advisory {
    pub x_is_holder_of_y: bool,
    pub x_in_y_request_queue: bool,
    pub y_asked: bool,
}

/// Auxiliary state that only exists while a node is `Recovering`: the
/// advisories collected so far, keyed by the neighbor that sent them.
#[derive(Debug, Default)]
pub struct RecoveryState {
    pub advise_buffer: BTreeMap<NodeId, Advisory>,
}

impl RecoveryState {
    pub fn is_complete(&self, neighbors: &[NodeId]) -> bool {
        neighbors.iter().all(|n| self.advise_buffer.contains_key(n))
    }
}

/// Run the reconciliation pass exactly once, on a node that has collected
/// one advisory from every neighbor.
///
/// Self is appended to `request_queue` at most once per reconciliation
/// pass regardless of how many neighbors report a stale
/// `x_is_holder_of_y == false` (tracked with a local flag, scoped to this
/// call — a fresh `UserRequest` that arrived and was queued *during* the
/// `Recovering` window is a distinct, already legitimate queue entry and
/// is left alone). `PrivilegeMessage` is allowed to set `holder := self`
/// while `Recovering` but not while `Crashed`, so `holds_privilege` here
/// is simply "is `holder` already `SelfHeld` when reconciliation starts".
pub fn reconcile(node: &mut Node, buffer: BTreeMap<NodeId, Advisory>) -> Output {
    node.using = false;
    node.asked = false;

    let holds_privilege = matches!(node.holder, Some(Holder::SelfHeld));
    if !holds_privilege {
        // Overwritten below unless no neighbor claims the direction toward
        // the token, which would itself indicate a missing advisory.
        node.holder = Some(Holder::SelfHeld);
    }

    let mut appended_self = false;
    for (&from, advisory) in &buffer {
        if !advisory.x_is_holder_of_y {
            if holds_privilege {
                // `from`'s view predates the `Privilege` message that
                // already delivered the token to us through it.
                node.asked = true;
                if !appended_self {
                    node.request_queue.push_back(node.id);
                    appended_self = true;
                }
            } else {
                node.holder = Some(Holder::Neighbor(from));
                if advisory.x_in_y_request_queue {
                    node.asked = true;
                    if !appended_self {
                        node.request_queue.push_back(node.id);
                        appended_self = true;
                    }
                }
            }
        } else if advisory.y_asked && !node.request_queue.contains(&from) {
            node.request_queue.push_back(from);
        }
    }

    let event = NodeEvent::RecoveryCompleted {
        holder: node.holder.expect("holder always set by reconciliation"),
        asked: node.asked,
        using: node.using,
        request_queue: node.request_queue.clone(),
    };

    node.phase = super::Phase::Normal;

    Output::none()
        .event(event)
        .merge(node.assign_privilege())
        .merge(node.make_request())
}
