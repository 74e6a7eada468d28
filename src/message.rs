// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire messages.
//!
//! `Protocol` is what travels between nodes over the tree edges, carried in
//! an [`Envelope`]. `SelfMsg` is delivered by a node to itself, either
//! immediately after a state change (never observed here — everything that
//! would be a same-tick recursive call is instead modeled as a direct
//! method call, see [`crate::node::Node`]) or after a timer, via
//! [`crate::transport::Transport::schedule_self`].

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// A message sent from one node to a neighbor over a tree edge.
///
/// Every variant carries the sending node's id, so a receiver can log
/// and dispatch without consulting the envelope it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// Floods outward from the starter; tells the receiver which edge the
    /// token initially lies behind.
    Initialize { sender: NodeId },

    /// A request for the privilege, forwarded up the tree.
    Request { sender: NodeId },

    /// The privilege itself, forwarded down the tree.
    Privilege { sender: NodeId },

    /// Sent by a node entering `Recovering` to every neighbor.
    Restart { sender: NodeId },

    /// A neighbor's reply to `Restart`, describing its view of the edge to
    /// the recovering node.
    Advise {
        sender: NodeId,
        x_is_holder_of_y: bool,
        x_in_y_request_queue: bool,
        y_asked: bool,
    },
}

impl Protocol {
    pub fn kind(&self) -> &'static str {
        match self {
            Protocol::Initialize { .. } => "Initialize",
            Protocol::Request { .. } => "Request",
            Protocol::Privilege { .. } => "Privilege",
            Protocol::Restart { .. } => "Restart",
            Protocol::Advise { .. } => "Advise",
        }
    }
}

/// A message a node schedules for delivery to itself, optionally after a
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfMsg {
    /// Delivered `CRITICAL_SECTION_TIME` after a node starts using its
    /// critical section.
    ExitCriticalSection,

    /// Delivered `CRASH_TIME` after a node accepts a CRASH command.
    Recovery,
}

/// The two commands the interactive driver can inject at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Request,
    Crash,
}

/// Delivered once to each node by the orchestrator at startup.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub neighbors: Vec<NodeId>,
    pub is_starter: bool,
}
