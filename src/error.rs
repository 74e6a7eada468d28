// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the node state machine.
//!
//! Precondition violations are bugs in the caller or in message ordering
//! assumptions; they are logged at a high severity and otherwise ignored
//! by the node, so this type is informational rather than fatal.
//! User-command refusals are reported back to the caller and never change
//! node state.

use crate::node::NodeId;
use thiserror::Error;

/// A precondition was violated by a message or a local call.
///
/// Handlers that detect one of these log it and continue running; the node
/// never panics or halts because of protocol-level confusion from a peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("node {0} asked to make an upward request before it was initialized")]
    RequestBeforeInit(NodeId),

    #[error("node {0} received {1} while Crashed; message dropped")]
    DroppedWhileCrashed(NodeId, &'static str),

    #[error("node {0} received {1} out of phase; ignored")]
    OutOfPhase(NodeId, &'static str),
}

/// A user command was refused. These are user-visible but non-fatal: the
/// node remains exactly as it was before the command arrived.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandRefusal {
    #[error("node {0} cannot accept REQUEST while crashed")]
    RequestWhileCrashed(NodeId),

    #[error("node {0} cannot accept CRASH: {1}")]
    CrashRefused(NodeId, &'static str),
}
