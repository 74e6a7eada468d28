// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The actor transport primitive, realized over `tokio` channels.
//!
//! The core state machine in [`crate::node`] never touches this module: it
//! only ever names peers by [`crate::node::NodeId`] and returns the
//! messages it wants sent in its `Output`. Resolving a `NodeId` to an
//! actual destination, and actually delivering bytes, is entirely the
//! transport's job — the same split `bootstore::schemes::v0::Fsm`'s doc
//! comment describes: "This FSM assumes a network layer above it that can
//! map peer IDs ... to TCP sockets."
//!
//! `tokio::sync::mpsc::UnboundedSender` already gives FIFO delivery per
//! sender/receiver pair with no loss or duplication as long as the
//! receiving task is alive, which is exactly the delivery contract this
//! protocol needs.

use crate::message::{Bootstrap, Protocol, SelfMsg, UserCommand};
use crate::node::NodeId;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// A message delivered to a node's mailbox, wrapping wire messages next to
/// the locally-originated ones (timers, user commands, bootstrap).
#[derive(Debug, Clone)]
pub enum Mailbox {
    Wire(Envelope),
    SelfMsg(SelfMsg),
    User(UserCommand),
    Bootstrap(Bootstrap),
}

/// A message received over a tree edge, tagged with its sender for
/// dispatch and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub from: NodeId,
    pub msg: Protocol,
}

/// An opaque, cloneable handle usable to reach one peer's mailbox.
///
/// Equality and ordering are by [`NodeId`] alone, never by the channel
/// endpoint — two `PeerHandle`s naming the same node compare equal even if
/// they wrap distinct (but co-located) sender clones: peer identity only
/// needs equality and hashability, not transport internals.
#[derive(Clone)]
pub struct PeerHandle {
    id: NodeId,
    tx: mpsc::UnboundedSender<Mailbox>,
}

impl PeerHandle {
    pub fn new(id: NodeId, tx: mpsc::UnboundedSender<Mailbox>) -> Self {
        PeerHandle { id, tx }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Fire-and-forget send. Errors (peer task gone) are swallowed: a
    /// crashed-and-exited peer is indistinguishable, from the sender's
    /// point of view, from one whose handler drops the message on the
    /// floor.
    fn deliver(&self, msg: Mailbox) {
        let _ = self.tx.send(msg);
    }

    /// Inject a user command — used by the interactive driver and by test
    /// harnesses to drive a node without going through the wire protocol.
    pub fn send_user(&self, cmd: UserCommand) {
        self.deliver(Mailbox::User(cmd));
    }

    /// Deliver a bootstrap message. Only meaningful before the node's
    /// actor has started handling its mailbox; present for symmetry with
    /// the other externally-driven inputs.
    pub fn send_bootstrap(&self, bootstrap: Bootstrap) {
        self.deliver(Mailbox::Bootstrap(bootstrap));
    }
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerHandle({})", self.id)
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for PeerHandle {}

impl std::hash::Hash for PeerHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The transport surface a running node actor uses to reach the rest of
/// the tree: `send` to a named peer, `schedule_self` to arrange a
/// delayed self-delivery.
#[derive(Clone)]
pub struct ChannelTransport {
    me: NodeId,
    self_handle: PeerHandle,
    neighbors: BTreeMap<NodeId, PeerHandle>,
}

impl ChannelTransport {
    pub fn new(
        me: NodeId,
        self_handle: PeerHandle,
        neighbors: BTreeMap<NodeId, PeerHandle>,
    ) -> Self {
        ChannelTransport { me, self_handle, neighbors }
    }

    pub fn neighbor_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.keys().copied()
    }

    /// Send `msg` to `to`, as if this node were the sender.
    ///
    /// Panics if `to` is not a configured neighbor and not `self`: the
    /// state machine only ever names neighbors or itself, so reaching this
    /// would be a bug in the node core, not a runtime condition to recover
    /// from.
    pub fn send(&self, to: NodeId, msg: Protocol) {
        let envelope = Envelope { from: self.me, msg };
        if to == self.me {
            self.self_handle.deliver(Mailbox::Wire(envelope));
            return;
        }
        match self.neighbors.get(&to) {
            Some(handle) => handle.deliver(Mailbox::Wire(envelope)),
            None => panic!(
                "node {} asked the transport to send to non-neighbor {}",
                self.me, to
            ),
        }
    }

    /// Arrange for `msg` to be delivered back to this node's own mailbox
    /// after `after`. Spawns a short-lived timer task; the timer cannot be
    /// canceled once scheduled.
    pub fn schedule_self(&self, after: Duration, msg: SelfMsg) {
        let handle = self.self_handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            handle.deliver(Mailbox::SelfMsg(msg));
        });
    }
}
