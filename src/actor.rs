// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The node actor: one `tokio` task per tree node, owning a mailbox and a
//! [`Node`] core, and translating each [`Output`] into real sends, timers,
//! and log lines.
//!
//! This is the layer `bootstore` leaves to the rest of the Oxide stack
//! (sled-agent wires `Fsm` into its own task loop); here it is part of the
//! crate rather than left as an exercise for a future caller.

use crate::config::Config;
use crate::message::{Bootstrap, Protocol};
use crate::node::Node;
use crate::node::NodeId;
use crate::node::output::Output;
use crate::transport::{ChannelTransport, Mailbox, PeerHandle};
use slog::{info, o, Logger};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// A running node: its inbound handle plus a join handle for the task
/// driving it. Dropping every clone of the `PeerHandle`s that reach a node
/// causes its `recv` loop to end and the task to finish.
pub struct NodeHandle {
    pub id: NodeId,
    pub peer: PeerHandle,
    pub join: tokio::task::JoinHandle<()>,
}

/// Spawn one actor per node in `bootstraps`, wiring every node's
/// `ChannelTransport` to every other node's mailbox over the edges already
/// encoded in each `Bootstrap`.
///
/// The starter (whichever `Bootstrap::is_starter` is true) is kicked off
/// automatically after `config.bootstrap_delay`, delivering an
/// `Initialize` to itself.
pub fn spawn_tree(
    bootstraps: Vec<(NodeId, Bootstrap)>,
    config: Config,
    log: &Logger,
) -> Vec<NodeHandle> {
    let mut senders = BTreeMap::new();
    let mut receivers = BTreeMap::new();
    for (id, _) in &bootstraps {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.insert(*id, PeerHandle::new(*id, tx));
        receivers.insert(*id, rx);
    }

    let mut handles = Vec::with_capacity(bootstraps.len());
    for (id, bootstrap) in bootstraps {
        let self_handle = senders[&id].clone();
        let neighbors: BTreeMap<NodeId, PeerHandle> = bootstrap
            .neighbors
            .iter()
            .map(|n| (*n, senders[n].clone()))
            .collect();
        let transport = ChannelTransport::new(id, self_handle.clone(), neighbors);
        let node_log = log.new(o!("node_id" => id));
        let node = Node::new(id, &bootstrap, config);
        let rx = receivers.remove(&id).expect("one receiver per node id");

        if bootstrap.is_starter {
            spawn_starter_kick(transport.clone(), id, config.bootstrap_delay);
        }

        let join = tokio::spawn(run_node(node, transport, rx, node_log));
        handles.push(NodeHandle { id, peer: self_handle, join });
    }
    handles
}

/// Delivers `Initialize { sender: id }` to `id`'s own mailbox after
/// `delay`, standing in for the starter receiving its first `Initialize`
/// from itself once the bootstrap delay elapses.
fn spawn_starter_kick(transport: ChannelTransport, id: NodeId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        transport.send(id, Protocol::Initialize { sender: id });
    });
}

async fn run_node(
    mut node: Node,
    transport: ChannelTransport,
    mut mailbox: mpsc::UnboundedReceiver<Mailbox>,
    log: Logger,
) {
    while let Some(msg) = mailbox.recv().await {
        let output = match msg {
            Mailbox::Wire(envelope) => {
                info!(log, "recv"; "kind" => envelope.msg.kind(), "from" => envelope.from);
                node.handle_wire(envelope)
            }
            Mailbox::SelfMsg(self_msg) => node.handle_self(self_msg),
            Mailbox::User(cmd) => node.handle_user(cmd),
            Mailbox::Bootstrap(_) => {
                // Bootstrap is consumed once, at construction time in
                // `spawn_tree`; a stray later one is ignored.
                continue;
            }
        };

        dispatch(&log, &transport, output);
    }
}

/// Log every event in `output` and carry out its sends/timers.
fn dispatch(log: &Logger, transport: &ChannelTransport, output: Output) {
    for event in &output.events {
        crate::node::output::log_event(log, event);
    }
    for (to, protocol) in output.sends {
        transport.send(to, protocol);
    }
    for (after, self_msg) in output.timers {
        transport.schedule_self(after, self_msg);
    }
}
