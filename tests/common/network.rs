// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A synchronous, discrete-event simulated network, standing in for real
//! message delivery in tests the same way `bootstore`'s
//! `tests/common/network.rs` does for its FSM tests — except driven by a
//! simple virtual clock in milliseconds instead of abstract `Ticks`, since
//! this protocol's timers are configured in milliseconds rather than tick
//! counts.
//!
//! FIFO-per-pair delivery falls out for free: this is a single priority
//! queue ordered by `(deliver_at, sequence)`, and two messages sent along
//! the same edge are enqueued in send order with strictly increasing
//! sequence numbers, so equal timestamps still resolve in send order.

use raymond_mutex::node::output::Output;
use raymond_mutex::node::{Node, NodeId};
use raymond_mutex::transport::Envelope;
use raymond_mutex::{Protocol, SelfMsg};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

const WIRE_DELAY_MS: u64 = 1;

#[derive(Debug, Clone)]
enum Delivery {
    Wire(Envelope),
    Timer(SelfMsg),
}

struct Scheduled {
    time: u64,
    seq: u64,
    to: NodeId,
    delivery: Delivery,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.seq) == (other.time, other.seq)
    }
}
impl Eq for Scheduled {}
impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Owns every node in the simulated tree and the event queue connecting
/// them. Only ever processed synchronously: a test drives it with
/// `user_request`/`user_crash`/`run_until_quiescent` and then inspects
/// node state directly.
pub struct SimNetwork {
    pub nodes: BTreeMap<NodeId, Node>,
    time: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
}

impl SimNetwork {
    pub fn new(nodes: BTreeMap<NodeId, Node>) -> Self {
        SimNetwork { nodes, time: 0, seq: 0, queue: BinaryHeap::new() }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn apply(&mut self, to: NodeId, output: Output) {
        for (target, protocol) in output.sends {
            let seq = self.next_seq();
            self.queue.push(Reverse(Scheduled {
                time: self.time + WIRE_DELAY_MS,
                seq,
                to: target,
                delivery: Delivery::Wire(Envelope { from: to, msg: protocol }),
            }));
        }
        for (after, self_msg) in output.timers {
            let seq = self.next_seq();
            self.queue.push(Reverse(Scheduled {
                time: self.time + after.as_millis() as u64,
                seq,
                to,
                delivery: Delivery::Timer(self_msg),
            }));
        }
    }

    /// Apply a locally-triggered output (a user command, or the starter's
    /// bootstrap kick) directly, without going through the queue for the
    /// triggering action itself — only its resulting sends/timers are
    /// scheduled.
    pub fn inject(&mut self, at: NodeId, output: Output) {
        self.apply(at, output);
    }

    pub fn start_bootstrap(&mut self, starter: NodeId) {
        let output = self.nodes.get_mut(&starter).unwrap().start_bootstrap();
        self.apply(starter, output);
    }

    pub fn user_request(&mut self, id: NodeId) {
        let output = self.nodes.get_mut(&id).unwrap().handle_user(
            raymond_mutex::UserCommand::Request,
        );
        self.apply(id, output);
    }

    pub fn user_crash(&mut self, id: NodeId) {
        let output = self.nodes.get_mut(&id).unwrap().handle_user(
            raymond_mutex::UserCommand::Crash,
        );
        self.apply(id, output);
    }

    /// Drain the event queue, delivering every scheduled wire message and
    /// timer in `(time, seq)` order, until nothing remains. Since the
    /// tree's message volume is finite per round and timers only ever
    /// schedule a bounded number of follow-ups, this always terminates
    /// for the scenarios this crate's tests construct.
    pub fn run_until_quiescent(&mut self) {
        let mut iterations = 0;
        while let Some(Reverse(scheduled)) = self.queue.pop() {
            iterations += 1;
            assert!(
                iterations < 1_000_000,
                "simulated network did not quiesce; possible infinite retry loop"
            );
            self.time = scheduled.time;
            let output = match scheduled.delivery {
                Delivery::Wire(envelope) => self
                    .nodes
                    .get_mut(&scheduled.to)
                    .unwrap()
                    .handle_wire(envelope),
                Delivery::Timer(msg) => {
                    self.nodes.get_mut(&scheduled.to).unwrap().handle_self(msg)
                }
            };
            self.apply(scheduled.to, output);
        }
    }
}
