// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Raymond per-node automaton, plus the recovery reasoner that sits
//! on top of it.
//!
//! `Node` is entirely synchronous and performs no I/O, following
//! `bootstore::schemes::v0::Fsm`'s lead ("This state machine is entirely
//! synchronous. It performs actions and returns results... written this
//! way to enable easy testing and auditing."). Every public `handle_*`
//! method takes `&mut self` plus whatever arrived, and returns an
//! [`Output`] describing what to do about it. The actor loop in
//! [`crate::actor`] is the only thing that turns an `Output` into real
//! sends and timers.

pub mod output;
pub mod recovery;

use crate::config::Config;
use crate::error::{CommandRefusal, ProtocolError};
use crate::message::{Bootstrap, Protocol, SelfMsg, UserCommand};
use crate::transport::Envelope;
use output::{NodeEvent, Output};
use recovery::{Advisory, RecoveryState};
use std::collections::VecDeque;
use std::fmt;

/// A small integer uniquely identifying a node in the tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl slog::Value for NodeId {
    fn serialize(
        &self,
        _record: &slog::Record,
        key: slog::Key,
        serializer: &mut dyn slog::Serializer,
    ) -> slog::Result {
        serializer.emit_u32(key, self.0)
    }
}

/// The direction the token currently lies in, from this node's point of
/// view. `None` is represented by the absence of a value at the `Node`
/// level (pre-init, or mid-crash).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    SelfHeld,
    Neighbor(NodeId),
}

/// The lifecycle tag.
///
/// `Recovering` carries the advisory buffer directly, rather than storing
/// it in a side table keyed by phase: the type system then makes "the
/// advisory buffer only exists while Recovering" an invariant instead of a
/// convention every call site has to remember.
#[derive(Debug)]
pub enum Phase {
    Uninitialized,
    Normal,
    Crashed,
    Recovering(RecoveryState),
}

impl Phase {
    pub fn is_normal(&self) -> bool {
        matches!(self, Phase::Normal)
    }
}

/// One node's full local state.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    neighbors: Vec<NodeId>,
    holder: Option<Holder>,
    request_queue: VecDeque<NodeId>,
    using: bool,
    asked: bool,
    phase: Phase,
    config: Config,
}

impl Node {
    /// Construct a node from its bootstrap message. The node starts
    /// `Uninitialized`; it becomes `Normal` only once `handle_wire` sees
    /// an `Initialize`, or, for the starter, once the caller drives
    /// `handle_initialize_self` after `config.bootstrap_delay`.
    pub fn new(id: NodeId, bootstrap: &Bootstrap, config: Config) -> Self {
        Node {
            id,
            neighbors: bootstrap.neighbors.clone(),
            holder: None,
            request_queue: VecDeque::new(),
            using: false,
            asked: false,
            phase: Phase::Uninitialized,
            config,
        }
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn holder(&self) -> Option<Holder> {
        self.holder
    }

    pub fn using(&self) -> bool {
        self.using
    }

    pub fn asked(&self) -> bool {
        self.asked
    }

    pub fn request_queue(&self) -> &VecDeque<NodeId> {
        &self.request_queue
    }

    /// A one-line diagnostic snapshot for an interactive debug command.
    /// Never changes node state.
    pub fn describe(&self) -> String {
        format!(
            "node {} phase={:?} holder={:?} using={} asked={} queue={:?}",
            self.id, self.phase, self.holder, self.using, self.asked, self.request_queue
        )
    }

    /// Invoked once by the starter after `config.bootstrap_delay`: the
    /// starter receives its first `Initialize` message from itself.
    pub fn start_bootstrap(&mut self) -> Output {
        if !matches!(self.phase, Phase::Uninitialized) {
            return Output::none();
        }
        self.handle_initialize(self.id)
    }

    /// Dispatch a message that arrived over a tree edge. Dropped
    /// silently while `Crashed`.
    pub fn handle_wire(&mut self, envelope: Envelope) -> Output {
        if matches!(self.phase, Phase::Crashed) {
            return Output::none().event(NodeEvent::ProtocolError(
                ProtocolError::DroppedWhileCrashed(self.id, envelope.msg.kind()),
            ));
        }

        match envelope.msg {
            Protocol::Initialize { sender } => self.handle_initialize(sender),
            Protocol::Request { sender } => self.handle_request(sender),
            Protocol::Privilege { sender } => self.handle_privilege(sender),
            Protocol::Restart { sender } => self.handle_restart(sender),
            Protocol::Advise {
                sender,
                x_is_holder_of_y,
                x_in_y_request_queue,
                y_asked,
            } => self.handle_advise(
                sender,
                Advisory { x_is_holder_of_y, x_in_y_request_queue, y_asked },
            ),
        }
    }

    /// Dispatch a message this node scheduled for itself. Handlers must
    /// tolerate a stale timer arriving after the phase
    /// it was armed for has already ended, since scheduled self-messages
    /// cannot be revoked.
    pub fn handle_self(&mut self, msg: SelfMsg) -> Output {
        match msg {
            SelfMsg::ExitCriticalSection => self.handle_exit_critical_section(),
            SelfMsg::Recovery => self.handle_recovery_timer(),
        }
    }

    /// Dispatch a command injected by the interactive driver.
    pub fn handle_user(&mut self, cmd: UserCommand) -> Output {
        match cmd {
            UserCommand::Request => self.handle_user_request(),
            UserCommand::Crash => self.handle_user_crash(),
        }
    }

    // ---- normal-phase wire handlers ----

    fn handle_initialize(&mut self, sender: NodeId) -> Output {
        if !matches!(self.phase, Phase::Uninitialized) {
            // A tree has exactly one path to any node, so a second
            // `Initialize` should never arrive; treat it as a harmless
            // precondition anomaly rather than letting it reset state.
            return Output::none().event(NodeEvent::ProtocolError(
                ProtocolError::OutOfPhase(self.id, "duplicate Initialize"),
            ));
        }

        self.holder = Some(if sender == self.id {
            Holder::SelfHeld
        } else {
            Holder::Neighbor(sender)
        });
        self.phase = Phase::Normal;

        let mut out = Output::none().event(NodeEvent::Initialized { holder: self.holder.unwrap() });
        for &neighbor in &self.neighbors {
            if neighbor != sender {
                out = out.send(neighbor, Protocol::Initialize { sender: self.id });
            }
        }
        out
    }

    fn handle_request(&mut self, sender: NodeId) -> Output {
        self.request_queue.push_back(sender);
        self.resume_if_normal()
    }

    fn handle_privilege(&mut self, _sender: NodeId) -> Output {
        // Allowed while `Recovering`, not while `Crashed` (already
        // filtered out by `handle_wire`); this is what lets the
        // reconciliation pass detect `holds_privilege`.
        self.holder = Some(Holder::SelfHeld);
        self.resume_if_normal()
    }

    fn handle_restart(&mut self, from: NodeId) -> Output {
        // We answer with our *current* view without pausing or mutating
        // any state: concurrent token movement can still happen.
        let x_is_holder_of_y = matches!(self.holder, Some(Holder::Neighbor(n)) if n == from);
        let x_in_y_request_queue = self.request_queue.contains(&from);
        let y_asked = self.asked;

        Output::none().send(
            from,
            Protocol::Advise {
                sender: self.id,
                x_is_holder_of_y,
                x_in_y_request_queue,
                y_asked,
            },
        )
    }

    fn handle_advise(&mut self, from: NodeId, advisory: Advisory) -> Output {
        let Phase::Recovering(state) = &mut self.phase else {
            return Output::none().event(NodeEvent::ProtocolError(
                ProtocolError::OutOfPhase(self.id, "unexpected Advise"),
            ));
        };

        state.advise_buffer.insert(from, advisory);

        if !state.is_complete(&self.neighbors) {
            return Output::none();
        }

        let Phase::Recovering(state) = std::mem::replace(&mut self.phase, Phase::Normal) else {
            unreachable!("just matched Recovering above");
        };
        recovery::reconcile(self, state.advise_buffer)
    }

    // ---- self-message handlers ----

    fn handle_exit_critical_section(&mut self) -> Output {
        if !self.phase.is_normal() {
            // A stale timer from before a crash/recovery cycle; discard.
            return Output::none();
        }
        self.using = false;
        Output::none()
            .event(NodeEvent::ExitedCriticalSection)
            .merge(self.assign_privilege())
            .merge(self.make_request())
    }

    fn handle_recovery_timer(&mut self) -> Output {
        if !matches!(self.phase, Phase::Crashed) {
            return Output::none();
        }
        self.phase = Phase::Recovering(RecoveryState::default());

        let mut out = Output::none().event(NodeEvent::RecoveryStarted);
        for &neighbor in &self.neighbors {
            out = out.send(neighbor, Protocol::Restart { sender: self.id });
        }

        // A node with no neighbors has nobody to advise it: the freshly
        // emptied buffer is vacuously complete against an empty neighbor
        // set, so reconcile right away instead of waiting on an Advise
        // that can never arrive.
        let Phase::Recovering(state) = &self.phase else {
            unreachable!("just set Recovering above");
        };
        if state.is_complete(&self.neighbors) {
            let Phase::Recovering(state) = std::mem::replace(&mut self.phase, Phase::Normal) else {
                unreachable!("just matched Recovering above");
            };
            out = out.merge(recovery::reconcile(self, state.advise_buffer));
        }
        out
    }

    // ---- user commands ----

    fn handle_user_request(&mut self) -> Output {
        match &self.phase {
            Phase::Uninitialized => Output::none().event(NodeEvent::ProtocolError(
                ProtocolError::RequestBeforeInit(self.id),
            )),
            Phase::Crashed => Output::none().event(NodeEvent::CommandRefused(
                CommandRefusal::RequestWhileCrashed(self.id),
            )),
            Phase::Normal => {
                self.request_queue.push_back(self.id);
                self.assign_privilege().merge(self.make_request())
            }
            Phase::Recovering(_) => {
                // Queue the request now; `assign_privilege`/`make_request`
                // run once reconciliation completes.
                self.request_queue.push_back(self.id);
                Output::none()
            }
        }
    }

    fn handle_user_crash(&mut self) -> Output {
        if matches!(self.phase, Phase::Normal) && !self.using {
            self.phase = Phase::Crashed;
            self.holder = None;
            self.using = false;
            self.asked = false;
            self.request_queue.clear();

            Output::none()
                .event(NodeEvent::Crashed)
                .timer(self.config.crash_time, SelfMsg::Recovery)
        } else {
            let reason = if self.using {
                "critical section is executing"
            } else {
                "node is not Normal"
            };
            Output::none().event(NodeEvent::CommandRefused(CommandRefusal::CrashRefused(
                self.id, reason,
            )))
        }
    }

    // ---- internal procedures ----

    /// Only invoke the pair of internal procedures if we are in `Normal`
    /// phase; while `Recovering`, the same wire handlers run but defer
    /// resuming privilege assignment/requesting until reconciliation
    /// completes.
    fn resume_if_normal(&mut self) -> Output {
        if self.phase.is_normal() {
            self.assign_privilege().merge(self.make_request())
        } else {
            Output::none()
        }
    }

    /// Preconditions: `holder == self`, `using == false`, `request_queue`
    /// non-empty. No-op otherwise.
    pub(crate) fn assign_privilege(&mut self) -> Output {
        if self.holder != Some(Holder::SelfHeld) || self.using {
            return Output::none();
        }
        let Some(head) = self.request_queue.pop_front() else {
            return Output::none();
        };

        self.asked = false;
        if head == self.id {
            self.holder = Some(Holder::SelfHeld);
            self.using = true;
            Output::none()
                .event(NodeEvent::EnteredCriticalSection)
                .timer(self.config.critical_section_time, SelfMsg::ExitCriticalSection)
        } else {
            self.holder = Some(Holder::Neighbor(head));
            Output::none()
                .event(NodeEvent::GrantedPrivilege { to: head })
                .send(head, Protocol::Privilege { sender: self.id })
        }
    }

    /// Preconditions: `holder != self`, `request_queue` non-empty,
    /// `asked == false`, `holder` initialized. Logs a non-fatal
    /// precondition violation if called before initialization.
    pub(crate) fn make_request(&mut self) -> Output {
        let Some(holder) = self.holder else {
            return Output::none()
                .event(NodeEvent::ProtocolError(ProtocolError::RequestBeforeInit(self.id)));
        };
        let Holder::Neighbor(target) = holder else {
            return Output::none();
        };
        if self.request_queue.is_empty() || self.asked {
            return Output::none();
        }

        self.asked = true;
        Output::none()
            .event(NodeEvent::SentRequest { to: target })
            .send(target, Protocol::Request { sender: self.id })
    }
}
