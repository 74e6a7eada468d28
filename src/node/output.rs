// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The result of feeding one message into a [`super::Node`].
//!
//! Shaped after `bootstore::schemes::v0::Output { persist, envelopes,
//! api_output }`: a synchronous handler never performs I/O itself, it just
//! describes what the caller (the actor loop, or a test harness) should do
//! next. Returning structured [`NodeEvent`]s alongside the side effects
//! means tests can assert on protocol behavior directly instead of
//! scraping log text, even though the same events are also logged.

use crate::error::{CommandRefusal, ProtocolError};
use crate::message::SelfMsg;
use crate::node::{Holder, NodeId};
use std::collections::VecDeque;
use std::time::Duration;

/// Everything a [`super::Node`] handler produced: outbound messages,
/// timers to arm, and events worth logging or asserting on in tests.
#[derive(Debug, Default)]
pub struct Output {
    pub sends: Vec<(NodeId, crate::message::Protocol)>,
    pub timers: Vec<(Duration, SelfMsg)>,
    pub events: Vec<NodeEvent>,
}

impl Output {
    pub fn none() -> Self {
        Output::default()
    }

    pub fn send(mut self, to: NodeId, msg: crate::message::Protocol) -> Self {
        self.sends.push((to, msg));
        self
    }

    pub fn timer(mut self, after: Duration, msg: SelfMsg) -> Self {
        self.timers.push((after, msg));
        self
    }

    pub fn event(mut self, event: NodeEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Fold `other` into `self`, preserving order (used when a handler
    /// completes reconciliation and then immediately resumes normal
    /// operation via `assign_privilege`/`make_request`).
    pub fn merge(mut self, other: Output) -> Self {
        self.sends.extend(other.sends);
        self.timers.extend(other.timers);
        self.events.extend(other.events);
        self
    }
}

/// A structured record of a state transition, for logging and test
/// assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Initialized { holder: Holder },
    EnteredCriticalSection,
    ExitedCriticalSection,
    GrantedPrivilege { to: NodeId },
    SentRequest { to: NodeId },
    Crashed,
    RecoveryStarted,
    RecoveryCompleted {
        holder: Holder,
        asked: bool,
        using: bool,
        request_queue: VecDeque<NodeId>,
    },
    CommandRefused(CommandRefusal),
    ProtocolError(ProtocolError),
}

/// Emit one `slog` record per event: INFO lines keyed by node id on
/// every state transition, plus WARN for refusals and ERROR for
/// precondition violations.
pub fn log_event(log: &slog::Logger, event: &NodeEvent) {
    use slog::{error, info, warn};
    match event {
        NodeEvent::Initialized { holder } => {
            info!(log, "initialized"; "holder" => format!("{holder:?}"))
        }
        NodeEvent::EnteredCriticalSection => info!(log, "enter critical section"),
        NodeEvent::ExitedCriticalSection => info!(log, "exit critical section"),
        NodeEvent::GrantedPrivilege { to } => info!(log, "granted privilege"; "to" => *to),
        NodeEvent::SentRequest { to } => info!(log, "sent request"; "to" => *to),
        NodeEvent::Crashed => info!(log, "crashed"),
        NodeEvent::RecoveryStarted => info!(log, "recovery started"),
        NodeEvent::RecoveryCompleted { holder, asked, using, request_queue } => info!(
            log,
            "recovery completed";
            "holder" => format!("{holder:?}"),
            "asked" => asked,
            "using" => using,
            "request_queue" => format!("{request_queue:?}"),
        ),
        NodeEvent::CommandRefused(refusal) => warn!(log, "command refused"; "reason" => %refusal),
        NodeEvent::ProtocolError(err) => error!(log, "protocol error"; "error" => %err),
    }
}
