// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raymond's tree-based distributed mutual exclusion protocol, with a
//! crash-and-recovery extension.
//!
//! The core is [`node::Node`]: a synchronous, I/O-free state machine run
//! once per tree node. [`actor`] wraps it in a `tokio` task with a mailbox
//! and timers; [`transport`] realizes the point-to-point channel each
//! node's core logic only ever names by id; [`tree`] builds the
//! topologies used by the driver and the tests.

pub mod actor;
pub mod config;
pub mod error;
pub mod message;
pub mod node;
pub mod transport;
pub mod tree;

pub use config::Config;
pub use error::{CommandRefusal, ProtocolError};
pub use message::{Bootstrap, Protocol, SelfMsg, UserCommand};
pub use node::output::{NodeEvent, Output};
pub use node::{Holder, Node, NodeId, Phase};
pub use transport::{ChannelTransport, Envelope, Mailbox, PeerHandle};
