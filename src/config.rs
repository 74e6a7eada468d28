// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tuned constants for a running tree.

use std::time::Duration;

/// Timing knobs shared by every node in a tree.
///
/// Mirrors the shape of `bootstore::schemes::v0::Config`: a small bag of
/// `Duration`s handed to every node at construction time.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Delay after construction before the starter initializes itself and
    /// floods `Initialize` down the tree.
    pub bootstrap_delay: Duration,

    /// Simulated duration of the critical section.
    pub critical_section_time: Duration,

    /// Simulated crash duration. Must exceed the worst-case in-flight
    /// message delivery latency, or a message sent just before the crash
    /// could still be in flight when the node starts recovering and would
    /// then race the `Restart` flood.
    pub crash_time: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bootstrap_delay: Duration::from_millis(50),
            critical_section_time: Duration::from_millis(200),
            crash_time: Duration::from_millis(500),
        }
    }
}
