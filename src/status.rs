//! Per-subsystem request lifecycle and the indicator derived from it.
//!
//! State is held explicitly and only changed through [`StatusBoard::set`];
//! the label and color are looked up from a fixed table, never read back from
//! what is on screen.

use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Connect,
    Chat,
    Robot,
}

impl Subsystem {
    pub fn all() -> [Subsystem; 3] {
        [Subsystem::Connect, Subsystem::Chat, Subsystem::Robot]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Connect => "connect",
            Subsystem::Chat => "chat",
            Subsystem::Robot => "robot",
        }
    }

    fn index(&self) -> usize {
        match self {
            Subsystem::Connect => 0,
            Subsystem::Chat => 1,
            Subsystem::Robot => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Idle,
    Pending,
    Succeeded,
    /// The dependent follow-up request of a chained flow completed
    FollowUpSucceeded,
    /// Has an indicator entry but is never entered: request failures are only
    /// logged and the indicator keeps its pending label.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub label: &'static str,
    pub color: Color,
}

const fn indicator(label: &'static str, color: Color) -> Indicator {
    Indicator { label, color }
}

/// Fixed lifecycle → indicator table
pub fn indicator_for(subsystem: Subsystem, state: Lifecycle) -> Indicator {
    use Lifecycle::*;
    use Subsystem::*;
    match (subsystem, state) {
        (Connect, Idle) => indicator("Not connected", Color::DarkGray),
        (Connect, Pending) => indicator("Configuring & Connecting", Color::Gray),
        (Connect, Succeeded | FollowUpSucceeded) => indicator("Connected", Color::Green),
        (Chat, Idle) => indicator("Idle", Color::DarkGray),
        (Chat, Pending) => indicator("Awaiting", Color::Gray),
        (Chat, Succeeded) => indicator("Received", Color::Green),
        (Chat, FollowUpSucceeded) => indicator("Policy Received", Color::Cyan),
        (Robot, Idle) => indicator("Idle", Color::DarkGray),
        (Robot, Pending) => indicator("Awaiting", Color::Gray),
        (Robot, Succeeded | FollowUpSucceeded) => indicator("Executed", Color::Green),
        (_, Failed) => indicator("Failed", Color::Red),
    }
}

/// Lifecycle state of every subsystem
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    states: [Lifecycle; 3],
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, subsystem: Subsystem, state: Lifecycle) {
        let previous = std::mem::replace(&mut self.states[subsystem.index()], state);
        tracing::debug!(subsystem = subsystem.name(), ?previous, ?state, "status transition");
    }

    pub fn state(&self, subsystem: Subsystem) -> Lifecycle {
        self.states[subsystem.index()]
    }

    pub fn indicator(&self, subsystem: Subsystem) -> Indicator {
        indicator_for(subsystem, self.state(subsystem))
    }
}
