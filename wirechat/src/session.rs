//! Mutable client-session state.
//!
//! One [`Session`] exists per process run, owned by the event-loop task and
//! passed by mutable reference into the dispatcher and command handlers.
//! Inbound frames, timer firings, and user input are serialized onto that
//! one task, so none of this state needs locking.

use crate::queue::SendQueue;
use crate::roster::Roster;
use crate::store::MessageStore;

/// Connection lifecycle states. Exactly one transport is live in any state
/// other than [`ConnState::Disconnected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// A transport is being opened.
    Connecting,
    /// The handshake was sent; waiting for the server to report status.
    AwaitingHandshake,
    /// Authenticated; user commands are accepted.
    Ready,
    /// No live transport.
    Disconnected,
}

/// The local user's profile as the server last confirmed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name; `None` until the server assigns or confirms one.
    pub name: Option<String>,
    /// Six hex digits, no leading marker.
    pub color: String,
    /// Authorization level.
    pub auth_level: i64,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: None,
            color: "FFFFFF".to_string(),
            auth_level: 0,
        }
    }
}

/// Runtime flags toggled by the `set` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    /// Print each raw inbound packet before dispatching it.
    pub dump: bool,
}

impl Flags {
    /// Set a flag by name. Returns `false` for an unknown flag.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            "dump" => {
                self.dump = value;
                true
            }
            _ => false,
        }
    }
}

/// All mutable state for one client session.
#[derive(Debug, Default)]
pub struct Session {
    /// The local user's profile.
    pub identity: Identity,
    /// Who is present.
    pub roster: Roster,
    /// Messages received this session.
    pub store: MessageStore,
    /// Outbound rate-limit queue.
    pub queue: SendQueue,
    /// Connection lifecycle state.
    pub state: ConnState,
    /// Forced-rename sub-state: while set, the next input line is consumed
    /// as the new display name and normal command processing is suspended.
    pub pending_rename: bool,
    /// Runtime flags.
    pub flags: Flags,
}

impl Default for ConnState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl Session {
    /// Creates a fresh session in the [`ConnState::Disconnected`] state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
