//! Outbound rate-limit queue.
//!
//! While the server has this client in a cooldown, outbound lines are held
//! here instead of being written to the wire. The queue is pure state: the
//! event loop owns the one-shot cooldown timer and calls [`SendQueue::expire`]
//! when it fires, so at most one timer is ever outstanding.

/// Outcome of submitting an outbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    /// No cooldown is active; send the line now.
    Send(String),
    /// A cooldown is active; the line was appended to the pending batch.
    Queued,
}

/// Holds pending outbound lines during a server-imposed cooldown.
#[derive(Debug, Default)]
pub struct SendQueue {
    active: bool,
    last_message: String,
    pending: Vec<String>,
}

impl SendQueue {
    /// Creates an idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cooldown is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Submit an outbound line.
    ///
    /// When idle, the line is remembered as the most recently attempted send
    /// (so a subsequent rate-limit notice can requeue it) and returned for
    /// immediate transmission. When a cooldown is active, the line joins the
    /// pending batch instead.
    pub fn submit(&mut self, line: &str) -> Submit {
        if self.active {
            self.pending.push(line.to_string());
            return Submit::Queued;
        }
        self.last_message = line.to_string();
        Submit::Send(line.to_string())
    }

    /// Move the most recently attempted send into the pending batch.
    ///
    /// Called when the server reports a rate limit: the preceding send
    /// failed server-side and must not be lost. The remembered line is
    /// cleared so a second rate-limit notice before the cooldown expires
    /// cannot queue it twice.
    pub fn requeue_last(&mut self) {
        if !self.last_message.is_empty() {
            self.pending.push(std::mem::take(&mut self.last_message));
        }
    }

    /// Mark the cooldown active.
    ///
    /// Returns `true` when the cooldown was newly armed; re-arming while
    /// already active is a no-op and returns `false`, so the caller never
    /// schedules a second timer.
    pub fn activate(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        true
    }

    /// Cooldown expiry: deactivate and drain the pending batch.
    ///
    /// Returns the pending lines joined with `\n` as a single outbound
    /// payload, or `None` when nothing was queued. The batch is cleared
    /// unconditionally.
    pub fn expire(&mut self) -> Option<String> {
        self.active = false;
        if self.pending.is_empty() {
            return None;
        }
        let joined = self.pending.join("\n");
        self.pending.clear();
        Some(joined)
    }

    /// Lines currently held for the next flush.
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }
}
