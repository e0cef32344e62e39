//! Received-message store, keyed by server-assigned id.
//!
//! Ids are sparse and never reused within a session. Deletion removes the
//! entry outright: a later lookup of a deleted id yields "not found", and
//! ids are never renumbered. Reply chains reference messages by id only,
//! so a reply whose target has been deleted resolves to
//! [`ReplyContext::Deleted`] rather than an error.

use std::collections::BTreeMap;

use wirechat_proto::packet::ChatMessage;

/// What a message's `reply` field points at, resolved against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContext {
    /// The message is not a reply.
    NotAReply,
    /// The reply target was deleted (or never delivered).
    Deleted(u64),
    /// The reply target is present.
    Found {
        /// Target message id.
        id: u64,
        /// Target author.
        author: String,
        /// Target body.
        text: String,
    },
}

/// Append-friendly indexed collection of received chat messages.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: BTreeMap<u64, ChatMessage>,
}

impl MessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, overwriting any previous entry with the same id.
    pub fn insert(&mut self, message: ChatMessage) {
        self.messages.insert(message.id, message);
    }

    /// Remove a message by id. Removing an absent id is a no-op.
    ///
    /// Returns whether the id was present.
    pub fn remove(&mut self, id: u64) -> bool {
        self.messages.remove(&id).is_some()
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.get(&id)
    }

    /// Resolve the reply target of a message against the store.
    #[must_use]
    pub fn reply_context(&self, message: &ChatMessage) -> ReplyContext {
        match message.reply {
            None => ReplyContext::NotAReply,
            Some(id) => self.get(id).map_or(ReplyContext::Deleted(id), |target| {
                ReplyContext::Found {
                    id,
                    author: target.author.clone(),
                    text: target.text.clone(),
                }
            }),
        }
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
