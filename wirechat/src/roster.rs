//! Ordered set of currently-present usernames.

/// The room roster, in first-seen order. A name appears at most once.
#[derive(Debug, Default)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name. Duplicate joins are a no-op.
    ///
    /// Returns whether the name was newly added.
    pub fn join(&mut self, name: &str) -> bool {
        if self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Remove the first exact match for a name.
    ///
    /// Returns whether a name was removed.
    pub fn part(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(index) => {
                self.names.remove(index);
                true
            }
            None => false,
        }
    }

    /// The present names, in first-seen order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of present users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the room is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
