//! Ordered, append-only record of a conversation.
//!
//! The transcript has at most one in-progress turn. It is always the last
//! turn, always has the assistant role, and is the only turn whose content
//! may change.

use crate::error::{Error, Result};
use crate::types::{HistoryEntry, Role, Turn, TurnContent, TurnId};

/// The turns of one session, in insertion order.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
    in_progress: Option<TurnId>,
    next_id: u64,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished turn and return its id.
    ///
    /// Any in-progress turn is finished first, so the new turn becomes the tail.
    pub fn append(&mut self, role: Role, content: impl Into<TurnContent>) -> TurnId {
        self.finish_in_progress();
        self.push(role, content.into())
    }

    /// Append an empty assistant turn that will receive streamed content.
    pub fn begin_assistant(&mut self) -> TurnId {
        self.finish_in_progress();
        let id = self.push(Role::Assistant, TurnContent::default());
        self.in_progress = Some(id);
        id
    }

    /// Replace the content of the in-progress turn `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transcript`] if `id` does not name the in-progress turn.
    pub fn update_in_progress(&mut self, id: TurnId, content: &str) -> Result<()> {
        if self.in_progress != Some(id) {
            return Err(Error::transcript(format!("{id} is not in progress")));
        }
        let Some(turn) = self.turns.last_mut() else {
            return Err(Error::transcript("transcript is empty"));
        };
        turn.content = TurnContent::text(content);
        Ok(())
    }

    /// Mark the in-progress turn, if any, as finished.
    pub fn finish_in_progress(&mut self) -> Option<TurnId> {
        self.in_progress.take()
    }

    /// The id of the in-progress turn.
    pub fn in_progress(&self) -> Option<TurnId> {
        self.in_progress
    }

    /// Remove every turn. Ids keep counting up, so they are never reused.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.in_progress = None;
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Look up a turn by id.
    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    /// The number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if the transcript has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `window` turns the model should see, oldest first.
    ///
    /// Skips the in-progress turn, error turns and document turns.
    pub fn history(&self, window: usize) -> Vec<HistoryEntry> {
        let mut history: Vec<HistoryEntry> = self
            .turns
            .iter()
            .rev()
            .filter(|turn| Some(turn.id) != self.in_progress)
            .filter(|turn| turn.role.is_conversational())
            .filter_map(|turn| {
                turn.text()
                    .map(|text| HistoryEntry::new(turn.role, text.to_string()))
            })
            .take(window)
            .collect();
        history.reverse();
        history
    }

    fn push(&mut self, role: Role, content: TurnContent) -> TurnId {
        self.next_id += 1;
        let id = TurnId::new(self.next_id);
        self.turns.push(Turn::new(id, role, content));
        id
    }
}
