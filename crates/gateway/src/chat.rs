//! Bounded in-memory chat transcript.

use std::{collections::VecDeque, sync::Mutex};

use serde::Serialize;

/// Turns kept in the ring before the oldest is evicted.
const MAX_TURNS: usize = 50;

/// Turns handed to the model as conversational context.
const CONTEXT_TURNS: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

/// Ring buffer of recent chat turns. Eviction keeps memory flat no matter
/// how long the conversation runs.
#[derive(Default)]
pub struct ChatMemory {
    turns: Mutex<VecDeque<ChatTurn>>,
}

impl ChatMemory {
    pub fn push(&self, role: &'static str, content: impl Into<String>) {
        let mut turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        if turns.len() >= MAX_TURNS {
            turns.pop_front();
        }
        turns.push_back(ChatTurn {
            role,
            content: content.into(),
        });
    }

    /// The most recent turns, oldest first, capped at the context window.
    #[must_use]
    pub fn context(&self) -> Vec<ChatTurn> {
        let turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        let start = turns.len().saturating_sub(CONTEXT_TURNS);
        turns.iter().skip(start).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
