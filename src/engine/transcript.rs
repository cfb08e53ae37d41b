//! Per-turn transcript aggregation.
//!
//! The service streams partial text for both speakers. Fragments accumulate
//! per role until a turn-complete signal arrives, then each non-empty
//! accumulator flushes into the append-only message log, user before agent,
//! so a turn where both spoke always lands in the same order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    user_buffer: String,
    agent_buffer: String,
    log: Vec<Message>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate a fragment onto the role's accumulator. Bounded only by
    /// the length of one conversational turn.
    pub fn append_fragment(&mut self, role: Role, text: &str) {
        match role {
            Role::User => self.user_buffer.push_str(text),
            Role::Agent => self.agent_buffer.push_str(text),
        }
    }

    /// Flush the current turn. Emits one message per non-empty accumulator
    /// (user first), clears both unconditionally, and returns the newly
    /// appended messages.
    pub fn on_turn_complete(&mut self) -> &[Message] {
        let appended_from = self.log.len();
        let now = Utc::now();

        if !self.user_buffer.is_empty() {
            self.log.push(Message {
                role: Role::User,
                text: std::mem::take(&mut self.user_buffer),
                timestamp: now,
            });
        }
        if !self.agent_buffer.is_empty() {
            self.log.push(Message {
                role: Role::Agent,
                text: std::mem::take(&mut self.agent_buffer),
                timestamp: now,
            });
        }
        self.user_buffer.clear();
        self.agent_buffer.clear();

        &self.log[appended_from..]
    }

    /// The append-only message log for this session.
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn pending(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_buffer,
            Role::Agent => &self.agent_buffer,
        }
    }
}
