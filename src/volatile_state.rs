use crate::{llm::ChatMessage, session::SessionStore};
use serenity::all::ChannelId;
use std::collections::{HashMap, VecDeque};

/// State which is lost across sessions
pub struct VolatileState {
    pub history: History,
    pub sessions: SessionStore,
}

/// Recent study-chat exchanges per channel, oldest first.  Only messages addressed to the bot
/// and its replies are kept.
pub struct History(HashMap<ChannelId, VecDeque<ChatMessage>>);

impl VolatileState {
    pub fn new() -> Self {
        Self {
            history: History::new(),
            sessions: SessionStore::new(),
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, channel_id: ChannelId) -> Vec<ChatMessage> {
        self.0
            .get(&channel_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn push(&mut self, channel_id: ChannelId, entry: ChatMessage, max_len: usize) {
        let history = self.0.entry(channel_id).or_default();
        history.push_back(entry);

        while history.len() > max_len {
            history.pop_front();
        }
    }
}
