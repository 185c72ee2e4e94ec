use crate::domain::conversation::{ChannelKind, Turn};

/// Read-only, size-bounded projection of a conversation's most recent
/// turns. Materialized fresh per inbound event, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationWindow {
    turns: Vec<Turn>,
}

impl ConversationWindow {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Builds [`ConversationWindow`]s with per-channel bounds. The business
/// channel uses a tighter window because admin turns inflate its history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowBuilder {
    size_primary: usize,
    size_business: usize,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self { size_primary: 20, size_business: 10 }
    }
}

impl WindowBuilder {
    pub fn new(size_primary: usize, size_business: usize) -> Self {
        Self { size_primary, size_business }
    }

    pub fn size_for(&self, channel: ChannelKind) -> usize {
        match channel {
            ChannelKind::Primary => self.size_primary,
            ChannelKind::Business => self.size_business,
        }
    }

    /// Projects the last N turns of `history`, preserving role, content,
    /// and order verbatim. An empty or missing history yields an empty
    /// window, not an error.
    pub fn project(&self, history: &[Turn], channel: ChannelKind) -> ConversationWindow {
        let size = self.size_for(channel);
        let skip = history.len().saturating_sub(size);
        ConversationWindow { turns: history[skip..].to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::WindowBuilder;
    use crate::domain::conversation::{ChannelKind, Role, Turn};

    fn history(len: usize) -> Vec<Turn> {
        (0..len)
            .map(|index| {
                let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
                Turn::new(role, format!("turn-{index}"))
            })
            .collect()
    }

    #[test]
    fn empty_history_yields_empty_window() {
        let window = WindowBuilder::default().project(&[], ChannelKind::Primary);
        assert!(window.is_empty());
    }

    #[test]
    fn window_never_exceeds_channel_bound() {
        let builder = WindowBuilder::default();
        let turns = history(35);

        assert_eq!(builder.project(&turns, ChannelKind::Primary).len(), 20);
        assert_eq!(builder.project(&turns, ChannelKind::Business).len(), 10);
    }

    #[test]
    fn window_keeps_most_recent_turns_in_order() {
        let turns = history(25);
        let window = WindowBuilder::default().project(&turns, ChannelKind::Business);

        assert_eq!(window.turns().first().map(|turn| turn.content.as_str()), Some("turn-15"));
        assert_eq!(window.turns().last().map(|turn| turn.content.as_str()), Some("turn-24"));
    }

    #[test]
    fn projection_does_not_mutate_source_history() {
        let turns = history(12);
        let snapshot = turns.clone();
        let _ = WindowBuilder::default().project(&turns, ChannelKind::Business);
        assert_eq!(turns, snapshot);
    }

    #[test]
    fn short_history_is_returned_whole() {
        let turns = history(3);
        let window = WindowBuilder::default().project(&turns, ChannelKind::Primary);
        assert_eq!(window.turns(), turns.as_slice());
    }
}
