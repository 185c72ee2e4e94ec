use leadline_core::{ChannelKind, ConversationKey};

/// One inbound transport update, normalized across both channels.
///
/// Exactly one of `primary_text` / `business_text` is populated for text
/// messages; both are empty for media-only updates. `update_id` is the
/// transport's own monotonically increasing sequence number and backs the
/// `event_id` used for idempotent history appends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub event_id: String,
    pub channel: ChannelKind,
    pub primary_text: Option<String>,
    pub business_text: Option<String>,
    pub sender_identity: String,
    pub chat_identity: String,
    pub is_own_business_account: bool,
    pub chat_id: i64,
    pub business_connection_id: Option<String>,
    pub update_id: i64,
}

/// What to do with one inbound event. Computed per event, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Run the full answer cycle under `key` and reply on `channel`.
    Answer { key: ConversationKey, text: String, channel: ChannelKind },
    /// Record `text` as an admin turn under `key`; no backend call, no reply.
    LogOnly { key: ConversationKey, text: String },
    /// No usable text; the caller replies with a fixed apology.
    Reject,
}

/// Classifies an inbound event.
///
/// The business account's own outgoing replies are echoed back by the
/// transport; answering them would make the bot answer its own messages in
/// a loop, so they are logged as admin turns instead. The conversation key
/// differs by channel: the business channel's "from" field can legitimately
/// be either party, so its conversations are keyed by the chat identity,
/// not the sender.
pub fn route(event: &InboundEvent, business_account_identity: &str) -> RoutingDecision {
    if event.channel == ChannelKind::Business
        && event.is_own_business_account
        && event.sender_identity == business_account_identity
    {
        return RoutingDecision::LogOnly {
            key: ConversationKey::chat(&event.chat_identity),
            text: event.business_text.clone().unwrap_or_default(),
        };
    }

    let usable = |text: &Option<String>| {
        text.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
    };

    match event.channel {
        ChannelKind::Primary => match usable(&event.primary_text) {
            Some(text) => RoutingDecision::Answer {
                key: ConversationKey::user(&event.sender_identity),
                text,
                channel: ChannelKind::Primary,
            },
            None => RoutingDecision::Reject,
        },
        ChannelKind::Business => match usable(&event.business_text) {
            Some(text) => RoutingDecision::Answer {
                key: ConversationKey::chat(&event.chat_identity),
                text,
                channel: ChannelKind::Business,
            },
            None => RoutingDecision::Reject,
        },
    }
}

#[cfg(test)]
mod tests {
    use leadline_core::{ChannelKind, ConversationKey};

    use super::{route, InboundEvent, RoutingDecision};

    const BUSINESS_IDENTITY: &str = "spineup_admin";

    fn primary_event(sender: &str, text: Option<&str>) -> InboundEvent {
        InboundEvent {
            event_id: "tg-1".to_string(),
            channel: ChannelKind::Primary,
            primary_text: text.map(str::to_string),
            business_text: None,
            sender_identity: sender.to_string(),
            chat_identity: "100".to_string(),
            is_own_business_account: false,
            chat_id: 100,
            business_connection_id: None,
            update_id: 1,
        }
    }

    fn business_event(sender: &str, text: Option<&str>, own_account: bool) -> InboundEvent {
        InboundEvent {
            event_id: "tg-2".to_string(),
            channel: ChannelKind::Business,
            primary_text: None,
            business_text: text.map(str::to_string),
            sender_identity: sender.to_string(),
            chat_identity: "client_chat".to_string(),
            is_own_business_account: own_account,
            chat_id: 200,
            business_connection_id: Some("bc-1".to_string()),
            update_id: 2,
        }
    }

    #[test]
    fn primary_text_is_answered_under_the_sender_key() {
        let decision = route(&primary_event("u1", Some("hello")), BUSINESS_IDENTITY);
        assert_eq!(
            decision,
            RoutingDecision::Answer {
                key: ConversationKey::user("u1"),
                text: "hello".to_string(),
                channel: ChannelKind::Primary,
            }
        );
    }

    #[test]
    fn own_business_echo_is_log_only_under_the_chat_key() {
        let decision =
            route(&business_event(BUSINESS_IDENTITY, Some("we open at 9"), true), BUSINESS_IDENTITY);
        assert_eq!(
            decision,
            RoutingDecision::LogOnly {
                key: ConversationKey::chat("client_chat"),
                text: "we open at 9".to_string(),
            }
        );
    }

    #[test]
    fn business_client_message_is_answered_under_the_chat_key() {
        let decision = route(&business_event("client", Some("when do you open?"), false), BUSINESS_IDENTITY);
        assert_eq!(
            decision,
            RoutingDecision::Answer {
                key: ConversationKey::chat("client_chat"),
                text: "when do you open?".to_string(),
                channel: ChannelKind::Business,
            }
        );
    }

    #[test]
    fn textless_events_are_rejected() {
        assert_eq!(route(&primary_event("u1", None), BUSINESS_IDENTITY), RoutingDecision::Reject);
        assert_eq!(route(&primary_event("u1", Some("  ")), BUSINESS_IDENTITY), RoutingDecision::Reject);
        assert_eq!(
            route(&business_event("client", None, false), BUSINESS_IDENTITY),
            RoutingDecision::Reject
        );
    }

    #[test]
    fn business_sender_matching_identity_on_a_foreign_connection_is_still_answered() {
        // Both signals are required: a client whose username happens to equal
        // the configured identity must not be silenced.
        let decision =
            route(&business_event(BUSINESS_IDENTITY, Some("hi"), false), BUSINESS_IDENTITY);
        assert!(matches!(decision, RoutingDecision::Answer { .. }));
    }
}
