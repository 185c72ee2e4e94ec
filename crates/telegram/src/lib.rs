//! Telegram ingress: event routing, the answer cycle, and the polling loop.
//!
//! Two message sources feed the same conversations: the bot's own chat
//! (primary channel) and a linked business account through which a human
//! admin can reply in the chats the bot serves. The router in
//! [`events`] reconciles both into one decision per update; the handler in
//! [`handler`] runs the full answer cycle; [`runner`] keeps the long-poll
//! loop alive across transport failures.

pub mod events;
pub mod handler;
pub mod runner;
pub mod transport;

pub use events::{route, InboundEvent, RoutingDecision};
pub use handler::{HandlerSettings, MessageHandler};
pub use runner::{PollingRunner, ReconnectPolicy};
pub use transport::{PollingTransport, TransportError, UpdateTransport};
