//! Inbound gateway events as a closed tagged union
//!
//! The waiter registry is keyed by [`EventKind`] rather than by runtime type.
//! Every event is dispatched under its specific kind first and then under the
//! umbrella kinds it belongs to, so a waiter may subscribe to "any
//! message-related event" without the registry walking a type hierarchy.

use derive_more::{Display, From};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};

/// Dispatch tag for an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EventKind {
    /// A reaction was added to a message.
    #[display("reaction_add")]
    ReactionAdd,
    /// A message was sent in a channel.
    #[display("message_create")]
    MessageCreate,
    /// Umbrella kind matched by every message-related event.
    #[display("any_message")]
    AnyMessage,
}

/// The user behind an event, reduced to what authorization needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventUser {
    pub id: UserId,
    pub bot: bool,
}

/// A reaction added to a message.
#[derive(Debug, Clone)]
pub struct ReactionAddEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user: EventUser,
    pub guild_id: Option<GuildId>,
    pub member_roles: Vec<RoleId>,
    /// Unicode emoji as sent by the gateway. Custom emoji never reach the
    /// waiter; the gateway handler filters them out.
    pub emoji: String,
}

/// A message received in a channel.
#[derive(Debug, Clone)]
pub struct MessageCreateEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user: EventUser,
    pub guild_id: Option<GuildId>,
    pub member_roles: Vec<RoleId>,
    pub content: String,
}

/// An inbound event a waiter can match on.
#[derive(Debug, Clone, From)]
pub enum Event {
    ReactionAdd(ReactionAddEvent),
    MessageCreate(MessageCreateEvent),
}

impl Event {
    /// The specific kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ReactionAdd(_) => EventKind::ReactionAdd,
            Self::MessageCreate(_) => EventKind::MessageCreate,
        }
    }

    /// Every kind this event is dispatched under, specific kind first.
    #[must_use]
    pub fn categories(&self) -> [EventKind; 2] {
        [self.kind(), EventKind::AnyMessage]
    }

    /// The acting user.
    #[must_use]
    pub fn author(&self) -> EventUser {
        match self {
            Self::ReactionAdd(e) => e.user,
            Self::MessageCreate(e) => e.user,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::ReactionAdd(e) => e.channel_id,
            Self::MessageCreate(e) => e.channel_id,
        }
    }

    #[must_use]
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::ReactionAdd(e) => e.message_id,
            Self::MessageCreate(e) => e.message_id,
        }
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::ReactionAdd(e) => e.guild_id,
            Self::MessageCreate(e) => e.guild_id,
        }
    }

    /// Role ids of the acting member, empty outside a guild.
    #[must_use]
    pub fn member_roles(&self) -> &[RoleId] {
        match self {
            Self::ReactionAdd(e) => &e.member_roles,
            Self::MessageCreate(e) => &e.member_roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(emoji: &str) -> Event {
        Event::ReactionAdd(ReactionAddEvent {
            channel_id: ChannelId::new(1),
            message_id: MessageId::new(2),
            user: EventUser {
                id: UserId::new(3),
                bot: false,
            },
            guild_id: Some(GuildId::new(4)),
            member_roles: vec![RoleId::new(5)],
            emoji: emoji.to_string(),
        })
    }

    #[test]
    fn test_categories_lead_with_specific_kind() {
        let event = reaction("\u{25B6}");
        assert_eq!(
            event.categories(),
            [EventKind::ReactionAdd, EventKind::AnyMessage]
        );

        let event = Event::MessageCreate(MessageCreateEvent {
            channel_id: ChannelId::new(1),
            message_id: MessageId::new(2),
            user: EventUser {
                id: UserId::new(3),
                bot: false,
            },
            guild_id: None,
            member_roles: Vec::new(),
            content: "2".to_string(),
        });
        assert_eq!(
            event.categories(),
            [EventKind::MessageCreate, EventKind::AnyMessage]
        );
    }

    #[test]
    fn test_common_accessors() {
        let event = reaction("\u{23F9}");
        assert_eq!(event.kind(), EventKind::ReactionAdd);
        assert_eq!(event.channel_id(), ChannelId::new(1));
        assert_eq!(event.message_id(), MessageId::new(2));
        assert_eq!(event.author().id, UserId::new(3));
        assert!(!event.author().bot);
        assert_eq!(event.guild_id(), Some(GuildId::new(4)));
        assert_eq!(event.member_roles(), &[RoleId::new(5)]);
    }
}
