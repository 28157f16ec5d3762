//! Gateway listeners feeding inbound events into the waiter registry

use poise::serenity_prelude::{
    self as serenity, Context, EventHandler, GuildId, Message, Reaction, ReactionType, Ready,
};
use tracing::{info, warn};

use crate::events::{Event, EventUser, MessageCreateEvent, ReactionAddEvent};
use crate::waiter::EventWaiter;

pub struct Handler {
    waiter: EventWaiter,
}

impl Handler {
    #[must_use]
    pub fn new(waiter: EventWaiter) -> Self {
        Self { waiter }
    }
}

/// Reduce a gateway reaction to a waiter event. Custom emoji and reactions
/// without an acting user are not something any menu waits on.
fn reaction_event(reaction: &Reaction) -> Option<Event> {
    let ReactionType::Unicode(emoji) = &reaction.emoji else {
        return None;
    };
    let user_id = reaction.user_id?;
    let bot = reaction
        .member
        .as_ref()
        .is_some_and(|member| member.user.bot);
    let member_roles = reaction
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();
    Some(Event::ReactionAdd(ReactionAddEvent {
        channel_id: reaction.channel_id,
        message_id: reaction.message_id,
        user: EventUser { id: user_id, bot },
        guild_id: reaction.guild_id,
        member_roles,
        emoji: emoji.clone(),
    }))
}

fn message_event(message: &Message) -> Event {
    let member_roles = message
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();
    Event::MessageCreate(MessageCreateEvent {
        channel_id: message.channel_id,
        message_id: message.id,
        user: EventUser {
            id: message.author.id,
            bot: message.author.bot,
        },
        guild_id: message.guild_id,
        member_roles,
        content: message.content.clone(),
    })
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn reaction_add(&self, _ctx: Context, add_reaction: Reaction) {
        if let Some(event) = reaction_event(&add_reaction) {
            self.waiter.handle(event);
        }
    }

    async fn message(&self, _ctx: Context, new_message: Message) {
        self.waiter.handle(message_event(&new_message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Gateway payload types are too large to construct by hand, so the
    // conversion paths are covered indirectly by the widget tests; here we
    // verify at compile time that Handler is wired as an event handler.
    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }

    #[test]
    fn test_handler_creation() {
        let waiter = EventWaiter::new();
        let handler = Handler::new(waiter.clone());
        assert_eq!(handler.waiter.pending(), 0);
    }
}
