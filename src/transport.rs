//! Chat-platform access behind a narrow seam
//!
//! Menus talk to Discord exclusively through [`MenuTransport`]: send or edit
//! a message, add or remove a single reaction, delete a message, and probe
//! whether reactions can be added at all. Keeping the surface this small is
//! what lets the whole widget layer run against an in-memory double.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use poise::serenity_prelude::{
    self as serenity, Cache, ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage,
    EditMessage, GuildId, Http, MessageId, ReactionType, UserId,
};
use thiserror::Error;

/// A message a menu owns, reduced to its addressable ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// One embed field of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered menu page as plain data.
///
/// Widgets produce these and transports turn them into platform payloads,
/// so rendering stays pure and directly comparable in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuContent {
    /// Plain message content shown above the embed, empty for none.
    pub text: String,
    /// Embed body.
    pub description: String,
    /// Side-by-side columns for multi-column pages.
    pub fields: Vec<EmbedField>,
    pub color: Option<Colour>,
    pub footer: Option<String>,
    /// Image url for slideshow pages.
    pub image: Option<String>,
}

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bot lacks permission for the request.
    #[error("missing permission for the request")]
    MissingPermission,

    /// Any other Discord API failure.
    #[error("discord api error: {0}")]
    Api(#[from] Box<serenity::Error>),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// The platform operations a menu needs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MenuTransport: Send + Sync {
    /// Send `content` as a new message in `channel_id`.
    async fn send(&self, channel_id: ChannelId, content: &MenuContent) -> TransportResult<MessageRef>;

    /// Replace `message` with `content`.
    async fn edit(&self, message: MessageRef, content: &MenuContent) -> TransportResult<()>;

    /// Add a unicode emoji reaction to `message`.
    async fn react(&self, message: MessageRef, emoji: &str) -> TransportResult<()>;

    /// Remove `user_id`'s reaction from `message`.
    async fn unreact(&self, message: MessageRef, emoji: &str, user_id: UserId) -> TransportResult<()>;

    /// Delete `message`.
    async fn delete_message(&self, message: MessageRef) -> TransportResult<()>;

    /// Whether the bot may add reactions in `channel_id`. Used to fail fast
    /// instead of attaching a menu nobody can interact with.
    async fn can_add_reactions(&self, guild_id: Option<GuildId>, channel_id: ChannelId) -> bool;
}

/// Production transport over the serenity HTTP client and cache.
pub struct SerenityTransport {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityTransport {
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    /// Permission probe from the cache. Unknown guilds, channels or members
    /// resolve optimistically; the API call itself is the final arbiter.
    fn cached_reaction_permission(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let Some(guild) = self.cache.guild(guild_id) else {
            return true;
        };
        let Some(channel) = guild.channels.get(&channel_id) else {
            return true;
        };
        let current_user_id = self.cache.current_user().id;
        let Some(member) = guild.members.get(&current_user_id) else {
            return true;
        };
        guild
            .user_permissions_in(channel, member)
            .contains(serenity::Permissions::ADD_REACTIONS)
    }
}

fn map_api_error(error: serenity::Error) -> TransportError {
    if let serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(ref response)) = error {
        if response.status_code.as_u16() == 403 {
            return TransportError::MissingPermission;
        }
    }
    TransportError::Api(Box::new(error))
}

// Discord rejects empty embed field names and values.
fn field_text(text: &str) -> String {
    if text.is_empty() {
        "\u{200b}".to_string()
    } else {
        text.to_string()
    }
}

fn build_embed(content: &MenuContent) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if !content.description.is_empty() {
        embed = embed.description(content.description.clone());
    }
    for field in &content.fields {
        embed = embed.field(field_text(&field.name), field_text(&field.value), field.inline);
    }
    if let Some(color) = content.color {
        embed = embed.colour(color);
    }
    if let Some(footer) = &content.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer.clone()));
    }
    if let Some(image) = &content.image {
        embed = embed.image(image.clone());
    }
    embed
}

#[async_trait]
impl MenuTransport for SerenityTransport {
    async fn send(&self, channel_id: ChannelId, content: &MenuContent) -> TransportResult<MessageRef> {
        let builder = CreateMessage::new()
            .content(content.text.clone())
            .embed(build_embed(content));
        let message = channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(map_api_error)?;
        Ok(MessageRef {
            channel_id,
            message_id: message.id,
        })
    }

    async fn edit(&self, message: MessageRef, content: &MenuContent) -> TransportResult<()> {
        let builder = EditMessage::new()
            .content(content.text.clone())
            .embed(build_embed(content));
        message
            .channel_id
            .edit_message(&self.http, message.message_id, builder)
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn react(&self, message: MessageRef, emoji: &str) -> TransportResult<()> {
        message
            .channel_id
            .create_reaction(
                &self.http,
                message.message_id,
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(map_api_error)
    }

    async fn unreact(&self, message: MessageRef, emoji: &str, user_id: UserId) -> TransportResult<()> {
        message
            .channel_id
            .delete_reaction(
                &self.http,
                message.message_id,
                Some(user_id),
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(map_api_error)
    }

    async fn delete_message(&self, message: MessageRef) -> TransportResult<()> {
        message
            .channel_id
            .delete_message(&self.http, message.message_id)
            .await
            .map_err(map_api_error)
    }

    async fn can_add_reactions(&self, guild_id: Option<GuildId>, channel_id: ChannelId) -> bool {
        match guild_id {
            Some(guild_id) => self.cached_reaction_permission(guild_id, channel_id),
            // Reactions are always available in direct messages.
            None => true,
        }
    }
}
