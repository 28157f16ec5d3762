//! Single-shot numbered or lettered choice menu
//!
//! Unlike the paging widgets there is no loop: the first valid selection
//! resolves the menu, fires that choice's callback and ends. Cancel and
//! timeout fire the final action instead.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Colour, GuildId};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CANCEL, LETTERS, NUMBERS};
use super::{FinalAction, Menu, MenuError, MenuOptions, MenuResult};
use crate::MENU_TARGET;
use crate::events::{Event, EventKind};
use crate::transport::{MenuContent, MessageRef};
use crate::waiter::BoxFuture;

/// Callback fired when a choice is selected.
pub type ChoiceAction = Box<dyn FnOnce(MessageRef) -> BoxFuture + Send + Sync>;

/// One selectable entry; its position decides which emoji triggers it.
pub struct Choice {
    pub name: String,
    action: ChoiceAction,
}

/// A one-shot selection menu resolved by reaction or typed input.
pub struct OrderedMenu {
    options: MenuOptions,
    color: Option<Colour>,
    text: String,
    description: Option<String>,
    choices: Vec<Choice>,
    use_letters: bool,
    allow_typed_input: bool,
    use_cancel: bool,
    guild_id: Option<GuildId>,
}

/// Everything needed to resolve the menu, claimed exactly once by whichever
/// of the selection and the timeout paths runs.
struct ResolveState {
    menu_id: Uuid,
    choices: Vec<Choice>,
    final_action: Option<FinalAction>,
}

impl ResolveState {
    async fn choose(mut self, index: usize, message: MessageRef) {
        if index >= self.choices.len() {
            return;
        }
        let choice = self.choices.swap_remove(index);
        debug!(
            target: MENU_TARGET,
            menu_id = %self.menu_id,
            choice = %choice.name,
            "choice selected"
        );
        (choice.action)(message).await;
    }

    async fn finish(mut self, message: MessageRef) {
        debug!(target: MENU_TARGET, menu_id = %self.menu_id, "menu closed");
        if let Some(final_action) = self.final_action.take() {
            final_action(message).await;
        }
    }
}

fn emoji_table(use_letters: bool) -> &'static [&'static str; 10] {
    if use_letters { &LETTERS } else { &NUMBERS }
}

fn emoji_index(emoji: &str, use_letters: bool) -> Option<usize> {
    emoji_table(use_letters)
        .iter()
        .position(|candidate| *candidate == emoji)
}

/// Map typed content to a 1-based choice number through the fixed lookup
/// tables; anything else is no selection.
fn typed_choice(content: &str, use_letters: bool) -> Option<usize> {
    if use_letters {
        let mut chars = content.chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        " abcdefghij"
            .find(first.to_ascii_lowercase())
            .filter(|&number| number > 0)
    } else if content == "10" {
        Some(10)
    } else {
        let mut chars = content.chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        " 123456789".find(first).filter(|&number| number > 0)
    }
}

impl OrderedMenu {
    #[must_use]
    pub fn builder(options: MenuOptions) -> OrderedMenuBuilder {
        OrderedMenuBuilder::new(options)
    }

    fn render(&self) -> MenuContent {
        let mut description = self.description.clone().unwrap_or_default();
        for (index, choice) in self.choices.iter().enumerate() {
            description.push_str(&format!(
                "\n{} {}",
                emoji_table(self.use_letters)[index],
                choice.name
            ));
        }
        MenuContent {
            text: self.text.clone(),
            description,
            color: self.color,
            ..Default::default()
        }
    }

    /// Valid selection: a choice (or cancel) emoji on the menu message, or a
    /// typed choice number in range, from an authorized user.
    fn selection_condition(
        &self,
        message: MessageRef,
    ) -> impl Fn(&Event) -> bool + Send + Sync + 'static {
        let auth = Arc::new(self.options.auth.clone());
        let count = self.choices.len();
        let use_letters = self.use_letters;
        let use_cancel = self.use_cancel;
        let allow_typed = self.allow_typed_input;
        move |event: &Event| match event {
            Event::ReactionAdd(reaction) => {
                reaction.message_id == message.message_id
                    && auth.allows(reaction.user, reaction.guild_id, &reaction.member_roles)
                    && ((use_cancel && reaction.emoji == CANCEL)
                        || emoji_index(&reaction.emoji, use_letters)
                            .is_some_and(|index| index < count))
            }
            Event::MessageCreate(received) => {
                allow_typed
                    && received.channel_id == message.channel_id
                    && auth.allows(received.user, received.guild_id, &received.member_roles)
                    && typed_choice(received.content.trim(), use_letters)
                        .is_some_and(|number| number >= 1 && number <= count)
            }
        }
    }

    /// Attach the choice reactions and register the one-shot waiter. A
    /// reaction failure aborts the remaining attachments; the menu still
    /// waits on whatever input is left.
    async fn arm(mut self, message: MessageRef) {
        let mut emojis: Vec<&str> = (0..self.choices.len())
            .map(|index| emoji_table(self.use_letters)[index])
            .collect();
        if self.use_cancel {
            emojis.push(CANCEL);
        }
        for emoji in emojis {
            if let Err(error) = self.options.transport.react(message, emoji).await {
                warn!(
                    target: MENU_TARGET,
                    menu_id = %self.options.id,
                    %error,
                    "failed to attach choice reaction, waiting on what made it on"
                );
                break;
            }
        }

        let kind = if self.allow_typed_input {
            EventKind::AnyMessage
        } else {
            EventKind::ReactionAdd
        };
        let condition = self.selection_condition(message);
        let use_letters = self.use_letters;
        let use_cancel = self.use_cancel;

        let state = Arc::new(Mutex::new(Some(ResolveState {
            menu_id: self.options.id,
            choices: self.choices,
            final_action: self.options.final_action.take(),
        })));
        let selection_state = Arc::clone(&state);
        let timeout_state = state;

        self.options.waiter.wait_for_with_timeout(
            kind,
            self.options.timeout,
            condition,
            move |event: Event| async move {
                let Some(resolve) = selection_state.lock().await.take() else {
                    return;
                };
                match &event {
                    Event::ReactionAdd(reaction) if use_cancel && reaction.emoji == CANCEL => {
                        resolve.finish(message).await;
                    }
                    Event::ReactionAdd(reaction) => {
                        if let Some(index) = emoji_index(&reaction.emoji, use_letters) {
                            resolve.choose(index, message).await;
                        }
                    }
                    Event::MessageCreate(received) => {
                        if let Some(number) = typed_choice(received.content.trim(), use_letters) {
                            resolve.choose(number - 1, message).await;
                        }
                    }
                }
            },
            move || async move {
                let Some(resolve) = timeout_state.lock().await.take() else {
                    return;
                };
                resolve.finish(message).await;
            },
        );
    }
}

#[async_trait]
impl Menu for OrderedMenu {
    /// Sends the menu and returns once it is armed; resolution happens
    /// asynchronously when the selection arrives.
    ///
    /// # Errors
    /// Fails fast when the bot cannot add reactions in `channel_id` and
    /// typed input is disallowed, since nobody could ever answer the menu.
    async fn display_in(self, channel_id: ChannelId) -> MenuResult<()> {
        if !self.allow_typed_input
            && !self
                .options
                .transport
                .can_add_reactions(self.guild_id, channel_id)
                .await
        {
            return Err(MenuError::ReactionsUnavailable);
        }
        let message = self.options.transport.send(channel_id, &self.render()).await?;
        self.arm(message).await;
        Ok(())
    }

    async fn display_as(self, message: MessageRef) -> MenuResult<()> {
        if !self.allow_typed_input
            && !self
                .options
                .transport
                .can_add_reactions(self.guild_id, message.channel_id)
                .await
        {
            return Err(MenuError::ReactionsUnavailable);
        }
        self.options.transport.edit(message, &self.render()).await?;
        self.arm(message).await;
        Ok(())
    }
}

/// Builder for [`OrderedMenu`]. `build` is the single validation point.
pub struct OrderedMenuBuilder {
    options: MenuOptions,
    color: Option<Colour>,
    text: String,
    description: Option<String>,
    choices: Vec<Choice>,
    use_letters: bool,
    allow_typed_input: bool,
    use_cancel: bool,
    guild_id: Option<GuildId>,
}

impl OrderedMenuBuilder {
    fn new(options: MenuOptions) -> Self {
        Self {
            options,
            color: None,
            text: String::new(),
            description: None,
            choices: Vec::new(),
            use_letters: false,
            allow_typed_input: true,
            use_cancel: false,
            guild_id: None,
        }
    }

    #[must_use]
    pub fn color(mut self, color: Colour) -> Self {
        self.color = Some(color);
        self
    }

    /// Plain message text above the embed.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a selectable entry. At most 10 fit on a menu.
    #[must_use]
    pub fn choice<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(MessageRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.choices.push(Choice {
            name: name.into(),
            action: Box::new(move |message: MessageRef| -> BoxFuture {
                Box::pin(action(message))
            }),
        });
        self
    }

    /// Use letter emoji instead of numbers.
    #[must_use]
    pub fn use_letters(mut self, use_letters: bool) -> Self {
        self.use_letters = use_letters;
        self
    }

    /// Accept typed choice numbers/letters alongside reactions.
    #[must_use]
    pub fn allow_typed_input(mut self, allow_typed_input: bool) -> Self {
        self.allow_typed_input = allow_typed_input;
        self
    }

    /// Append a cancel icon resolving straight to the final action.
    #[must_use]
    pub fn use_cancel(mut self, use_cancel: bool) -> Self {
        self.use_cancel = use_cancel;
        self
    }

    /// Guild context for the reaction-permission probe.
    #[must_use]
    pub fn guild(mut self, guild_id: Option<GuildId>) -> Self {
        self.guild_id = guild_id;
        self
    }

    /// Validate the configuration and produce the widget.
    ///
    /// # Errors
    /// Returns an error unless there are between 1 and 10 choices.
    pub fn build(self) -> MenuResult<OrderedMenu> {
        if self.choices.is_empty() || self.choices.len() > 10 {
            return Err(MenuError::ChoiceCount(self.choices.len()));
        }
        Ok(OrderedMenu {
            options: self.options,
            color: self.color,
            text: self.text,
            description: self.description,
            choices: self.choices,
            use_letters: self.use_letters,
            allow_typed_input: self.allow_typed_input,
            use_cancel: self.use_cancel,
            guild_id: self.guild_id,
        })
    }
}
