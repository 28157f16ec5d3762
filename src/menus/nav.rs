//! The render → wait → handle loop shared by Paginator and Slideshow
//!
//! Both widgets run the same state machine over different renderers: show a
//! page, wait for the next valid reaction or typed input, compute the target
//! page, re-render, until stop or timeout. Input handling per widget is
//! strictly sequential; the next waiter is registered only after the
//! previous input has been fully handled.

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::ChannelId;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{BIG_LEFT, BIG_RIGHT, LEFT, MenuAuth, RIGHT, STOP};
use super::{FinalAction, MenuResult, bulk_step, step_back, step_forward};
use crate::MENU_TARGET;
use crate::events::{Event, EventKind};
use crate::transport::{MenuContent, MenuTransport, MessageRef};
use crate::waiter::EventWaiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavButton {
    BulkLeft,
    Left,
    Stop,
    Right,
    BulkRight,
}

fn nav_button(emoji: &str, bulk_enabled: bool) -> Option<NavButton> {
    match emoji {
        LEFT => Some(NavButton::Left),
        STOP => Some(NavButton::Stop),
        RIGHT => Some(NavButton::Right),
        BIG_LEFT if bulk_enabled => Some(NavButton::BulkLeft),
        BIG_RIGHT if bulk_enabled => Some(NavButton::BulkRight),
        _ => None,
    }
}

fn keyword_eq(content: &str, keyword: Option<&str>) -> bool {
    keyword.is_some_and(|keyword| content.to_lowercase() == keyword.to_lowercase())
}

/// Where one round of input sends the loop.
enum NavInput {
    Stop,
    Goto(usize),
}

/// One live paging session. Built by a widget's `display_*` entry point and
/// consumed by [`start_in`](NavLoop::start_in) / [`start_as`](NavLoop::start_as).
pub(crate) struct NavLoop<'a, R>
where
    R: Fn(usize) -> MenuContent,
{
    pub waiter: &'a EventWaiter,
    pub transport: &'a Arc<dyn MenuTransport>,
    pub auth: Arc<MenuAuth>,
    pub menu_id: Uuid,
    pub timeout: Duration,
    pub pages: usize,
    pub bulk_skip: usize,
    pub wrap_page_ends: bool,
    pub wait_on_single_page: bool,
    pub allow_text_input: bool,
    pub left_keyword: Option<String>,
    pub right_keyword: Option<String>,
    pub render: R,
    pub final_action: Option<FinalAction>,
}

impl<R> NavLoop<'_, R>
where
    R: Fn(usize) -> MenuContent,
{
    pub(crate) async fn start_in(self, channel_id: ChannelId) -> MenuResult<()> {
        let message = self.transport.send(channel_id, &(self.render)(1)).await?;
        self.begin(message).await
    }

    pub(crate) async fn start_as(self, message: MessageRef) -> MenuResult<()> {
        self.transport.edit(message, &(self.render)(1)).await?;
        self.begin(message).await
    }

    async fn begin(mut self, message: MessageRef) -> MenuResult<()> {
        if self.pages > 1 {
            self.attach_controls(message).await;
            self.run(message).await
        } else if self.wait_on_single_page {
            if let Err(error) = self.transport.react(message, STOP).await {
                warn!(
                    target: MENU_TARGET,
                    menu_id = %self.menu_id,
                    %error,
                    "failed to attach stop reaction"
                );
            }
            self.run(message).await
        } else {
            // Nothing to navigate: the lifecycle ends before it begins.
            self.finish(message).await;
            Ok(())
        }
    }

    /// Attach the navigation reactions, best-effort. A failure aborts the
    /// remaining attachments; the loop still runs with whatever made it on.
    async fn attach_controls(&self, message: MessageRef) {
        let mut controls = Vec::with_capacity(5);
        if self.bulk_skip > 1 {
            controls.push(BIG_LEFT);
        }
        controls.extend([LEFT, STOP, RIGHT]);
        if self.bulk_skip > 1 {
            controls.push(BIG_RIGHT);
        }
        for emoji in controls {
            if let Err(error) = self.transport.react(message, emoji).await {
                warn!(
                    target: MENU_TARGET,
                    menu_id = %self.menu_id,
                    %error,
                    "failed to attach navigation reaction"
                );
                break;
            }
        }
    }

    async fn run(mut self, message: MessageRef) -> MenuResult<()> {
        let mut page = 1;
        loop {
            let Some(event) = self.await_input(message, page).await else {
                self.finish(message).await;
                return Ok(());
            };
            match self.resolve_input(&event, page) {
                NavInput::Stop => {
                    self.finish(message).await;
                    return Ok(());
                }
                NavInput::Goto(target) => {
                    self.clean_up_input(message, &event).await;
                    debug!(
                        target: MENU_TARGET,
                        menu_id = %self.menu_id,
                        from = page,
                        to = target,
                        "navigating"
                    );
                    if let Err(error) = self.transport.edit(message, &(self.render)(target)).await {
                        warn!(
                            target: MENU_TARGET,
                            menu_id = %self.menu_id,
                            %error,
                            "failed to edit menu page"
                        );
                    }
                    page = target;
                }
            }
        }
    }

    fn text_input_enabled(&self) -> bool {
        self.allow_text_input || (self.left_keyword.is_some() && self.right_keyword.is_some())
    }

    async fn await_input(&self, message: MessageRef, page: usize) -> Option<Event> {
        let kind = if self.text_input_enabled() {
            EventKind::AnyMessage
        } else {
            EventKind::ReactionAdd
        };
        let condition = self.input_condition(message, page);
        self.waiter.receive(kind, Some(self.timeout), condition).await
    }

    /// Valid input: an attached navigation emoji on the displayed message,
    /// or (in text mode) the left/right keyword or an in-range page number
    /// different from the current page, always from an authorized user.
    fn input_condition(
        &self,
        message: MessageRef,
        page: usize,
    ) -> impl Fn(&Event) -> bool + Send + Sync + 'static {
        let auth = Arc::clone(&self.auth);
        let bulk_enabled = self.bulk_skip > 1;
        let pages = self.pages;
        let allow_numbers = self.allow_text_input;
        let left_keyword = self.left_keyword.clone();
        let right_keyword = self.right_keyword.clone();
        let keywords_active = left_keyword.is_some() && right_keyword.is_some();
        move |event: &Event| match event {
            Event::ReactionAdd(reaction) => {
                reaction.message_id == message.message_id
                    && nav_button(&reaction.emoji, bulk_enabled).is_some()
                    && auth.allows(reaction.user, reaction.guild_id, &reaction.member_roles)
            }
            Event::MessageCreate(received) => {
                if received.channel_id != message.channel_id {
                    return false;
                }
                let content = received.content.trim();
                let keyword = keywords_active
                    && (keyword_eq(content, left_keyword.as_deref())
                        || keyword_eq(content, right_keyword.as_deref()));
                let number = allow_numbers
                    && content
                        .parse::<usize>()
                        .is_ok_and(|n| (1..=pages).contains(&n) && n != page);
                (keyword || number)
                    && auth.allows(received.user, received.guild_id, &received.member_roles)
            }
        }
    }

    fn resolve_input(&self, event: &Event, page: usize) -> NavInput {
        match event {
            Event::ReactionAdd(reaction) => {
                match nav_button(&reaction.emoji, self.bulk_skip > 1) {
                    Some(NavButton::Left) => {
                        NavInput::Goto(step_back(page, self.pages, self.wrap_page_ends))
                    }
                    Some(NavButton::Right) => {
                        NavInput::Goto(step_forward(page, self.pages, self.wrap_page_ends))
                    }
                    Some(NavButton::BulkLeft) => NavInput::Goto(bulk_step(
                        page,
                        self.pages,
                        self.wrap_page_ends,
                        self.bulk_skip,
                        true,
                    )),
                    Some(NavButton::BulkRight) => NavInput::Goto(bulk_step(
                        page,
                        self.pages,
                        self.wrap_page_ends,
                        self.bulk_skip,
                        false,
                    )),
                    Some(NavButton::Stop) | None => NavInput::Stop,
                }
            }
            Event::MessageCreate(received) => {
                let content = received.content.trim();
                if keyword_eq(content, self.left_keyword.as_deref()) {
                    NavInput::Goto(step_back(page, self.pages, self.wrap_page_ends))
                } else if keyword_eq(content, self.right_keyword.as_deref()) {
                    NavInput::Goto(step_forward(page, self.pages, self.wrap_page_ends))
                } else if let Ok(target) = content.parse::<usize>() {
                    NavInput::Goto(target.clamp(1, self.pages))
                } else {
                    // Unreachable given the condition, but harmless.
                    NavInput::Goto(page)
                }
            }
        }
    }

    /// Tidy the input away: remove the used reaction, or delete the typed
    /// message. Both are best-effort.
    async fn clean_up_input(&self, message: MessageRef, event: &Event) {
        match event {
            Event::ReactionAdd(reaction) => {
                let _ = self
                    .transport
                    .unreact(message, &reaction.emoji, reaction.user.id)
                    .await;
            }
            Event::MessageCreate(received) => {
                let _ = self
                    .transport
                    .delete_message(MessageRef {
                        channel_id: received.channel_id,
                        message_id: received.message_id,
                    })
                    .await;
            }
        }
    }

    async fn finish(&mut self, message: MessageRef) {
        debug!(target: MENU_TARGET, menu_id = %self.menu_id, "menu closed");
        if let Some(final_action) = self.final_action.take() {
            final_action(message).await;
        }
    }
}
