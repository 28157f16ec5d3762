//! Paged list widget
//!
//! Renders a list of items page by page and loops on the shared navigation
//! state machine until stopped or timed out.

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Colour};
use std::sync::Arc;

use super::nav::NavLoop;
use super::{Menu, MenuError, MenuOptions, MenuResult};
use crate::transport::{EmbedField, MenuContent, MessageRef};

type PageTextFn = Box<dyn Fn(usize, usize) -> Option<String> + Send + Sync>;
type PageColorFn = Box<dyn Fn(usize, usize) -> Option<Colour> + Send + Sync>;

/// A paged list renderer over reaction navigation.
pub struct Paginator {
    options: MenuOptions,
    items: Vec<String>,
    columns: usize,
    items_per_page: usize,
    number_items: bool,
    show_page_numbers: bool,
    wait_on_single_page: bool,
    bulk_skip: usize,
    wrap_page_ends: bool,
    left_keyword: Option<String>,
    right_keyword: Option<String>,
    allow_text_input: bool,
    page_text: Option<PageTextFn>,
    page_color: Option<PageColorFn>,
    pages: usize,
}

impl Paginator {
    #[must_use]
    pub fn builder(options: MenuOptions) -> PaginatorBuilder {
        PaginatorBuilder::new(options)
    }

    /// Total number of pages.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Render a single page. Pure: the same page renders identically every
    /// time.
    #[must_use]
    pub fn render_page(&self, page: usize) -> MenuContent {
        let start = (page - 1) * self.items_per_page;
        let end = usize::min(self.items.len(), page * self.items_per_page);

        let mut content = MenuContent::default();
        if let Some(page_text) = &self.page_text {
            if let Some(text) = page_text(page, self.pages) {
                content.text = text;
            }
        }

        if self.columns == 1 {
            let mut description = String::new();
            for (offset, item) in self.items[start..end].iter().enumerate() {
                description.push('\n');
                if self.number_items {
                    description.push_str(&format!("`{}.`", start + offset + 1));
                }
                description.push_str(item);
            }
            content.description = description;
        } else {
            let per_column = (end - start).div_ceil(self.columns);
            for column in 0..self.columns {
                let mut value = String::new();
                let column_start = start + column * per_column;
                let column_end = usize::min(end, start + (column + 1) * per_column);
                for index in column_start..column_end {
                    value.push('\n');
                    if self.number_items {
                        value.push_str(&format!("{}. ", index + 1));
                    }
                    value.push_str(&self.items[index]);
                }
                content.fields.push(EmbedField {
                    name: String::new(),
                    value,
                    inline: true,
                });
            }
        }

        if let Some(page_color) = &self.page_color {
            content.color = page_color(page, self.pages);
        }
        if self.show_page_numbers {
            content.footer = Some(format!("Page {page}/{}", self.pages));
        }
        content
    }

    fn into_nav(&mut self) -> NavLoop<'_, impl Fn(usize) -> MenuContent + '_> {
        let final_action = self.options.final_action.take();
        NavLoop {
            waiter: &self.options.waiter,
            transport: &self.options.transport,
            auth: Arc::new(self.options.auth.clone()),
            menu_id: self.options.id,
            timeout: self.options.timeout,
            pages: self.pages,
            bulk_skip: self.bulk_skip,
            wrap_page_ends: self.wrap_page_ends,
            wait_on_single_page: self.wait_on_single_page,
            allow_text_input: self.allow_text_input,
            left_keyword: self.left_keyword.clone(),
            right_keyword: self.right_keyword.clone(),
            render: |page| self.render_page(page),
            final_action,
        }
    }
}

#[async_trait]
impl Menu for Paginator {
    async fn display_in(mut self, channel_id: ChannelId) -> MenuResult<()> {
        self.into_nav().start_in(channel_id).await
    }

    async fn display_as(mut self, message: MessageRef) -> MenuResult<()> {
        self.into_nav().start_as(message).await
    }
}

/// Builder for [`Paginator`]. `build` is the single validation point.
pub struct PaginatorBuilder {
    options: MenuOptions,
    items: Vec<String>,
    columns: usize,
    items_per_page: usize,
    number_items: bool,
    show_page_numbers: bool,
    wait_on_single_page: bool,
    bulk_skip: usize,
    wrap_page_ends: bool,
    left_keyword: Option<String>,
    right_keyword: Option<String>,
    allow_text_input: bool,
    page_text: Option<PageTextFn>,
    page_color: Option<PageColorFn>,
}

impl PaginatorBuilder {
    fn new(options: MenuOptions) -> Self {
        Self {
            options,
            items: Vec::new(),
            columns: 1,
            items_per_page: 10,
            number_items: false,
            show_page_numbers: true,
            wait_on_single_page: false,
            bulk_skip: 1,
            wrap_page_ends: false,
            left_keyword: None,
            right_keyword: None,
            allow_text_input: false,
            page_text: None,
            page_color: None,
        }
    }

    #[must_use]
    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.items.push(item.into());
        self
    }

    #[must_use]
    pub fn items(mut self, items: impl IntoIterator<Item = String>) -> Self {
        self.items.extend(items);
        self
    }

    /// Side-by-side columns per page, 1 through 3.
    #[must_use]
    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn items_per_page(mut self, items_per_page: usize) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    /// Prefix each item with its 1-based ordinal.
    #[must_use]
    pub fn number_items(mut self, number_items: bool) -> Self {
        self.number_items = number_items;
        self
    }

    #[must_use]
    pub fn show_page_numbers(mut self, show_page_numbers: bool) -> Self {
        self.show_page_numbers = show_page_numbers;
        self
    }

    /// Keep the menu interactive even when everything fits on one page.
    #[must_use]
    pub fn wait_on_single_page(mut self, wait_on_single_page: bool) -> Self {
        self.wait_on_single_page = wait_on_single_page;
        self
    }

    /// Pages jumped by the fast-skip reactions; values below 1 mean no bulk
    /// skip.
    #[must_use]
    pub fn bulk_skip(mut self, bulk_skip: usize) -> Self {
        self.bulk_skip = usize::max(bulk_skip, 1);
        self
    }

    #[must_use]
    pub fn wrap_page_ends(mut self, wrap_page_ends: bool) -> Self {
        self.wrap_page_ends = wrap_page_ends;
        self
    }

    /// Typed keywords navigating one page left/right. Both must be set for
    /// keyword input to be active.
    #[must_use]
    pub fn keywords(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_keyword = Some(left.into());
        self.right_keyword = Some(right.into());
        self
    }

    /// Accept typed page numbers.
    #[must_use]
    pub fn allow_text_input(mut self, allow_text_input: bool) -> Self {
        self.allow_text_input = allow_text_input;
        self
    }

    /// Plain message text above the embed, recomputed per page.
    #[must_use]
    pub fn page_text<F>(mut self, page_text: F) -> Self
    where
        F: Fn(usize, usize) -> Option<String> + Send + Sync + 'static,
    {
        self.page_text = Some(Box::new(page_text));
        self
    }

    /// Embed color, recomputed per page.
    #[must_use]
    pub fn page_color<F>(mut self, page_color: F) -> Self
    where
        F: Fn(usize, usize) -> Option<Colour> + Send + Sync + 'static,
    {
        self.page_color = Some(Box::new(page_color));
        self
    }

    /// Validate the configuration and produce the widget.
    ///
    /// # Errors
    /// Returns an error when no items were added, `items_per_page` is zero,
    /// or `columns` is outside 1..=3.
    pub fn build(self) -> MenuResult<Paginator> {
        if self.items.is_empty() {
            return Err(MenuError::NoItems);
        }
        if self.items_per_page == 0 {
            return Err(MenuError::ItemsPerPage);
        }
        if !(1..=3).contains(&self.columns) {
            return Err(MenuError::Columns(self.columns));
        }
        let pages = self.items.len().div_ceil(self.items_per_page);
        Ok(Paginator {
            options: self.options,
            items: self.items,
            columns: self.columns,
            items_per_page: self.items_per_page,
            number_items: self.number_items,
            show_page_numbers: self.show_page_numbers,
            wait_on_single_page: self.wait_on_single_page,
            bulk_skip: self.bulk_skip,
            wrap_page_ends: self.wrap_page_ends,
            left_keyword: self.left_keyword,
            right_keyword: self.right_keyword,
            allow_text_input: self.allow_text_input,
            page_text: self.page_text,
            page_color: self.page_color,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{LEFT, RIGHT, STOP};
    use super::*;
    use crate::events::{Event, EventUser, MessageCreateEvent, ReactionAddEvent};
    use crate::transport::MenuTransport;
    use crate::transport::testing::FakeTransport;
    use crate::waiter::EventWaiter;
    use poise::serenity_prelude::{GuildId, MessageId, UserId};
    use std::sync::atomic::{AtomicBool, Ordering};

    const CHANNEL: u64 = 10;
    const MESSAGE: u64 = 1;

    fn options(waiter: &EventWaiter, transport: &Arc<FakeTransport>) -> MenuOptions {
        let transport: Arc<dyn MenuTransport> = Arc::clone(transport);
        MenuOptions::new(waiter.clone(), transport)
    }

    fn numbered_items(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("item {i}")).collect()
    }

    fn reaction(user_id: u64, bot: bool, emoji: &str) -> Event {
        Event::ReactionAdd(ReactionAddEvent {
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(MESSAGE),
            user: EventUser {
                id: UserId::new(user_id),
                bot,
            },
            guild_id: Some(GuildId::new(20)),
            member_roles: Vec::new(),
            emoji: emoji.to_string(),
        })
    }

    fn typed(user_id: u64, content: &str) -> Event {
        Event::MessageCreate(MessageCreateEvent {
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(77),
            user: EventUser {
                id: UserId::new(user_id),
                bot: false,
            },
            guild_id: Some(GuildId::new(20)),
            member_roles: Vec::new(),
            content: content.to_string(),
        })
    }

    fn footer(content: &MenuContent) -> &str {
        content.footer.as_deref().unwrap_or("")
    }

    async fn until(check: impl Fn() -> bool) {
        for _ in 0..5000 {
            if check() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("widget never reached the expected state");
    }

    /// Wait until the widget has finished handling input and is listening
    /// again.
    async fn settled(waiter: &EventWaiter, transport: &Arc<FakeTransport>, edits: usize) {
        until(|| transport.edit_count() == edits).await;
        until(|| waiter.pending() == 1).await;
    }

    #[test]
    fn test_build_rejects_empty_items() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let result = Paginator::builder(options(&waiter, &transport)).build();
        assert!(matches!(result, Err(MenuError::NoItems)));
    }

    #[test]
    fn test_build_rejects_bad_layout() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let result = Paginator::builder(options(&waiter, &transport))
            .item("a")
            .columns(4)
            .build();
        assert!(matches!(result, Err(MenuError::Columns(4))));

        let result = Paginator::builder(options(&waiter, &transport))
            .item("a")
            .items_per_page(0)
            .build();
        assert!(matches!(result, Err(MenuError::ItemsPerPage)));
    }

    #[test]
    fn test_page_count_rounds_up() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .build()
            .unwrap();
        assert_eq!(paginator.pages(), 3);
    }

    #[test]
    fn test_render_is_idempotent() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .number_items(true)
            .page_color(|_, _| Some(Colour::new(0x00FF_00FF)))
            .build()
            .unwrap();
        assert_eq!(paginator.render_page(2), paginator.render_page(2));
    }

    #[test]
    fn test_render_single_column_layout() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .number_items(true)
            .build()
            .unwrap();
        let page = paginator.render_page(3);
        assert!(page.description.starts_with("\n`21.`item 21"));
        assert!(page.description.ends_with("`25.`item 25"));
        assert!(page.fields.is_empty());
        assert_eq!(page.footer.as_deref(), Some("Page 3/3"));
    }

    #[test]
    fn test_render_distributes_columns() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(9))
            .items_per_page(9)
            .columns(3)
            .build()
            .unwrap();
        let page = paginator.render_page(1);
        assert!(page.description.is_empty());
        assert_eq!(page.fields.len(), 3);
        assert!(page.fields.iter().all(|field| field.inline));
        assert_eq!(page.fields[0].value, "\nitem 1\nitem 2\nitem 3");
        assert_eq!(page.fields[2].value, "\nitem 7\nitem 8\nitem 9");
    }

    #[tokio::test]
    async fn test_right_advances_and_clamps_at_last_page() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;
        assert_eq!(transport.reactions(), vec![LEFT, STOP, RIGHT]);

        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 2/3");

        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 2).await;
        assert_eq!(footer(&transport.edits()[1]), "Page 3/3");

        // No wrap: pressing right on the last page stays there.
        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 3).await;
        assert_eq!(footer(&transport.edits()[2]), "Page 3/3");

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
        assert_eq!(waiter.pending(), 0);
    }

    #[tokio::test]
    async fn test_wrap_page_ends_wraps_both_directions() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .wrap_page_ends(true)
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;

        // Left from page 1 wraps to the last page.
        waiter.dispatch(reaction(5, false, LEFT)).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 3/3");

        // Right from the last page wraps back to 1.
        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 2).await;
        assert_eq!(footer(&transport.edits()[1]), "Page 1/3");

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bulk_skip_reactions_and_used_reaction_removal() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(100))
            .items_per_page(10)
            .bulk_skip(3)
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;
        assert_eq!(
            transport.reactions(),
            vec![super::super::BIG_LEFT, LEFT, STOP, RIGHT, super::super::BIG_RIGHT]
        );

        // Page 1, bulk right with skip 3 lands on page 4.
        waiter.dispatch(reaction(5, false, super::super::BIG_RIGHT)).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 4/10");

        // The used reaction was removed for the user, best-effort.
        let unreacts = transport
            .calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    crate::transport::testing::TransportCall::Unreact { .. }
                )
            })
            .count();
        assert_eq!(unreacts, 1);

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_single_page_closes_immediately() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        let paginator = Paginator::builder(
            options(&waiter, &transport).final_action(move |_message| async move {
                closed_flag.store(true, Ordering::SeqCst);
            }),
        )
        .items(numbered_items(3))
        .items_per_page(10)
        .build()
        .unwrap();

        paginator.display_in(ChannelId::new(CHANNEL)).await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(transport.sent().len(), 1);
        assert!(transport.reactions().is_empty());
        assert_eq!(waiter.pending(), 0);
    }

    #[tokio::test]
    async fn test_single_page_waits_when_asked_to() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(3))
            .wait_on_single_page(true)
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;
        assert_eq!(transport.reactions(), vec![STOP]);

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_users_and_bots_are_ignored() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(
            options(&waiter, &transport).authorize_user(UserId::new(5)),
        )
        .items(numbered_items(25))
        .items_per_page(10)
        .build()
        .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;

        // Wrong user, then an authorized-looking bot: neither moves the page.
        waiter.dispatch(reaction(6, false, RIGHT)).await;
        waiter.dispatch(reaction(5, true, RIGHT)).await;
        assert_eq!(transport.edit_count(), 0);
        assert_eq!(waiter.pending(), 1);

        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 2/3");

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_typed_page_number_jumps_and_is_cleaned_up() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .allow_text_input(true)
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;

        // Out-of-range and current-page numbers do not match.
        waiter.dispatch(typed(5, "9")).await;
        waiter.dispatch(typed(5, "1")).await;
        assert_eq!(transport.edit_count(), 0);

        waiter.dispatch(typed(5, "3")).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 3/3");
        assert_eq!(transport.deleted_count(), 1);

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_keywords_navigate_and_clamp() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .keywords("back", "next")
            .build()
            .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;

        waiter.dispatch(typed(5, "NEXT")).await;
        settled(&waiter, &transport, 1).await;
        assert_eq!(footer(&transport.edits()[0]), "Page 2/3");

        waiter.dispatch(typed(5, "back")).await;
        settled(&waiter, &transport, 2).await;
        assert_eq!(footer(&transport.edits()[1]), "Page 1/3");

        // At page 1 without wrapping the keyword re-renders the same page.
        waiter.dispatch(typed(5, "back")).await;
        settled(&waiter, &transport, 3).await;
        assert_eq!(footer(&transport.edits()[2]), "Page 1/3");

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_display_as_takes_over_an_existing_message() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let paginator = Paginator::builder(options(&waiter, &transport))
            .items(numbered_items(25))
            .items_per_page(10)
            .build()
            .unwrap();

        let existing = crate::transport::MessageRef {
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(MESSAGE),
        };
        let task = tokio::spawn(paginator.display_as(existing));
        until(|| waiter.pending() == 1).await;

        // The first page replaces the existing message; nothing new is sent.
        assert!(transport.sent().is_empty());
        assert_eq!(footer(&transport.edits()[0]), "Page 1/3");

        waiter.dispatch(reaction(5, false, RIGHT)).await;
        settled(&waiter, &transport, 2).await;
        assert_eq!(footer(&transport.edits()[1]), "Page 2/3");

        waiter.dispatch(reaction(5, false, STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_invokes_final_action() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        let paginator = Paginator::builder(
            options(&waiter, &transport)
                .timeout(std::time::Duration::from_secs(5))
                .final_action(move |_message| async move {
                    closed_flag.store(true, Ordering::SeqCst);
                }),
        )
        .items(numbered_items(25))
        .items_per_page(10)
        .build()
        .unwrap();

        let task = tokio::spawn(paginator.display_in(ChannelId::new(CHANNEL)));
        // The paused clock auto-advances once everything is idle, expiring
        // the wait.
        task.await.unwrap().unwrap();
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(waiter.pending(), 0);
    }
}
