//! Image-per-page widget
//!
//! Runs the same navigation state machine as the paginator, with every page
//! rendering exactly one image url.

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Colour};
use std::sync::Arc;

use super::nav::NavLoop;
use super::{Menu, MenuError, MenuOptions, MenuResult};
use crate::transport::{MenuContent, MessageRef};

type PageTextFn = Box<dyn Fn(usize, usize) -> Option<String> + Send + Sync>;
type PageColorFn = Box<dyn Fn(usize, usize) -> Option<Colour> + Send + Sync>;

/// A one-image-per-page slideshow over reaction navigation.
pub struct Slideshow {
    options: MenuOptions,
    urls: Vec<String>,
    show_page_numbers: bool,
    wait_on_single_page: bool,
    bulk_skip: usize,
    wrap_page_ends: bool,
    left_keyword: Option<String>,
    right_keyword: Option<String>,
    allow_text_input: bool,
    page_text: Option<PageTextFn>,
    page_color: Option<PageColorFn>,
    description: Option<PageTextFn>,
}

impl Slideshow {
    #[must_use]
    pub fn builder(options: MenuOptions) -> SlideshowBuilder {
        SlideshowBuilder::new(options)
    }

    /// Total number of pages, one per url.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.urls.len()
    }

    /// Render a single page. Pure: the same page renders identically every
    /// time.
    #[must_use]
    pub fn render_page(&self, page: usize) -> MenuContent {
        let pages = self.pages();
        let mut content = MenuContent {
            image: Some(self.urls[page - 1].clone()),
            ..Default::default()
        };
        if let Some(page_text) = &self.page_text {
            if let Some(text) = page_text(page, pages) {
                content.text = text;
            }
        }
        if let Some(description) = &self.description {
            if let Some(text) = description(page, pages) {
                content.description = text;
            }
        }
        if let Some(page_color) = &self.page_color {
            content.color = page_color(page, pages);
        }
        if self.show_page_numbers {
            content.footer = Some(format!("Image {page}/{pages}"));
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
            pages: self.urls.len(),
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
impl Menu for Slideshow {
    async fn display_in(mut self, channel_id: ChannelId) -> MenuResult<()> {
        self.into_nav().start_in(channel_id).await
    }

    async fn display_as(mut self, message: MessageRef) -> MenuResult<()> {
        self.into_nav().start_as(message).await
    }
}

/// Builder for [`Slideshow`]. `build` is the single validation point.
pub struct SlideshowBuilder {
    options: MenuOptions,
    urls: Vec<String>,
    show_page_numbers: bool,
    wait_on_single_page: bool,
    bulk_skip: usize,
    wrap_page_ends: bool,
    left_keyword: Option<String>,
    right_keyword: Option<String>,
    allow_text_input: bool,
    page_text: Option<PageTextFn>,
    page_color: Option<PageColorFn>,
    description: Option<PageTextFn>,
}

impl SlideshowBuilder {
    fn new(options: MenuOptions) -> Self {
        Self {
            options,
            urls: Vec::new(),
            show_page_numbers: true,
            wait_on_single_page: false,
            bulk_skip: 1,
            wrap_page_ends: false,
            left_keyword: None,
            right_keyword: None,
            allow_text_input: false,
            page_text: None,
            page_color: None,
            description: None,
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    #[must_use]
    pub fn urls(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.urls.extend(urls);
        self
    }

    #[must_use]
    pub fn show_page_numbers(mut self, show_page_numbers: bool) -> Self {
        self.show_page_numbers = show_page_numbers;
        self
    }

    /// Keep the menu interactive even with a single image.
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

    /// Embed description, recomputed per page.
    #[must_use]
    pub fn description<F>(mut self, description: F) -> Self
    where
        F: Fn(usize, usize) -> Option<String> + Send + Sync + 'static,
    {
        self.description = Some(Box::new(description));
        self
    }

    /// Validate the configuration and produce the widget.
    ///
    /// # Errors
    /// Returns an error when no urls were added.
    pub fn build(self) -> MenuResult<Slideshow> {
        if self.urls.is_empty() {
            return Err(MenuError::NoUrls);
        }
        Ok(Slideshow {
            options: self.options,
            urls: self.urls,
            show_page_numbers: self.show_page_numbers,
            wait_on_single_page: self.wait_on_single_page,
            bulk_skip: self.bulk_skip,
            wrap_page_ends: self.wrap_page_ends,
            left_keyword: self.left_keyword,
            right_keyword: self.right_keyword,
            allow_text_input: self.allow_text_input,
            page_text: self.page_text,
            page_color: self.page_color,
            description: self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RIGHT, STOP};
    use super::*;
    use crate::events::{Event, EventUser, ReactionAddEvent};
    use crate::transport::MenuTransport;
    use crate::transport::testing::FakeTransport;
    use crate::waiter::EventWaiter;
    use poise::serenity_prelude::{GuildId, MessageId, UserId};

    const CHANNEL: u64 = 10;
    const MESSAGE: u64 = 1;

    fn options(waiter: &EventWaiter, transport: &Arc<FakeTransport>) -> MenuOptions {
        let transport: Arc<dyn MenuTransport> = Arc::clone(transport);
        MenuOptions::new(waiter.clone(), transport)
    }

    fn urls() -> Vec<String> {
        (1..=3).map(|i| format!("https://cdn.example/{i}.png")).collect()
    }

    fn reaction(emoji: &str) -> Event {
        Event::ReactionAdd(ReactionAddEvent {
            channel_id: ChannelId::new(CHANNEL),
            message_id: MessageId::new(MESSAGE),
            user: EventUser {
                id: UserId::new(5),
                bot: false,
            },
            guild_id: Some(GuildId::new(20)),
            member_roles: Vec::new(),
            emoji: emoji.to_string(),
        })
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

    #[test]
    fn test_build_rejects_empty_urls() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let result = Slideshow::builder(options(&waiter, &transport)).build();
        assert!(matches!(result, Err(MenuError::NoUrls)));
    }

    #[test]
    fn test_render_shows_one_image_per_page() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let slideshow = Slideshow::builder(options(&waiter, &transport))
            .urls(urls())
            .description(|page, pages| Some(format!("slide {page} of {pages}")))
            .build()
            .unwrap();

        let page = slideshow.render_page(2);
        assert_eq!(page.image.as_deref(), Some("https://cdn.example/2.png"));
        assert_eq!(page.description, "slide 2 of 3");
        assert_eq!(page.footer.as_deref(), Some("Image 2/3"));
        assert!(page.fields.is_empty());
        assert_eq!(slideshow.render_page(2), page);
    }

    #[tokio::test]
    async fn test_navigation_wraps_with_the_shared_loop() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let slideshow = Slideshow::builder(options(&waiter, &transport))
            .urls(urls())
            .wrap_page_ends(true)
            .build()
            .unwrap();

        let task = tokio::spawn(slideshow.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;

        // Forward twice to the last image, once more to wrap around.
        for _ in 0..3 {
            let edits_before = transport.edit_count();
            waiter.dispatch(reaction(RIGHT)).await;
            until(|| transport.edit_count() == edits_before + 1).await;
            until(|| waiter.pending() == 1).await;
        }
        let edits = transport.edits();
        assert_eq!(edits[0].image.as_deref(), Some("https://cdn.example/2.png"));
        assert_eq!(edits[1].image.as_deref(), Some("https://cdn.example/3.png"));
        assert_eq!(edits[2].image.as_deref(), Some("https://cdn.example/1.png"));

        waiter.dispatch(reaction(STOP)).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_single_image_waits_only_when_asked() {
        let waiter = EventWaiter::new();
        let transport = FakeTransport::new();
        let slideshow = Slideshow::builder(options(&waiter, &transport))
            .url("https://cdn.example/only.png")
            .wait_on_single_page(true)
            .build()
            .unwrap();

        let task = tokio::spawn(slideshow.display_in(ChannelId::new(CHANNEL)));
        until(|| waiter.pending() == 1).await;
        assert_eq!(transport.reactions(), vec![STOP]);

        waiter.dispatch(reaction(STOP)).await;
        task.await.unwrap().unwrap();
        assert_eq!(waiter.pending(), 0);
    }
}
