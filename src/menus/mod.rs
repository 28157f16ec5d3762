//! Interactive reaction-driven message widgets
//!
//! Every widget follows the same lifecycle: render a message, wait through
//! the [`EventWaiter`](crate::waiter::EventWaiter) for the next valid
//! reaction or typed input, act on it, and repeat or finish. Widgets share
//! the authorization rules, the timeout, and the final-action hook defined
//! here; what differs is the rendering and the input they accept.

mod error;
mod nav;
mod ordered;
mod paginator;
mod slideshow;

pub use error::{MenuError, MenuResult};
pub use ordered::{Choice, OrderedMenu, OrderedMenuBuilder};
pub use paginator::{Paginator, PaginatorBuilder};
pub use slideshow::{Slideshow, SlideshowBuilder};

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use uuid::Uuid;

use crate::events::EventUser;
use crate::transport::{MenuTransport, MessageRef};
use crate::waiter::{BoxFuture, EventWaiter};

/// Jump several pages back.
pub const BIG_LEFT: &str = "\u{23EA}";
/// One page back.
pub const LEFT: &str = "\u{25C0}";
/// Close the menu.
pub const STOP: &str = "\u{23F9}";
/// One page forward.
pub const RIGHT: &str = "\u{25B6}";
/// Jump several pages forward.
pub const BIG_RIGHT: &str = "\u{23E9}";

/// Number emoji for [`OrderedMenu`]; position is the choice index.
pub(crate) const NUMBERS: [&str; 10] = [
    "1\u{20E3}",
    "2\u{20E3}",
    "3\u{20E3}",
    "4\u{20E3}",
    "5\u{20E3}",
    "6\u{20E3}",
    "7\u{20E3}",
    "8\u{20E3}",
    "9\u{20E3}",
    "\u{1F51F}",
];

/// Regional-indicator letters A through J.
pub(crate) const LETTERS: [&str; 10] = [
    "\u{1F1E6}",
    "\u{1F1E7}",
    "\u{1F1E8}",
    "\u{1F1E9}",
    "\u{1F1EA}",
    "\u{1F1EB}",
    "\u{1F1EC}",
    "\u{1F1ED}",
    "\u{1F1EE}",
    "\u{1F1EF}",
];

/// Cancel icon for [`OrderedMenu`].
pub(crate) const CANCEL: &str = "\u{274C}";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Callback invoked with the menu's message when its lifecycle ends.
pub type FinalAction = Box<dyn FnOnce(MessageRef) -> BoxFuture + Send + Sync>;

/// Allow-lists deciding who may drive a widget.
///
/// Bots are never authorized. Empty lists admit every non-bot user;
/// otherwise the user must be listed, or hold one of the listed roles in a
/// guild context.
#[derive(Debug, Default, Clone)]
pub struct MenuAuth {
    users: HashSet<UserId>,
    roles: HashSet<RoleId>,
}

impl MenuAuth {
    pub(crate) fn allows(
        &self,
        user: EventUser,
        guild_id: Option<GuildId>,
        member_roles: &[RoleId],
    ) -> bool {
        if user.bot {
            return false;
        }
        if self.users.is_empty() && self.roles.is_empty() {
            return true;
        }
        if self.users.contains(&user.id) {
            return true;
        }
        if guild_id.is_none() {
            return false;
        }
        member_roles.iter().any(|role| self.roles.contains(role))
    }
}

/// Configuration shared by every widget.
pub struct MenuOptions {
    pub(crate) waiter: EventWaiter,
    pub(crate) transport: Arc<dyn MenuTransport>,
    pub(crate) auth: MenuAuth,
    pub(crate) timeout: Duration,
    pub(crate) final_action: Option<FinalAction>,
    /// Instance id carried through log records.
    pub(crate) id: Uuid,
}

impl MenuOptions {
    #[must_use]
    pub fn new(waiter: EventWaiter, transport: Arc<dyn MenuTransport>) -> Self {
        Self {
            waiter,
            transport,
            auth: MenuAuth::default(),
            timeout: DEFAULT_TIMEOUT,
            final_action: None,
            id: Uuid::new_v4(),
        }
    }

    /// How long each wait for input lasts before the menu closes.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn authorize_user(mut self, user_id: UserId) -> Self {
        self.auth.users.insert(user_id);
        self
    }

    #[must_use]
    pub fn authorize_users(mut self, user_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.auth.users.extend(user_ids);
        self
    }

    #[must_use]
    pub fn authorize_role(mut self, role_id: RoleId) -> Self {
        self.auth.roles.insert(role_id);
        self
    }

    #[must_use]
    pub fn authorize_roles(mut self, role_ids: impl IntoIterator<Item = RoleId>) -> Self {
        self.auth.roles.extend(role_ids);
        self
    }

    /// Run `action` with the menu's message once the menu closes, whether by
    /// stop, selection timeout, or expiry.
    #[must_use]
    pub fn final_action<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce(MessageRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.final_action = Some(Box::new(move |message: MessageRef| -> BoxFuture {
            Box::pin(action(message))
        }));
        self
    }
}

/// The two ways a widget goes live.
#[async_trait]
pub trait Menu {
    /// Send a new message in `channel_id` and run the widget on it.
    async fn display_in(self, channel_id: ChannelId) -> MenuResult<()>;

    /// Take over an existing message, editing it in place. Used to drill
    /// down from a parent menu into a child on the same message.
    async fn display_as(self, message: MessageRef) -> MenuResult<()>;
}

/// One page back, clamping at the first page unless wrapping.
pub(crate) fn step_back(page: usize, pages: usize, wrap: bool) -> usize {
    if page > 1 {
        page - 1
    } else if wrap {
        pages
    } else {
        page
    }
}

/// One page forward, clamping at the last page unless wrapping.
pub(crate) fn step_forward(page: usize, pages: usize, wrap: bool) -> usize {
    if page < pages {
        page + 1
    } else if wrap {
        1
    } else {
        page
    }
}

/// A bulk skip composes `steps` single steps, each clamping or wrapping on
/// its own, rather than one arithmetic jump.
pub(crate) fn bulk_step(page: usize, pages: usize, wrap: bool, steps: usize, backward: bool) -> usize {
    let mut current = page;
    for _ in 0..steps {
        let next = if backward {
            step_back(current, pages, wrap)
        } else {
            step_forward(current, pages, wrap)
        };
        if next == current {
            break;
        }
        current = next;
    }
    current
}
