pub mod commands;
pub mod data;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod menus;
pub mod transport;
pub mod waiter;

// Customize these constants for your bot
pub const BOT_NAME: &str = "nightfury";
pub const COMMAND_TARGET: &str = "nightfury::command";
pub const ERROR_TARGET: &str = "nightfury::error";
pub const EVENT_TARGET: &str = "nightfury::waiter";
pub const MENU_TARGET: &str = "nightfury::menus";
pub const CONSOLE_TARGET: &str = "nightfury";

pub use data::{Data, DataInner, GuildConfig};
pub use events::{Event, EventKind};
pub use waiter::EventWaiter;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
