use std::sync::Arc;

use poise::command;
use poise::serenity_prelude::CreateMessage;
use tracing::warn;

use crate::menus::{Menu, MenuOptions, OrderedMenu, Paginator, Slideshow};
use crate::transport::{MenuTransport, SerenityTransport};
use crate::{Context, ERROR_TARGET, Error};

/// Widget configuration for the invoking user: the shared waiter, a live
/// transport, the guild's timeout, and the invoker as the only driver.
fn menu_options(ctx: &Context<'_>) -> MenuOptions {
    let serenity_ctx = ctx.serenity_context();
    let transport: Arc<dyn MenuTransport> = Arc::new(SerenityTransport::new(
        serenity_ctx.http.clone(),
        serenity_ctx.cache.clone(),
    ));
    let data = ctx.data();
    MenuOptions::new(data.waiter.clone(), transport)
        .timeout(data.menu_timeout(ctx.guild_id()))
        .authorize_user(ctx.author().id)
}

/// Basic ping command
/// This command is used to check if the bot is responsive.
#[command(prefix_command, slash_command, guild_only)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Pong!").await?;
    Ok(())
}

/// Browse every role in the guild as a paged menu
#[command(prefix_command, slash_command, guild_only)]
pub async fn roles(ctx: Context<'_>) -> Result<(), Error> {
    let role_names: Option<Vec<String>> = ctx
        .guild()
        .map(|guild| guild.roles.values().map(|role| role.name.clone()).collect());
    let Some(mut names) = role_names else {
        ctx.say("This command only works in a guild.").await?;
        return Ok(());
    };
    names.sort();

    ctx.say(format!("Browsing {} role(s):", names.len())).await?;
    let wrap = ctx.data().wrap_page_ends(ctx.guild_id());
    let paginator = Paginator::builder(menu_options(&ctx))
        .items(names)
        .items_per_page(10)
        .number_items(true)
        .wrap_page_ends(wrap)
        .build()?;
    paginator.display_in(ctx.channel_id()).await?;
    Ok(())
}

/// Show the given image urls as a slideshow
#[command(prefix_command, guild_only)]
pub async fn gallery(ctx: Context<'_>, urls: Vec<String>) -> Result<(), Error> {
    if urls.is_empty() {
        ctx.say("Give me at least one image url.").await?;
        return Ok(());
    }
    let wrap = ctx.data().wrap_page_ends(ctx.guild_id());
    let slideshow = Slideshow::builder(menu_options(&ctx))
        .urls(urls)
        .wrap_page_ends(wrap)
        .build()?;
    slideshow.display_in(ctx.channel_id()).await?;
    Ok(())
}

/// Pick one of up to ten options with a numbered menu
#[command(prefix_command, guild_only)]
pub async fn choose(ctx: Context<'_>, options: Vec<String>) -> Result<(), Error> {
    if options.is_empty() || options.len() > 10 {
        ctx.say("Give me between 1 and 10 options.").await?;
        return Ok(());
    }

    let http = ctx.serenity_context().http.clone();
    let mut builder = OrderedMenu::builder(menu_options(&ctx))
        .description("Pick one:")
        .use_cancel(true)
        .guild(ctx.guild_id());
    for option in options {
        let http = Arc::clone(&http);
        builder = builder.choice(option.clone(), move |message| async move {
            let reply = CreateMessage::new().content(format!("You picked **{option}**."));
            if let Err(error) = message.channel_id.send_message(&http, reply).await {
                warn!(target: ERROR_TARGET, %error, "failed to announce choice");
            }
        });
    }
    builder.build()?.display_in(ctx.channel_id()).await?;
    Ok(())
}

/// Set how long interactive menus in this guild wait for input
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn menutimeout(
    ctx: Context<'_>,
    #[description = "Seconds before a menu closes"] seconds: u32,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("This command only works in a guild.").await?;
        return Ok(());
    };
    if !(5..=900).contains(&seconds) {
        ctx.say("Pick a timeout between 5 and 900 seconds.").await?;
        return Ok(());
    }

    ctx.data().set_menu_timeout(guild_id, u64::from(seconds));
    ctx.data().save().await?;
    ctx.say(format!("Menus now wait {seconds}s for input.")).await?;
    Ok(())
}

/// Toggle whether paging menus in this guild wrap from the last page to the
/// first
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn menuwrap(
    ctx: Context<'_>,
    #[description = "Wrap at the page ends"] wrap: bool,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("This command only works in a guild.").await?;
        return Ok(());
    };

    ctx.data().set_wrap_page_ends(guild_id, wrap);
    ctx.data().save().await?;
    let state = if wrap { "wrap at the ends" } else { "stop at the ends" };
    ctx.say(format!("Menus now {state}.")).await?;
    Ok(())
}
