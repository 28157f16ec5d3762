use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nightfury::events::{Event, EventUser, ReactionAddEvent};
use nightfury::menus::{self, Menu, MenuOptions, Paginator};
use nightfury::transport::{MenuContent, MenuTransport, MessageRef, TransportResult};
use nightfury::waiter::EventWaiter;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};

/// Transport that prints every platform call instead of talking to Discord.
struct PrintTransport {
    next_message_id: AtomicU64,
}

#[async_trait]
impl MenuTransport for PrintTransport {
    async fn send(&self, channel_id: ChannelId, content: &MenuContent) -> TransportResult<MessageRef> {
        let message_id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        println!("send to #{channel_id}: {}", content.footer.as_deref().unwrap_or(""));
        Ok(MessageRef {
            channel_id,
            message_id,
        })
    }

    async fn edit(&self, message: MessageRef, content: &MenuContent) -> TransportResult<()> {
        println!(
            "edit message {}: {}",
            message.message_id,
            content.footer.as_deref().unwrap_or("")
        );
        Ok(())
    }

    async fn react(&self, message: MessageRef, emoji: &str) -> TransportResult<()> {
        println!("react {emoji} on message {}", message.message_id);
        Ok(())
    }

    async fn unreact(&self, message: MessageRef, emoji: &str, user_id: UserId) -> TransportResult<()> {
        println!(
            "remove {emoji} by user {user_id} from message {}",
            message.message_id
        );
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> TransportResult<()> {
        println!("delete message {}", message.message_id);
        Ok(())
    }

    async fn can_add_reactions(&self, _guild_id: Option<GuildId>, _channel_id: ChannelId) -> bool {
        true
    }
}

fn press(emoji: &str) -> Event {
    Event::ReactionAdd(ReactionAddEvent {
        channel_id: ChannelId::new(1),
        message_id: MessageId::new(1),
        user: EventUser {
            id: UserId::new(42),
            bot: false,
        },
        guild_id: Some(GuildId::new(7)),
        member_roles: Vec::new(),
        emoji: emoji.to_string(),
    })
}

#[tokio::main]
async fn main() {
    println!("Menu Lifecycle Walkthrough");
    println!("--------------------------");

    let waiter = EventWaiter::new();
    let transport: Arc<dyn MenuTransport> = Arc::new(PrintTransport {
        next_message_id: AtomicU64::new(1),
    });

    let items: Vec<String> = (1..=12).map(|i| format!("entry {i}")).collect();
    let paginator = Paginator::builder(
        MenuOptions::new(waiter.clone(), transport)
            .timeout(Duration::from_secs(30))
            .final_action(|message| async move {
                println!("menu on message {} closed", message.message_id);
            }),
    )
    .items(items)
    .items_per_page(5)
    .number_items(true)
    .build()
    .expect("paginator configuration is valid");

    let session = tokio::spawn(paginator.display_in(ChannelId::new(1)));

    // Walk forward through the pages, then close the menu.
    for emoji in [menus::RIGHT, menus::RIGHT, menus::LEFT, menus::STOP] {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("-- user presses {emoji}");
        waiter.dispatch(press(emoji)).await;
    }

    session
        .await
        .expect("display task panicked")
        .expect("menu session failed");
    println!("done, {} waiter(s) left registered", waiter.pending());
}
