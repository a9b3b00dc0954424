use crate::{event::*, plugin::*};
use anyhow::Result;

/// Swallows anything sent by bots or webhooks, including my own messages, so no study plugin
/// answers them.
pub struct IgnoreBots;

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        let automated = match event {
            Event::Message(msg) => msg.author.bot || msg.webhook_id.is_some(),
            Event::Component(interaction) => interaction.user.bot,
            Event::Ready(_) => false,
        };

        Ok(if automated {
            EventHandled::Yes
        } else {
            EventHandled::No
        })
    }
}
