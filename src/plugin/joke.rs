use crate::{event::*, plugin::*};
use anyhow::Result;
use rand::seq::SliceRandom;

/// Tells a random study joke
pub struct Joke;

/// Pick a configured joke, if any are configured.
pub async fn random_joke(ctx: &Context<'_>) -> Option<String> {
    let cfg = ctx.cfg.read().await;
    cfg.jokes.lines.choose(&mut rand::thread_rng()).cloned()
}

#[serenity::async_trait]
impl Plugin for Joke {
    fn name(&self) -> &'static str {
        "piada"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!("{}{} - uma piada concurseira", prefix, self.name()))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let joke = random_joke(ctx)
            .await
            .unwrap_or_else(|| "Hoje estou sem piadas. Bora estudar! 📚".to_string());
        msg.reply(ctx.cache_http, joke).await?;
        Ok(EventHandled::Yes)
    }
}
