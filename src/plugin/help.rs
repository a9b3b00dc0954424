use crate::{event::*, plugin::*};
use anyhow::Result;
use serenity::all::{Colour, CreateEmbed, CreateEmbedFooter, CreateMessage};

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!("{}{} - mostra esta ajuda", prefix, self.name()))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let mut usages = Vec::new();
        for plugin in crate::plugin::plugins() {
            if let Some(usage) = plugin.usage(ctx).await {
                usages.extend(usage.lines().map(|line| format!("`{}`", line.trim())));
            }
        }

        let embed = CreateEmbed::new()
            .title("📚 Comandos")
            .description(usages.join("\n"))
            .colour(Colour::BLURPLE)
            .footer(CreateEmbedFooter::new(
                "Ou me mencione para tirar dúvidas de estudo.",
            ));
        msg.channel_id
            .send_message(
                ctx.cache_http,
                CreateMessage::new().embed(embed).reference_message(msg),
            )
            .await?;
        Ok(EventHandled::Yes)
    }
}
