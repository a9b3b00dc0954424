use crate::helper::MessageHelper;
use crate::{event::*, log_internal, plugin::*};
use anyhow::Result;

const PERMISSION_DENIED: &str = "⛔ Você não tem permissão para executar este comando.";

pub struct Reload;

#[serenity::async_trait]
impl Plugin for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!(
            "{}{} - recarrega a configuração (apenas donos do bot)",
            prefix,
            self.name()
        ))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        if !msg.is_from_owner(ctx).await {
            msg.reply(ctx.cache_http, PERMISSION_DENIED).await?;
            return Ok(EventHandled::Yes);
        }

        let mut cfg = ctx.cfg.write().await;
        cfg.reload().await?;
        // The permit pool keeps its size; only where requests go changes.
        ctx.llm.reconfigure(cfg.llm.as_endpoint()).await;
        drop(cfg);
        log_internal!("Configuration reloaded");

        msg.reply(ctx.cache_http, "Configuração recarregada com sucesso")
            .await?;
        Ok(EventHandled::Yes)
    }
}
