use crate::helper::{split_for_discord, MessageHelper};
use crate::llm::{ChatBackend, ChatMessage};
use crate::{event::*, plugin::*};
use anyhow::Result;

const REPLY_FAILED: &str = "⚠️ Erro ao gerar resposta. Tente novamente em instantes.";

/// Study-assistant replies to messages addressed to the bot
pub struct LlmReply;

#[serenity::async_trait]
impl Plugin for LlmReply {
    fn name(&self) -> &'static str {
        "llm_reply"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        // Only respond if the message is to the bot
        if !msg.is_to_me(ctx).await? {
            return Ok(EventHandled::No);
        }

        let typing = msg.channel_id.start_typing(ctx.http);

        let question = ChatMessage::user(msg.human_format_content(ctx).await?);

        // Copied out so a pending reload never waits on the LLM.
        let (settings, history_len, joke_chance) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.llm_reply.as_llm_settings(),
                cfg.llm_reply.history_len,
                cfg.llm_reply.joke_chance,
            )
        };

        let mut messages = vec![ChatMessage::system(settings.system)];
        messages.extend(ctx.vstate.read().await.history.get(msg.channel_id));
        messages.push(question.clone());

        let result = ctx
            .llm
            .chat(&messages, settings.max_tokens, settings.temperature)
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                typing.stop();
                tracing::warn!("LLM reply failed: {}", err);
                msg.reply(ctx.cache_http, REPLY_FAILED).await?;
                return Ok(EventHandled::Yes);
            }
        };

        {
            let mut vstate = ctx.vstate.write().await;
            vstate.history.push(msg.channel_id, question, history_len);
            vstate
                .history
                .push(msg.channel_id, ChatMessage::assistant(&response), history_len);
        }

        if rand::random::<f64>() < joke_chance {
            if let Some(joke) = super::joke::random_joke(ctx).await {
                response.push_str("\n\n");
                response.push_str(&joke);
            }
        }

        for chunk in split_for_discord(&response) {
            msg.reply(ctx.cache_http, chunk).await?;
        }
        typing.stop();
        Ok(EventHandled::Yes)
    }
}
