//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum.

use crate::context::Context;
use serenity::all::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseMessage, Message,
    Ready,
};

const INTERNAL_ERROR: &str = "💥 Erro interno! Já registrei aqui no console.";

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    /// A button press on one of our messages
    Component(ComponentInteraction),
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => {
                    tracing::error!("Error in plugin {}: {:#}", plugin.name(), err);
                    self.report_internal_error(&ctx).await;
                    return;
                }
            }
        }
    }

    /// Tell the user something went wrong without exposing the error.
    async fn report_internal_error(&self, ctx: &Context<'_>) {
        let result = match self {
            Event::Message(msg) => msg.reply(ctx.cache_http, INTERNAL_ERROR).await.map(|_| ()),
            Event::Component(interaction) => {
                let response = CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(INTERNAL_ERROR)
                        .ephemeral(true),
                );
                interaction.create_response(ctx.http, response).await
            }
            Event::Ready(_) => Ok(()),
        };

        if let Err(err) = result {
            tracing::warn!("Could not report internal error to user: {}", err);
        }
    }

    // Check if a message should be interpreted as a special bot command.
    //
    // These are prefixed with the configured command prefix, e. g. `!cmd foo bar baz`.  Returns
    // the message along with the arguments following the command.
    pub async fn is_bot_cmd(&self, ctx: &Context<'_>, cmd: &str) -> Option<(&Message, Vec<&str>)> {
        let Event::Message(msg) = self else {
            return None;
        };

        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        let mut words = msg.content.split_whitespace();
        let first = words.next()?;
        match first.strip_prefix(prefix.as_str()) {
            Some(name) if name.eq_ignore_ascii_case(cmd) => Some((msg, words.collect())),
            _ => None,
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}
