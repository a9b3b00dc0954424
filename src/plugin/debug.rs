use crate::{event::*, helper::*, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ctx.cache.current_user().color(),
                );
            }
            Event::Message(msg) => {
                log_event!(
                    "{}{}{}{}{}{} {}",
                    msg.guild_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.author.color(),
                    Glue {}.color(),
                    msg.human_format_content(ctx).await?,
                );
            }
            Event::Component(interaction) => {
                log_event!(
                    "{}{}{}{}{} pressed \"{}\"",
                    interaction.guild_id.color(ctx.http).await,
                    Glue {}.color(),
                    interaction.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    interaction.user.color(),
                    interaction.data.custom_id,
                );
            }
        }

        Ok(EventHandled::No)
    }
}
