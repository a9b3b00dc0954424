//! Miscellaneous convenience methods

use crate::context::Context;
use anyhow::Result;
use serenity::all::GuildId;
use std::collections::HashMap;

#[serenity::async_trait]
pub trait UserIdHelper {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserIdHelper for serenity::all::UserId {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        let user = match self.to_user(ctx.cache_http).await {
            Ok(user) => user,
            Err(_) => return format!("<unknown-user-{}>", *self),
        };

        let nick_in_guild = match guild_id {
            Some(guild_id) => user.nick_in(ctx.cache_http, guild_id).await,
            None => None,
        };

        // May not be in a guild, e.g. DM.  Fall back to global username.
        nick_in_guild.unwrap_or(user.name)
    }
}

#[serenity::async_trait]
pub trait MessageHelper {
    async fn human_format_content(&self, ctx: &Context) -> Result<String>;
    async fn is_to_me(&self, ctx: &Context) -> Result<bool>;
    async fn is_from_owner(&self, ctx: &Context) -> bool;
}

#[serenity::async_trait]
impl MessageHelper for serenity::all::Message {
    /// Convert discord-formatted message content, which may contain non-user-friendly markup, to a
    /// human-friendly format.  Also useful for LLMs.
    ///
    /// Mentions of the bot itself are dropped: they only address the message and would confuse
    /// the model.  Other user mentions become per-server names.
    async fn human_format_content(&self, ctx: &Context) -> Result<String> {
        let mut content = self.content.clone();
        let my_id = ctx.cache.current_user().id;

        // Create a mapping from mention strings to their names
        let mut mention_map: HashMap<String, String> = HashMap::new();

        // Map user mentions (e.g. `<@!1234567890>`)
        for user in &self.mentions {
            let user_id = user.id;
            let mention_with_nickname = format!("<@!{}>", user_id);
            let mention_without_nickname = format!("<@{}>", user_id);

            let name = if user_id == my_id {
                String::new()
            } else {
                user.id.nick_in_guild(ctx, self.guild_id).await
            };

            // Map both mention formats to the username
            mention_map.insert(mention_with_nickname, name.clone());
            mention_map.insert(mention_without_nickname, name);
        }

        if let Some(guild) = self.guild(ctx.cache) {
            // Map role mentions (e.g. `<@&1234567890>`)
            for role_id in &self.mention_roles {
                let mention = format!("<@&{}>", role_id);

                if let Some(role) = guild.roles.get(role_id) {
                    mention_map.insert(mention, format!("@{}", role.name));
                } else {
                    mention_map.insert(mention, "@UnknownRole".to_string());
                }
            }
        }

        // Replace all mentions with their human-facing names
        for (mention, name) in mention_map {
            content = content.replace(&mention, &name);
        }

        Ok(content.trim().to_string())
    }

    async fn is_to_me(&self, ctx: &Context) -> Result<bool> {
        // mentions me, the bot, directly
        if self.mentions_me(ctx.cache_http).await? {
            return Ok(true);
        }

        // Is a reply to a comment the bot made
        let my_id = ctx.cache.current_user().id;
        if let Some(reference) = &self.message_reference {
            if let Some(msg_id) = reference.message_id {
                if self
                    .channel_id
                    .message(ctx.cache_http, msg_id)
                    .await?
                    .author
                    .id
                    == my_id
                {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    async fn is_from_owner(&self, ctx: &Context) -> bool {
        let owners = &ctx.cfg.read().await.general.bot_owners;
        let author_global_name = &self.author.name;

        owners.contains(author_global_name)
    }
}

/// Discord rejects messages over 2000 characters; stay clear of it.
const DISCORD_MESSAGE_LIMIT: usize = 1900;

/// Cut `content` into postable pieces, preferring line breaks as cut points.  Blank pieces are
/// dropped since Discord refuses empty messages.
pub fn split_for_discord(content: &str) -> Vec<String> {
    fn push(chunks: &mut Vec<String>, chunk: String) {
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > DISCORD_MESSAGE_LIMIT
            && !current.is_empty()
        {
            push(&mut chunks, std::mem::take(&mut current));
        }

        // A single line may itself be too long.
        let mut line = line;
        while line.chars().count() > DISCORD_MESSAGE_LIMIT {
            let cut = line
                .char_indices()
                .nth(DISCORD_MESSAGE_LIMIT)
                .map_or(line.len(), |(i, _)| i);
            push(&mut chunks, line[..cut].to_string());
            line = &line[cut..];
        }
        current.push_str(line);
    }

    push(&mut chunks, current);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(split_for_discord("Bons estudos!"), vec!["Bons estudos!"]);
        assert!(split_for_discord("").is_empty());
    }

    #[test]
    fn long_message_splits_on_lines() {
        let line = format!("{}\n", "á".repeat(999));
        let content = line.repeat(3);
        let chunks = split_for_discord(&content);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= DISCORD_MESSAGE_LIMIT));
        assert_eq!(chunks.concat(), content);
    }

    #[test]
    fn no_blank_chunk_between_long_lines() {
        let content = format!("{}\n{}", "a".repeat(1900), "b".repeat(1900));
        let chunks = split_for_discord(&content);
        assert_eq!(chunks, vec!["a".repeat(1900), "b".repeat(1900)]);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn long_line_is_cut() {
        let content = "x".repeat(DISCORD_MESSAGE_LIMIT * 2 + 10);
        let chunks = split_for_discord(&content);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 10);
    }
}
