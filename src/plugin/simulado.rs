//! Mock exams with button answering.
//!
//! Answer buttons carry `simulado:<owner>:<question index>:<choice>` as their custom id, so a
//! press is a self-contained [`Submission`] checked against the session store.

use crate::quiz::{
    generate::{generate_quiz, GenerateError},
    Format, QUESTION_COUNT,
};
use crate::session::{Answer, PartialResult, Progress, Refusal, Report, Session, Submission};
use crate::volatile_state::VolatileState;
use crate::{event::*, log_internal, logging::AsyncPrintColor, plugin::*};
use anyhow::Result;
use serenity::all::{
    ButtonStyle, Colour, ComponentInteraction, CreateActionRow, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, Message, Timestamp, UserId,
};
use std::time::Duration;
use tokio::sync::RwLock;

const CUSTOM_ID_PREFIX: &str = "simulado";
const DEFAULT_TOPIC: &str = "geral";
/// Discord's limit on embed field values.
const FIELD_LIMIT: usize = 1024;

pub struct Simulado;

enum SimuladoCmd<'a> {
    Start { category: &'a str, topic: String },
    Partial,
    Cancel,
}

#[serenity::async_trait]
impl Plugin for Simulado {
    fn name(&self) -> &'static str {
        "simulado"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!(
            "{p}{n} <banca> [tema] - gera um simulado de 5 questões, ex.: {p}{n} FGV Direito Administrativo\n\
             {p}{n} parcial - mostra seu resultado parcial\n\
             {p}{n} cancelar - cancela seu simulado em andamento",
            p = prefix,
            n = self.name()
        ))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Event::Component(interaction) = event {
            return handle_press(ctx, interaction).await;
        }

        let Some((msg, args)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let cmd = match args.as_slice() {
            [] => {
                let prefix = ctx.cfg.read().await.general.command_prefix.clone();
                msg.reply(
                    ctx.cache_http,
                    format!(
                        "⚠️ Faltou argumento! Exemplo: `{}{} FGV Direito Administrativo`",
                        prefix,
                        self.name()
                    ),
                )
                .await?;
                return Ok(EventHandled::Yes);
            }
            [sub] if sub.eq_ignore_ascii_case("parcial") => SimuladoCmd::Partial,
            [sub] if sub.eq_ignore_ascii_case("cancelar") => SimuladoCmd::Cancel,
            [category, topic @ ..] => SimuladoCmd::Start {
                category: *category,
                topic: if topic.is_empty() {
                    DEFAULT_TOPIC.to_string()
                } else {
                    topic.join(" ")
                },
            },
        };

        match cmd {
            SimuladoCmd::Start { category, topic } => start(ctx, msg, category, &topic).await?,
            SimuladoCmd::Partial => {
                let partial = ctx.vstate.read().await.sessions.partial(msg.author.id);
                let reply = match partial {
                    Ok(partial) => partial_text(&partial),
                    Err(refusal) => refusal.to_string(),
                };
                msg.reply(ctx.cache_http, reply).await?;
            }
            SimuladoCmd::Cancel => {
                let cancelled = ctx.vstate.write().await.sessions.cancel(msg.author.id);
                let reply = match cancelled {
                    Ok(()) => "🛑 Simulado cancelado.".to_string(),
                    Err(refusal) => refusal.to_string(),
                };
                msg.reply(ctx.cache_http, reply).await?;
            }
        }

        Ok(EventHandled::Yes)
    }
}

async fn start(ctx: &Context<'_>, msg: &Message, category: &str, topic: &str) -> Result<()> {
    let user = msg.author.id;

    // Claim the slot before the (slow) generation so a second request is refused right away.
    let reserved = ctx.vstate.write().await.sessions.reserve(user);
    if let Err(refusal) = reserved {
        tracing::debug!("Refused quiz start for {}: {:?}", user, refusal);
        msg.reply(ctx.cache_http, refusal.to_string()).await?;
        return Ok(());
    }

    log_internal!(
        "Generating quiz for {} ({} / {})",
        user.color(ctx.http).await,
        category,
        topic
    );
    let typing = msg.channel_id.start_typing(ctx.http);
    // Copied out so the config lock is not held across the LLM calls.
    let settings = ctx.cfg.read().await.quiz.as_quiz_settings();
    let generated = generate_quiz(ctx.llm, &settings, category, topic).await;
    typing.stop();

    let quiz = match generated {
        Ok(quiz) => quiz,
        Err(err) => {
            ctx.vstate.write().await.sessions.release(user);
            tracing::warn!("Quiz generation failed: {}", err);
            msg.reply(ctx.cache_http, generation_failed_text(&err)).await?;
            return Ok(());
        }
    };

    log_internal!(
        "Quiz ready for {}: {} / {} ({})",
        user.color(ctx.http).await,
        quiz.category,
        quiz.topic,
        quiz.format.as_str()
    );
    tracing::debug!(
        "Generated quiz: {}",
        serde_json::to_string(&quiz).unwrap_or_default()
    );

    let message = {
        let mut vstate = ctx.vstate.write().await;
        vstate.sessions.start(user, quiz).map(|session| {
            CreateMessage::new()
                .embed(question_embed(session))
                .components(answer_buttons(session))
                .reference_message(msg)
        })
    };

    match message {
        Some(message) => {
            let sent = msg.channel_id.send_message(ctx.cache_http, message).await;
            undo_start_on_failure(ctx.vstate, user, sent).await?;
        }
        None => {
            msg.reply(ctx.cache_http, "🛑 Simulado cancelado antes de começar.")
                .await?;
        }
    }
    Ok(())
}

/// A session whose first question never reached the user must not block their next attempt.
async fn undo_start_on_failure<T, E>(
    vstate: &RwLock<VolatileState>,
    user: UserId,
    sent: Result<T, E>,
) -> Result<T, E> {
    if sent.is_err() {
        // Nothing to cancel only if the user already cancelled; either way the slot is free.
        let _ = vstate.write().await.sessions.cancel(user);
    }
    sent
}

/// User-facing text for a failed generation.  Details stay in the logs.
fn generation_failed_text(err: &GenerateError) -> &'static str {
    match err {
        GenerateError::Gateway(_) => {
            "💥 O serviço de IA não respondeu. Tente novamente em instantes."
        }
        GenerateError::Parse(_) => {
            "💥 A IA respondeu num formato que não consegui ler. Tente novamente."
        }
    }
}

async fn handle_press(ctx: &Context<'_>, interaction: &ComponentInteraction) -> Result<EventHandled> {
    let Some(submission) = parse_custom_id(&interaction.data.custom_id) else {
        return Ok(EventHandled::No);
    };

    let timeout = ctx.cfg.read().await.quiz.button_timeout();
    if buttons_expired(&interaction.message, timeout) {
        reply_ephemeral(ctx, interaction, &Refusal::NoSession.to_string()).await?;
        return Ok(EventHandled::Yes);
    }

    // Everything shown to the user is rendered under the lock; Discord is called after.
    let outcome = {
        let mut vstate = ctx.vstate.write().await;
        let owner = submission.owner;
        match vstate.sessions.submit(interaction.user.id, submission) {
            Ok(Progress::Next(answer)) => {
                let session = vstate.sessions.get(owner);
                Ok((
                    feedback_text(&answer),
                    session.map(question_embed),
                    session.map(answer_buttons).unwrap_or_default(),
                ))
            }
            Ok(Progress::Completed(answer, report)) => {
                Ok((feedback_text(&answer), Some(report_embed(&report)), Vec::new()))
            }
            Err(refusal) => Err(refusal),
        }
    };

    let (feedback, embed, buttons) = match outcome {
        Ok(outcome) => outcome,
        Err(refusal) => {
            tracing::debug!("Refused answer from {}: {:?}", interaction.user.id, refusal);
            reply_ephemeral(ctx, interaction, &refusal.to_string()).await?;
            return Ok(EventHandled::Yes);
        }
    };

    let mut update = CreateInteractionResponseMessage::new().components(buttons);
    if let Some(embed) = embed {
        update = update.embed(embed);
    }
    interaction
        .create_response(ctx.http, CreateInteractionResponse::UpdateMessage(update))
        .await?;
    interaction
        .create_followup(
            ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(feedback)
                .ephemeral(true),
        )
        .await?;

    Ok(EventHandled::Yes)
}

async fn reply_ephemeral(
    ctx: &Context<'_>,
    interaction: &ComponentInteraction,
    content: &str,
) -> Result<()> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    interaction.create_response(ctx.http, response).await?;
    Ok(())
}

/// Buttons stop working once the message has sat unchanged for `timeout`.
fn buttons_expired(message: &Message, timeout: Duration) -> bool {
    let shown = message.edited_timestamp.unwrap_or(message.timestamp);
    let age = Timestamp::now().unix_timestamp() - shown.unix_timestamp();
    age > timeout.as_secs() as i64
}

fn custom_id(owner: UserId, index: usize, choice: &str) -> String {
    format!("{CUSTOM_ID_PREFIX}:{owner}:{index}:{choice}")
}

fn parse_custom_id(id: &str) -> Option<Submission> {
    let mut parts = id.split(':');
    if parts.next()? != CUSTOM_ID_PREFIX {
        return None;
    }
    let owner = parts
        .next()?
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)?;
    let index = parts.next()?.parse().ok()?;
    let choice = parts.next()?.to_string();
    if parts.next().is_some() {
        return None;
    }

    Some(Submission {
        owner,
        index,
        choice,
    })
}

fn answer_buttons(session: &Session) -> Vec<CreateActionRow> {
    let index = session.index();
    let format = session.quiz.format;
    let buttons = format
        .choices()
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let style = match (format, i) {
                (_, 0) => ButtonStyle::Primary,
                (Format::Binary, _) => ButtonStyle::Danger,
                (Format::FiveOption, _) => ButtonStyle::Secondary,
            };
            CreateButton::new(custom_id(session.owner, index, &choice.to_uppercase()))
                .label(choice.as_str())
                .style(style)
        })
        .collect();

    vec![CreateActionRow::Buttons(buttons)]
}

fn question_embed(session: &Session) -> CreateEmbed {
    let quiz = &session.quiz;
    let index = session.index();
    let mut embed = CreateEmbed::new()
        .title(format!(
            "📝 Simulado {} — Q{}/{}",
            quiz.category,
            index + 1,
            QUESTION_COUNT
        ))
        .colour(Colour::BLURPLE)
        .footer(CreateEmbedFooter::new("Escolha sua resposta abaixo."));

    if let Some(question) = session.current_question() {
        embed = embed
            .description(format!(
                "**Tema:** {}\n\n**Enunciado:** {}",
                quiz.topic, question.statement
            ))
            .field(
                "Alternativas",
                clip(&question.options.join("\n"), FIELD_LIMIT),
                false,
            );
    }
    embed
}

fn report_embed(report: &Report) -> CreateEmbed {
    let colour = if report.score * 2 >= report.total {
        Colour::DARK_GREEN
    } else {
        Colour::RED
    };

    CreateEmbed::new()
        .title(format!("🏁 Resultado — Simulado {}", report.category))
        .description(format!(
            "**Tema:** {}\n\n**Acertos:** {}/{}",
            report.topic, report.score, report.total
        ))
        .colour(colour)
        .field("Gabarito", clip(&report_text(report), FIELD_LIMIT), false)
        .footer(CreateEmbedFooter::new("Revisão concluída. Bora pra próxima! 🎓"))
}

fn report_text(report: &Report) -> String {
    let mut lines: Vec<String> = report
        .lines
        .iter()
        .map(|line| {
            format!(
                "**Q{}** {} — Você: **{}** | Gabarito: **{}**\n*{}*",
                line.index + 1,
                if line.is_correct { "✅" } else { "❌" },
                line.choice,
                line.correct,
                line.statement
            )
        })
        .collect();
    if report.omitted > 0 {
        lines.push(format!("… e mais {} questão(ões).", report.omitted));
    }
    lines.join("\n\n")
}

fn feedback_text(answer: &Answer) -> String {
    let verdict = if answer.is_correct {
        "✅ **Correto!**".to_string()
    } else {
        format!("❌ **Incorreto.** Gabarito: **{}**", answer.correct)
    };
    format!("{}\n\n**Comentário:** {}", verdict, answer.comment)
}

fn partial_text(partial: &PartialResult) -> String {
    format!(
        "📊 Parcial: {} acerto(s) em {} resposta(s). Você está na questão {} de {}.",
        partial.score,
        partial.answered,
        partial.index + 1,
        partial.total
    )
}

fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit - 1).collect();
    clipped.push('…');
    clipped
}
