//! Quiz sessions: one per user, from reservation through the last answer.
//!
//! A user's key is first *reserved* while their quiz is generated, so that a second request
//! cannot start a parallel generation.  Once the quiz arrives the session is in progress at
//! question 0; each accepted answer advances it, and the fifth removes it from the store.

use crate::quiz::{Format, Question, Quiz};
use serenity::all::UserId;
use std::collections::{HashMap, HashSet};

/// Most answers listed in a final report.
pub const REPORT_MAX_ITEMS: usize = 5;
/// Statements longer than this are cut in report lines.
const STATEMENT_PREVIEW_CHARS: usize = 110;

/// A user-facing refusal.  These are expected outcomes rather than errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("⚠️ Você já tem um simulado em andamento. Termine-o ou cancele antes de iniciar outro.")]
    AlreadyActive,
    #[error("Sessão expirada.")]
    NoSession,
    #[error("Este simulado pertence a outro usuário.")]
    NotOwner,
    #[error("Sessão expirada ou resposta já registrada.")]
    Stale,
    #[error("Resposta inválida para esta questão.")]
    InvalidChoice,
    #[error("Nenhum simulado para cancelar.")]
    NothingToCancel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub index: usize,
    pub choice: String,
    pub correct: String,
    pub is_correct: bool,
    pub comment: String,
}

pub struct Session {
    pub owner: UserId,
    pub quiz: Quiz,
    index: usize,
    answers: Vec<Answer>,
    score: usize,
}

/// An answer button press: which session, which question it was shown for, and the choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub owner: UserId,
    pub index: usize,
    pub choice: String,
}

pub enum Progress {
    /// The session moved on; the next question is `Session::current_question`.
    Next(Answer),
    /// That was the last question.  The session is gone.
    Completed(Answer, Report),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialResult {
    pub score: usize,
    pub answered: usize,
    pub index: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub category: String,
    pub topic: String,
    pub score: usize,
    pub total: usize,
    pub lines: Vec<ReportLine>,
    /// Answers left out of `lines` by [`REPORT_MAX_ITEMS`].
    pub omitted: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportLine {
    pub index: usize,
    pub choice: String,
    pub correct: String,
    pub is_correct: bool,
    pub statement: String,
}

impl Session {
    fn new(owner: UserId, quiz: Quiz) -> Self {
        Self {
            owner,
            quiz,
            index: 0,
            answers: Vec::new(),
            score: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.question(self.index)
    }

    pub fn partial(&self) -> PartialResult {
        PartialResult {
            score: self.score(),
            answered: self.answers().len(),
            index: self.index,
            total: self.quiz.len(),
        }
    }

    fn record(&mut self, choice: String) -> Option<Answer> {
        let question = self.current_question()?;
        let is_correct = question.is_correct(&choice);
        let answer = Answer {
            index: self.index,
            choice,
            correct: question.correct.clone(),
            is_correct,
            comment: question.comment.clone(),
        };

        self.answers.push(answer.clone());
        if is_correct {
            self.score += 1;
        }
        self.index += 1;
        Some(answer)
    }

    fn report(&self) -> Report {
        let lines = self
            .answers
            .iter()
            .take(REPORT_MAX_ITEMS)
            .map(|answer| ReportLine {
                index: answer.index,
                choice: answer.choice.clone(),
                correct: answer.correct.clone(),
                is_correct: answer.is_correct,
                statement: self
                    .quiz
                    .question(answer.index)
                    .map(|q| preview(&q.statement))
                    .unwrap_or_default(),
            })
            .collect();

        Report {
            category: self.quiz.category.clone(),
            topic: self.quiz.topic.clone(),
            score: self.score,
            total: self.quiz.len(),
            lines,
            omitted: self.answers.len().saturating_sub(REPORT_MAX_ITEMS),
        }
    }
}

fn preview(statement: &str) -> String {
    let statement = statement.trim();
    if statement.chars().count() > STATEMENT_PREVIEW_CHARS {
        let cut: String = statement.chars().take(STATEMENT_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        statement.to_string()
    }
}

/// Map a submitted choice onto the format's own spelling, e.g. `CERTO` to `Certo`.
fn canonical_choice(format: Format, choice: &str) -> Option<String> {
    format
        .choices()
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(choice.trim()))
}

/// All quiz sessions, keyed by the user who owns them.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, Session>,
    /// Users whose quiz is being generated.
    pending: HashSet<UserId>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user) || self.pending.contains(&user)
    }

    /// Claim `user`'s slot ahead of quiz generation.
    pub fn reserve(&mut self, user: UserId) -> Result<(), Refusal> {
        if self.is_active(user) {
            return Err(Refusal::AlreadyActive);
        }
        self.pending.insert(user);
        Ok(())
    }

    /// Drop a reservation whose quiz could not be generated.
    pub fn release(&mut self, user: UserId) {
        self.pending.remove(&user);
    }

    /// Turn a reservation into a session at question 0.  Returns `None` if the reservation was
    /// cancelled while the quiz was being generated; the quiz is then discarded.
    pub fn start(&mut self, user: UserId, quiz: Quiz) -> Option<&Session> {
        if !self.pending.remove(&user) {
            return None;
        }
        self.sessions.insert(user, Session::new(user, quiz));
        self.sessions.get(&user)
    }

    pub fn get(&self, user: UserId) -> Option<&Session> {
        self.sessions.get(&user)
    }

    pub fn partial(&self, user: UserId) -> Result<PartialResult, Refusal> {
        self.get(user)
            .map(Session::partial)
            .ok_or(Refusal::NoSession)
    }

    /// Record `presser`'s answer.  Refusals leave the session untouched.
    pub fn submit(&mut self, presser: UserId, submission: Submission) -> Result<Progress, Refusal> {
        let session = self
            .sessions
            .get_mut(&submission.owner)
            .ok_or(Refusal::NoSession)?;

        if presser != session.owner {
            return Err(Refusal::NotOwner);
        }
        if submission.index != session.index {
            return Err(Refusal::Stale);
        }
        let choice = canonical_choice(session.quiz.format, &submission.choice)
            .ok_or(Refusal::InvalidChoice)?;

        let answer = session.record(choice).ok_or(Refusal::Stale)?;

        if session.index < session.quiz.len() {
            return Ok(Progress::Next(answer));
        }

        let report = session.report();
        self.sessions.remove(&submission.owner);
        Ok(Progress::Completed(answer, report))
    }

    /// Discard `user`'s session or pending reservation, whatever its state.
    pub fn cancel(&mut self, user: UserId) -> Result<(), Refusal> {
        let had_session = self.sessions.remove(&user).is_some();
        let had_pending = self.pending.remove(&user);
        if had_session || had_pending {
            Ok(())
        } else {
            Err(Refusal::NothingToCancel)
        }
    }
}
