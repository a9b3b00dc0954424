//! Ask the LLM for a quiz: gateway call, JSON extraction, normalization.

use super::{
    extract::{extract_json, ParseError},
    normalize::normalize,
    Quiz,
};
use crate::llm::{ChatBackend, ChatMessage, GatewayError};
use serde_json::Value;

const RESEND_AS_JSON: &str =
    "Reenvie o mesmo conteúdo **somente como JSON válido**, sem comentários ou markdown.";

/// Quiz generation settings, owned so generation runs without the config lock.
#[derive(Clone, Debug)]
pub struct QuizSettings {
    pub system: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Temperature of the single "resend as JSON" follow-up.
    pub retry_temperature: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn user_prompt(category: &str, topic: &str) -> String {
    format!(
        "Gerar simulado para a banca '{category}' sobre o tema '{topic}'. \
         Responda **apenas** com o JSON no modelo exigido, sem texto extra."
    )
}

/// Generate a quiz for `category` and `topic`.
///
/// If the first reply holds no usable JSON, the model is shown its own reply and asked once to
/// resend it as pure JSON.  Gateway failures are never retried here.
pub async fn generate_quiz(
    backend: &dyn ChatBackend,
    settings: &QuizSettings,
    category: &str,
    topic: &str,
) -> Result<Quiz, GenerateError> {
    let mut messages = vec![
        ChatMessage::system(settings.system.as_str()),
        ChatMessage::user(user_prompt(category, topic)),
    ];

    let reply = backend
        .chat(&messages, settings.max_tokens, settings.temperature)
        .await?;

    let mut raw = match extract_json(&reply) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!("Quiz reply held no usable JSON ({}), asking again", err);
            messages.push(ChatMessage::assistant(reply));
            messages.push(ChatMessage::user(RESEND_AS_JSON));
            let reply = backend
                .chat(&messages, settings.max_tokens, settings.retry_temperature)
                .await?;
            extract_json(&reply)?
        }
    };

    // The requested category decides the answer format, whatever the model echoed back.
    if let Value::Object(map) = &mut raw {
        map.insert("banca".to_string(), Value::from(category));
        let topic_missing = map
            .get("tema")
            .and_then(Value::as_str)
            .map_or(true, |t| t.trim().is_empty());
        if topic_missing {
            map.insert("tema".to_string(), Value::from(topic));
        }
    }

    Ok(normalize(&raw))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::llm::ChatMessageRole;
    use crate::quiz::Format;

    fn settings() -> QuizSettings {
        QuizSettings {
            system: "Gere simulados em JSON.".to_string(),
            max_tokens: 1200,
            temperature: 0.4,
            retry_temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn first_reply_used_when_valid() {
        let backend = ScriptedBackend::new(vec![Ok(binary_reply([
            "Certo", "Errado", "Certo", "Certo", "Errado",
        ]))]);
        let quiz = generate_quiz(&backend, &settings(), "cespe", "Direito Constitucional")
            .await
            .unwrap();

        assert_eq!(backend.call_count(), 1);
        assert_eq!(quiz.format, Format::Binary);
        assert_eq!(quiz.category, "CESPE");
        assert_eq!(quiz.questions[1].correct, "Errado");

        let calls = backend.calls.lock().unwrap();
        let (messages, temperature) = &calls[0];
        assert_eq!(*temperature, 0.4);
        assert_eq!(messages[0].role, ChatMessageRole::system);
        assert!(messages[1].content.contains("'cespe'"));
    }

    #[tokio::test]
    async fn one_reprompt_on_parse_failure() {
        let backend = ScriptedBackend::new(vec![
            Ok("Claro, segue o simulado em breve!".to_string()),
            Ok(r#"{"formato": "multipla_escolha", "questoes": []}"#.to_string()),
        ]);
        let quiz = generate_quiz(&backend, &settings(), "FGV", "Português")
            .await
            .unwrap();

        assert_eq!(quiz.category, "FGV");
        assert_eq!(quiz.topic, "Português");
        assert_eq!(quiz.format, Format::FiveOption);
        assert_eq!(quiz.questions.len(), 5);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let (messages, temperature) = &calls[1];
        assert_eq!(*temperature, 0.2);
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[2],
            ChatMessage::assistant("Claro, segue o simulado em breve!")
        );
        assert_eq!(messages[3], ChatMessage::user(RESEND_AS_JSON));
    }

    #[tokio::test]
    async fn fenced_array_is_reprompted() {
        let backend = ScriptedBackend::new(vec![
            Ok("```json\n[\"questao 1\", \"questao 2\"]\n```".to_string()),
            Ok(binary_reply(["Certo", "Certo", "Errado", "Certo", "Errado"])),
        ]);
        let quiz = generate_quiz(&backend, &settings(), "CESPE", "Direito Constitucional")
            .await
            .unwrap();

        assert_eq!(backend.call_count(), 2);
        assert_eq!(quiz.category, "CESPE");
        assert_eq!(quiz.format, Format::Binary);
        assert_eq!(quiz.questions[0].statement, "Afirmação 1");
        assert_eq!(quiz.questions[2].correct, "Errado");
    }

    #[tokio::test]
    async fn gives_up_after_second_parse_failure() {
        let backend = ScriptedBackend::new(vec![
            Ok("sem json".to_string()),
            Ok("ainda sem json".to_string()),
            Ok(binary_reply(["Certo"; 5])),
        ]);
        let result = generate_quiz(&backend, &settings(), "FCC", "geral").await;
        assert!(matches!(result, Err(GenerateError::Parse(_))));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn gateway_failure_is_not_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(GatewayError::EmptyReply),
            Ok(binary_reply(["Certo"; 5])),
        ]);
        let result = generate_quiz(&backend, &settings(), "FCC", "geral").await;
        assert!(matches!(result, Err(GenerateError::Gateway(_))));
        assert_eq!(backend.call_count(), 1);
    }
}
