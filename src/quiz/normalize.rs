//! Coerce whatever the LLM produced into a [`Quiz`].
//!
//! This is the only place untyped JSON becomes quiz types.  It never fails: anything missing or
//! malformed is repaired with a placeholder so a session can always be run.

use super::{Format, Question, Quiz, BINARY_LABELS, OPTION_LETTERS, QUESTION_COUNT};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Canonical tag for the CESPE/CEBRASPE synonym pair.  Always binary format.
pub const CESPE: &str = "CESPE";

const DEFAULT_TOPIC: &str = "geral";
const PLACEHOLDER_STATEMENT: &str = "Questão adicional (placeholder).";
const MISSING_STATEMENT: &str = "Enunciado não fornecido pela IA.";
const PLACEHOLDER_OPTION: &str = "—";
const PLACEHOLDER_COMMENT: &str = "Comentário não fornecido pela IA.";

/// A leading `A) `, `(b) ` or `C. ` label on an option.
static OPTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(?[A-Ea-e]\)|[A-Ea-e]\.\s)\s*").expect("option label pattern")
});

/// A correct-choice identifier such as `B`, `b)` or `C. texto`.
static CHOICE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?([A-E])(?:[).:]|\s|$)").expect("choice letter pattern"));

/// Map a user- or model-supplied category to its tag, upper-cased, with synonyms merged.
pub fn canonical_category(raw: &str) -> String {
    let category = raw.trim().to_uppercase();
    match category.as_str() {
        "CESPE" | "CEBRASPE" | "CESPE/CEBRASPE" => CESPE.to_string(),
        _ => category,
    }
}

pub fn normalize(raw: &Value) -> Quiz {
    let category = canonical_category(raw.get("banca").and_then(Value::as_str).unwrap_or(""));

    let format = if category == CESPE {
        Format::Binary
    } else {
        match raw.get("formato").and_then(Value::as_str).map(str::trim) {
            Some("certo_errado") => Format::Binary,
            _ => Format::FiveOption,
        }
    };

    let topic = non_blank(raw.get("tema")).unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    let mut questions: Vec<Question> = raw
        .get("questoes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .take(QUESTION_COUNT)
                .map(|q| normalize_question(q, format))
                .collect()
        })
        .unwrap_or_default();

    while questions.len() < QUESTION_COUNT {
        questions.push(placeholder_question(format));
    }

    Quiz {
        category,
        format,
        topic,
        questions,
    }
}

fn normalize_question(q: &Map<String, Value>, format: Format) -> Question {
    let statement = non_blank(q.get("enunciado")).unwrap_or_else(|| MISSING_STATEMENT.to_string());
    let comment = non_blank(q.get("comentario")).unwrap_or_else(|| PLACEHOLDER_COMMENT.to_string());

    let (options, correct) = match format {
        Format::Binary => (binary_options(), binary_correct(q.get("correta"))),
        Format::FiveOption => (
            five_options(q.get("opcoes")),
            five_option_correct(q.get("correta")),
        ),
    };

    Question {
        statement,
        options,
        correct,
        comment,
    }
}

fn placeholder_question(format: Format) -> Question {
    let (options, correct) = match format {
        Format::Binary => (binary_options(), BINARY_LABELS[0].to_string()),
        Format::FiveOption => (
            label_options(vec![PLACEHOLDER_OPTION.to_string(); QUESTION_COUNT]),
            OPTION_LETTERS[0].to_string(),
        ),
    };

    Question {
        statement: PLACEHOLDER_STATEMENT.to_string(),
        options,
        correct,
        comment: PLACEHOLDER_COMMENT.to_string(),
    }
}

fn binary_options() -> Vec<String> {
    BINARY_LABELS.iter().map(|l| l.to_string()).collect()
}

fn binary_correct(raw: Option<&Value>) -> String {
    let label = match raw {
        Some(Value::Bool(false)) => BINARY_LABELS[1],
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "errado" | "e" | "falso" => BINARY_LABELS[1],
            _ => BINARY_LABELS[0],
        },
        _ => BINARY_LABELS[0],
    };
    label.to_string()
}

/// Strip any existing labels, fit to exactly five entries, then relabel `A) ` to `E) `.
fn five_options(raw: Option<&Value>) -> Vec<String> {
    let entries: Vec<&Value> = match raw {
        Some(Value::Array(items)) => items.iter().collect(),
        // Some models answer with `{"A": "...", "B": "..."}`; keys sort alphabetically.
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };

    let mut texts: Vec<String> = entries
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .map(|s| OPTION_LABEL.replace(&s, "").trim().to_string())
        .map(|s| {
            if s.is_empty() {
                PLACEHOLDER_OPTION.to_string()
            } else {
                s
            }
        })
        .take(OPTION_LETTERS.len())
        .collect();

    while texts.len() < OPTION_LETTERS.len() {
        texts.push(PLACEHOLDER_OPTION.to_string());
    }

    label_options(texts)
}

fn label_options(texts: Vec<String>) -> Vec<String> {
    OPTION_LETTERS
        .iter()
        .zip(texts)
        .map(|(letter, text)| format!("{letter}) {text}"))
        .collect()
}

fn five_option_correct(raw: Option<&Value>) -> String {
    let raw = raw
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();

    CHOICE_LETTER
        .captures(&raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| OPTION_LETTERS[0].to_string())
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn five_option_raw() -> Value {
        json!({
            "banca": "fgv",
            "formato": "multipla_escolha",
            "tema": "Direito Administrativo",
            "questoes": [
                {
                    "enunciado": "Sobre atos administrativos...",
                    "opcoes": ["A) presunção", "b) imperatividade", "(C) autoexecutoriedade", "D. tipicidade"],
                    "correta": "b",
                    "comentario": "Art. 2º da Lei 9.784/99."
                },
                {
                    "enunciado": "Segunda",
                    "opcoes": ["um", "dois", "três", "quatro", "cinco", "seis"],
                    "correta": "Z"
                }
            ]
        })
    }

    #[test]
    fn five_option_repair() {
        let quiz = normalize(&five_option_raw());
        assert_eq!(quiz.category, "FGV");
        assert_eq!(quiz.format, Format::FiveOption);
        assert_eq!(quiz.topic, "Direito Administrativo");
        assert_eq!(quiz.questions.len(), QUESTION_COUNT);

        let q = &quiz.questions[0];
        assert_eq!(
            q.options,
            vec![
                "A) presunção",
                "B) imperatividade",
                "C) autoexecutoriedade",
                "D) tipicidade",
                "E) —"
            ]
        );
        assert_eq!(q.correct, "B");

        let q = &quiz.questions[1];
        assert_eq!(q.options.len(), 5);
        assert_eq!(q.options[4], "E) cinco");
        assert_eq!(q.correct, "A");
        assert_eq!(q.comment, PLACEHOLDER_COMMENT);

        let q = &quiz.questions[4];
        assert_eq!(q.statement, PLACEHOLDER_STATEMENT);
        assert_eq!(q.correct, "A");
    }

    #[test]
    fn cespe_forces_binary() {
        for banca in ["cespe", "CEBRASPE", " Cespe/Cebraspe "] {
            let quiz = normalize(&json!({
                "banca": banca,
                "formato": "multipla_escolha",
                "questoes": [{"enunciado": "x", "opcoes": ["A) a", "B) b"], "correta": "errado"}]
            }));
            assert_eq!(quiz.category, CESPE);
            assert_eq!(quiz.format, Format::Binary);
            assert_eq!(quiz.topic, DEFAULT_TOPIC);
            assert_eq!(quiz.questions[0].options, vec!["Certo", "Errado"]);
            assert_eq!(quiz.questions[0].correct, "Errado");
            assert_eq!(quiz.questions[4].correct, "Certo");
        }
    }

    #[test]
    fn unknown_format_defaults_to_five_option() {
        let quiz = normalize(&json!({"banca": "FCC", "formato": "dissertativa"}));
        assert_eq!(quiz.format, Format::FiveOption);
        assert!(quiz.questions.iter().all(|q| q.options.len() == 5));
    }

    #[test]
    fn binary_correct_values() {
        assert_eq!(binary_correct(Some(&json!("ERRADO"))), "Errado");
        assert_eq!(binary_correct(Some(&json!("E"))), "Errado");
        assert_eq!(binary_correct(Some(&json!(false))), "Errado");
        assert_eq!(binary_correct(Some(&json!("talvez"))), "Certo");
        assert_eq!(binary_correct(None), "Certo");
    }

    #[test]
    fn five_option_correct_values() {
        assert_eq!(five_option_correct(Some(&json!(" c "))), "C");
        assert_eq!(five_option_correct(Some(&json!("d) texto"))), "D");
        assert_eq!(five_option_correct(Some(&json!("Errado"))), "A");
        assert_eq!(five_option_correct(Some(&json!(3))), "A");
    }

    #[test]
    fn options_as_object() {
        let options = five_options(Some(&json!({"B": "dois", "A": "um"})));
        assert_eq!(options[0], "A) um");
        assert_eq!(options[1], "B) dois");
        assert_eq!(options[2], "C) —");
    }

    #[test]
    fn non_object_payload() {
        let quiz = normalize(&json!(["not", "a", "quiz"]));
        assert_eq!(quiz.questions.len(), QUESTION_COUNT);
        assert!(quiz.questions.iter().all(|q| q.statement == PLACEHOLDER_STATEMENT));
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let once = normalize(&five_option_raw());
        let twice = normalize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    fn arb_option() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[A-Ea-e]?[).]? ?[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    fn arb_question() -> impl Strategy<Value = Value> {
        (
            proptest::option::of("[a-zA-Z ?]{0,20}"),
            proptest::collection::vec(arb_option(), 0..8),
            proptest::option::of("[A-Za-z) ]{0,6}"),
            proptest::option::of("[a-z ]{0,10}"),
        )
            .prop_map(|(statement, options, correct, comment)| {
                json!({
                    "enunciado": statement,
                    "opcoes": options,
                    "correta": correct,
                    "comentario": comment,
                })
            })
    }

    fn arb_quiz() -> impl Strategy<Value = Value> {
        (
            prop_oneof![Just("FGV"), Just("cespe"), Just("cebraspe"), Just(""), Just("fcc")],
            prop_oneof![Just("multipla_escolha"), Just("certo_errado"), Just("outro")],
            proptest::collection::vec(arb_question(), 0..12),
        )
            .prop_map(|(banca, formato, questoes)| {
                json!({"banca": banca, "formato": formato, "tema": "t", "questoes": questoes})
            })
    }

    proptest! {
        #[test]
        fn always_five_questions(raw in arb_quiz()) {
            let quiz = normalize(&raw);
            prop_assert_eq!(quiz.questions.len(), QUESTION_COUNT);
        }

        #[test]
        fn option_shape_matches_format(raw in arb_quiz()) {
            let quiz = normalize(&raw);
            for q in &quiz.questions {
                match quiz.format {
                    Format::Binary => {
                        prop_assert_eq!(&q.options, &vec!["Certo".to_string(), "Errado".to_string()]);
                        prop_assert!(BINARY_LABELS.contains(&q.correct.as_str()));
                    }
                    Format::FiveOption => {
                        prop_assert_eq!(q.options.len(), 5);
                        for (option, letter) in q.options.iter().zip(OPTION_LETTERS) {
                            let prefix = format!("{letter}) ");
                            prop_assert!(option.starts_with(&prefix));
                        }
                        prop_assert!(q.correct.len() == 1);
                        prop_assert!(OPTION_LETTERS.contains(&q.correct.chars().next().unwrap()));
                    }
                }
            }
        }

        #[test]
        fn normalization_is_idempotent(raw in arb_quiz()) {
            let once = normalize(&raw);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            prop_assert_eq!(once, twice);
        }
    }
}
