//! Mock exams ("simulados"): the strict types every quiz is normalized into, plus the pipeline
//! that asks the LLM for one.

pub mod extract;
pub mod generate;
pub mod normalize;

/// Number of questions in every quiz.
pub const QUESTION_COUNT: usize = 5;

/// Option letters for five-option questions, in display order.
pub const OPTION_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// The two fixed labels of binary (certo/errado) questions.
pub const BINARY_LABELS: [&str; 2] = ["Certo", "Errado"];

/// How questions are answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Format {
    /// True/false style, answered with one of [`BINARY_LABELS`].
    #[serde(rename = "certo_errado")]
    Binary,
    /// Multiple choice, answered with a letter from [`OPTION_LETTERS`].
    #[serde(rename = "multipla_escolha")]
    FiveOption,
}

impl Format {
    /// Wire name used in the LLM-facing JSON schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Binary => "certo_errado",
            Format::FiveOption => "multipla_escolha",
        }
    }

    /// Choice identifiers a user may submit, in button order.
    pub fn choices(&self) -> Vec<String> {
        match self {
            Format::Binary => BINARY_LABELS.iter().map(|l| l.to_string()).collect(),
            Format::FiveOption => OPTION_LETTERS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Question {
    #[serde(rename = "enunciado")]
    pub statement: String,
    #[serde(rename = "opcoes")]
    pub options: Vec<String>,
    /// A letter for five-option questions, a [`BINARY_LABELS`] entry for binary ones.
    #[serde(rename = "correta")]
    pub correct: String,
    #[serde(rename = "comentario")]
    pub comment: String,
}

impl Question {
    /// Whether `choice` names the correct option.  Case is ignored so that button ids such as
    /// `CERTO` match the `Certo` label.
    pub fn is_correct(&self, choice: &str) -> bool {
        self.correct.eq_ignore_ascii_case(choice.trim())
    }
}

/// A normalized quiz.  Only [`normalize::normalize`] builds these, which guarantees exactly
/// [`QUESTION_COUNT`] well-formed questions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Quiz {
    #[serde(rename = "banca")]
    pub category: String,
    #[serde(rename = "formato")]
    pub format: Format,
    #[serde(rename = "tema")]
    pub topic: String,
    #[serde(rename = "questoes")]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_match_ignores_case() {
        let q = Question {
            statement: "Afirmação".to_string(),
            options: vec!["Certo".to_string(), "Errado".to_string()],
            correct: "Errado".to_string(),
            comment: "Motivo".to_string(),
        };
        assert!(q.is_correct("ERRADO"));
        assert!(q.is_correct("errado"));
        assert!(!q.is_correct("CERTO"));
    }

    #[test]
    fn format_wire_names() {
        assert_eq!(
            serde_json::to_value(Format::Binary).unwrap(),
            serde_json::json!("certo_errado")
        );
        assert_eq!(Format::FiveOption.as_str(), "multipla_escolha");
        assert_eq!(Format::FiveOption.choices(), vec!["A", "B", "C", "D", "E"]);
    }
}
