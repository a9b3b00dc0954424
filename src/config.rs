use crate::llm::{LlmEndpoint, LlmSettings};
use crate::quiz::generate::QuizSettings;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/simubot/config.toml";

/// Secrets may come from the environment instead of the config file.
const DISCORD_TOKEN_ENV: &str = "SIMUBOT_DISCORD_TOKEN";
const LLM_API_KEY_ENV: &str = "SIMUBOT_LLM_API_KEY";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    pub llm: Llm,
    pub llm_reply: LlmReply,
    pub quiz: Quiz,
    pub jokes: Jokes,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    #[serde(default)]
    pub discord_token: String,
    pub bot_owners: Vec<String>,
    pub command_prefix: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Llm {
    pub chat_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub max_concurrent_requests: usize,
    pub request_timeout_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LlmReply {
    pub system: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Recent channel messages sent along with a mention
    pub history_len: usize,
    /// Probability of appending a joke to a reply
    pub joke_chance: f64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub system: String,
    pub temperature: f32,
    pub retry_temperature: f32,
    pub max_tokens: u32,
    /// How long answer buttons stay usable after the last interaction
    pub button_timeout_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Jokes {
    pub lines: Vec<String>,
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut config = Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        if let Ok(token) = std::env::var(DISCORD_TOKEN_ENV) {
            config.general.discord_token = token;
        }
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            config.llm.api_key = Some(key);
        }

        if config.general.discord_token.is_empty() {
            return Err(anyhow!(
                "Missing Discord token: set `general.discord_token` or ${}",
                DISCORD_TOKEN_ENV
            ));
        }

        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }
}

impl Llm {
    pub fn as_endpoint(&self) -> LlmEndpoint {
        LlmEndpoint {
            chat_url: self.chat_url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            model_name: self.model_name.clone(),
            timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

impl LlmReply {
    pub fn as_llm_settings(&self) -> LlmSettings {
        LlmSettings {
            system: self.system.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl Quiz {
    pub fn as_quiz_settings(&self) -> QuizSettings {
        QuizSettings {
            system: self.system.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            retry_temperature: self.retry_temperature,
        }
    }

    pub fn button_timeout(&self) -> Duration {
        Duration::from_secs(self.button_timeout_seconds)
    }
}
