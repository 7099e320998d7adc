//! # Configuration Module
//!
//! Runtime settings read from the environment: API keys, model names, the
//! data directory and the reply polishing mode.
//!
//! | Variable | Default |
//! |---|---|
//! | `GEMINI_API_KEY` | unset (Gemini disabled) |
//! | `GEMINI_MODEL` | `gemini-1.5-flash` |
//! | `MISTRAL_API_KEYS` | unset; comma-separated, tried in order |
//! | `MISTRAL_MODEL` | `mistral-small` |
//! | `ORGBOT_DATA_DIR` | `.orgbot` |
//! | `ORGBOT_POLISH` | `drivers`; `llm` rewrites replies with the LLM |
//! | `ORGBOT_MATCHER` | `keyword`; `bm25` ranks crawled pages with BM25 |

use std::path::PathBuf;

use crate::bots::BotKind;
use crate::llm::{gemini, mistral};
use crate::matcher::MatchStrategy;

/// How replies are finished before they are returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PolishMode {
    /// Append conversation drivers only
    #[default]
    Drivers,
    /// Rewrite the reply with the LLM, then append drivers
    Llm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub mistral_api_keys: Vec<String>,
    pub mistral_model: String,
    pub data_dir: PathBuf,
    pub polish: PolishMode,
    pub matcher: MatchStrategy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            mistral_api_keys: Vec::new(),
            mistral_model: mistral::DEFAULT_MODEL.to_string(),
            data_dir: PathBuf::from(".orgbot"),
            polish: PolishMode::default(),
            matcher: MatchStrategy::default(),
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            mistral_api_keys: get("MISTRAL_API_KEYS")
                .map(|keys| {
                    keys.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            mistral_model: get("MISTRAL_MODEL").unwrap_or(defaults.mistral_model),
            data_dir: get("ORGBOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            polish: match get("ORGBOT_POLISH").as_deref() {
                Some(mode) if mode.eq_ignore_ascii_case("llm") => PolishMode::Llm,
                _ => PolishMode::Drivers,
            },
            matcher: match get("ORGBOT_MATCHER").as_deref() {
                Some(m) if m.eq_ignore_ascii_case("bm25") => MatchStrategy::Bm25,
                _ => MatchStrategy::Keyword,
            },
        }
    }

    pub fn has_llm(&self) -> bool {
        self.gemini_api_key.is_some() || !self.mistral_api_keys.is_empty()
    }

    /// `session_history_<bot>.json` inside the data directory
    pub fn history_path(&self, kind: BotKind) -> PathBuf {
        self.data_dir
            .join(format!("session_history_{}.json", kind.slug()))
    }

    /// `<bot>_knowledge.json` inside the data directory
    pub fn knowledge_path(&self, kind: BotKind) -> PathBuf {
        self.data_dir.join(format!("{}_knowledge.json", kind.slug()))
    }

    pub fn crawl_dir(&self) -> PathBuf {
        self.data_dir.join("crawler")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("orgbot.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("orgbot.log")
    }
}

/// Builder for [`Settings`]
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.gemini_api_key = Some(key.into());
        self
    }

    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.settings.gemini_model = model.into();
        self
    }

    pub fn mistral_api_keys(mut self, keys: Vec<String>) -> Self {
        self.settings.mistral_api_keys = keys;
        self
    }

    pub fn mistral_model(mut self, model: impl Into<String>) -> Self {
        self.settings.mistral_model = model.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.data_dir = dir.into();
        self
    }

    pub fn polish(mut self, polish: PolishMode) -> Self {
        self.settings.polish = polish;
        self
    }

    pub fn matcher(mut self, matcher: MatchStrategy) -> Self {
        self.settings.matcher = matcher;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}
