//! Server configuration
//!
//! Everything is read from the environment once at startup. The interview
//! format catalog may additionally come from a JSON file.

use crate::agents::AgentKind;
use crate::conversation::InterviewRules;
use crate::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PDF_RENDERER: &str = "weasyprint - {output}";
const DEFAULT_FORMAT: &str = "standard";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
    #[error("Failed to read interview rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid interview rules: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Interview rules define no formats")]
    EmptyCatalog,
}

/// Where an agent keeps its threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Database,
    Memory,
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" | "sqlite" => Ok(StorageMode::Database),
            "memory" | "mem" => Ok(StorageMode::Memory),
            other => Err(format!("expected 'database' or 'memory', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub chat_storage: StorageMode,
    pub news_storage: StorageMode,
    pub interview_storage: StorageMode,
    /// Directory for generated CSV/PDF files
    pub output_dir: PathBuf,
    /// Renderer command line; `{output}` is replaced by the target path
    pub pdf_renderer: String,
    pub interview_rules: Option<PathBuf>,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PARLEY_PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidVar {
                var: "PARLEY_PORT",
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let db_path = lookup("PARLEY_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".parley").join("parley.db")
            },
            PathBuf::from,
        );

        let storage = |var: &'static str, default: StorageMode| -> Result<StorageMode, ConfigError> {
            lookup(var).map_or(Ok(default), |raw| {
                raw.parse()
                    .map_err(|message| ConfigError::InvalidVar { var, message })
            })
        };

        Ok(Self {
            port,
            db_path,
            chat_storage: storage("PARLEY_CHAT_STORAGE", StorageMode::Database)?,
            news_storage: storage("PARLEY_NEWS_STORAGE", StorageMode::Memory)?,
            interview_storage: storage("PARLEY_INTERVIEW_STORAGE", StorageMode::Memory)?,
            output_dir: lookup("PARLEY_OUTPUT_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            pdf_renderer: lookup("PARLEY_PDF_RENDERER").unwrap_or_else(|| DEFAULT_PDF_RENDERER.to_string()),
            interview_rules: lookup("PARLEY_INTERVIEW_RULES").map(PathBuf::from),
            llm: LlmConfig::from_env(),
        })
    }

    pub fn storage_for(&self, kind: AgentKind) -> StorageMode {
        match kind {
            AgentKind::Chat => self.chat_storage,
            AgentKind::News => self.news_storage,
            AgentKind::Interview => self.interview_storage,
        }
    }

    pub fn uses_database(&self) -> bool {
        AgentKind::ALL
            .iter()
            .any(|kind| self.storage_for(*kind) == StorageMode::Database)
    }
}

// ============================================================================
// Interview format catalog
// ============================================================================

/// Question count and per-question time for one interview format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewFormat {
    pub no_of_questions: u32,
    /// Minutes per question
    pub time_frame: u32,
}

/// Rules with every field filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRules {
    pub format: String,
    pub time_frame: u32,
    pub no_of_questions: u32,
}

impl From<ResolvedRules> for InterviewRules {
    fn from(rules: ResolvedRules) -> Self {
        InterviewRules {
            format: Some(rules.format),
            time_frame: Some(rules.time_frame),
            no_of_questions: Some(rules.no_of_questions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewCatalog {
    default_format: String,
    formats: BTreeMap<String, InterviewFormat>,
}

impl Default for InterviewCatalog {
    fn default() -> Self {
        let formats = BTreeMap::from([
            (
                "short".to_string(),
                InterviewFormat {
                    no_of_questions: 3,
                    time_frame: 1,
                },
            ),
            (
                DEFAULT_FORMAT.to_string(),
                InterviewFormat {
                    no_of_questions: 5,
                    time_frame: 1,
                },
            ),
            (
                "long".to_string(),
                InterviewFormat {
                    no_of_questions: 10,
                    time_frame: 3,
                },
            ),
        ]);
        Self {
            default_format: DEFAULT_FORMAT.to_string(),
            formats,
        }
    }
}

impl InterviewCatalog {
    /// Parse `{"<format>": {"no_of_questions": n, "time_frame": m}, ...}`.
    /// A top-level `"comments"` entry is ignored.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        entries.remove("comments");

        let mut formats = BTreeMap::new();
        for (name, value) in entries {
            formats.insert(name, serde_json::from_value::<InterviewFormat>(value)?);
        }

        let default_format = if formats.contains_key(DEFAULT_FORMAT) {
            DEFAULT_FORMAT.to_string()
        } else {
            formats.keys().next().cloned().ok_or(ConfigError::EmptyCatalog)?
        };
        Ok(Self {
            default_format,
            formats,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    pub fn formats(&self) -> &BTreeMap<String, InterviewFormat> {
        &self.formats
    }

    /// Fill in whatever the caller left out. An unknown format falls back to
    /// the default format; explicit counts always win.
    pub fn resolve(&self, rules: Option<&InterviewRules>) -> ResolvedRules {
        let requested = rules.and_then(|r| r.format.as_deref());
        let (format, defaults) = requested
            .and_then(|name| self.formats.get_key_value(name))
            .or_else(|| self.formats.get_key_value(&self.default_format))
            .map_or_else(
                || {
                    (
                        DEFAULT_FORMAT.to_string(),
                        InterviewFormat {
                            no_of_questions: 5,
                            time_frame: 1,
                        },
                    )
                },
                |(name, format)| (name.clone(), *format),
            );

        if let Some(name) = requested.filter(|name| *name != format) {
            tracing::warn!(requested = name, using = %format, "Unknown interview format");
        }

        ResolvedRules {
            format,
            time_frame: rules.and_then(|r| r.time_frame).unwrap_or(defaults.time_frame),
            no_of_questions: rules
                .and_then(|r| r.no_of_questions)
                .unwrap_or(defaults.no_of_questions),
        }
    }
}
