use std::path::{Path, PathBuf};

use deepchat_llm::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, OLLAMA_PROVIDER_ID, ProviderConfig};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use gpui::{App, Global};
use gpui_component::{Theme, ThemeMode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "deepchat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "DEEPCHAT_";

/// Startup configuration shared by every panel. Read-only at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Optional cap on one accumulated answer; unbounded when absent.
    #[serde(default)]
    pub max_response_bytes: Option<usize>,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
}

impl Global for ChatSettings {}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_response_bytes: None,
            theme_mode: default_theme_mode(),
        }
    }
}

impl ChatSettings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".deepchat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Defaults, then the JSON file, then `DEEPCHAT_*` environment variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX))
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let settings = Self::figment(path)
            .extract::<Self>()
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?;

        Ok(settings.normalized())
    }

    /// Loads from the default location, falling back to defaults on error.
    pub fn load() -> Self {
        let path = Self::default_config_path();
        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!(
                    path = ?path,
                    provider_id = %settings.provider_id,
                    model = %settings.model,
                    "loaded chat settings"
                );
                settings
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.model = non_blank_or(self.model, default_model);
        self.max_response_bytes = self.max_response_bytes.filter(|limit| *limit > 0);
        self
    }

    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.provider_id, &self.endpoint, Some(self.model.clone()))
    }

    pub fn apply_theme(&self, cx: &mut App) {
        Theme::change(self.theme_mode, None, cx);
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_provider_id() -> String {
    OLLAMA_PROVIDER_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_OLLAMA_MODEL.to_string()
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Dark
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("light") {
        ThemeMode::Light
    } else {
        ThemeMode::Dark
    }
}
