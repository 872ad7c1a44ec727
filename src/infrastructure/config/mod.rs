use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{Credential, LLMConfig};

pub const DEFAULT_CONFIG_FILE: &str = "csvqa.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest CSV upload accepted
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are dropped
    pub session_idle_minutes: i64,
    /// Rows sent back to the page for the table view
    pub preview_rows: usize,
    /// Field separator for uploads, a single ASCII character
    pub csv_delimiter: char,
    pub permissive_cors: bool,
}

impl ServerConfig {
    pub fn session_idle(&self) -> Result<chrono::Duration> {
        if self.session_idle_minutes <= 0 {
            return Err(AppError::ConfigError(
                "server.session_idle_minutes must be positive".to_string(),
            ));
        }
        chrono::Duration::try_minutes(self.session_idle_minutes).ok_or_else(|| {
            AppError::ConfigError(format!(
                "server.session_idle_minutes is too large: {}",
                self.session_idle_minutes
            ))
        })
    }

    pub fn delimiter(&self) -> Result<u8> {
        u8::try_from(self.csv_delimiter)
            .ok()
            .filter(|&byte| byte.is_ascii() && !matches!(byte, b'"' | b'\n' | b'\r'))
            .ok_or_else(|| {
                AppError::ConfigError(format!(
                    "server.csv_delimiter must be a single ASCII character, got {:?}",
                    self.csv_delimiter
                ))
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 200 * 1024 * 1024,
            session_idle_minutes: 60,
            preview_rows: 1000,
            csv_delimiter: ',',
            permissive_cors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Rows of the table included in the prompt
    pub max_prompt_rows: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_prompt_rows: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub agent: AgentConfig,
    /// Read from `OPENAI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

impl AppConfig {
    /// Load `.env`, then defaults <- config file <- `CSVQA_*` env <- `OPENAI_API_KEY`.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env"),
            Err(err) if err.not_found() => debug!("No .env file found"),
            Err(err) => warn!(error = %err, "Failed to read .env"),
        }

        let path = std::env::var("CSVQA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_figment(Self::figment(&path))
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CSVQA_").split("__"))
            .merge(Env::raw().only(&["OPENAI_API_KEY"]))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::ConfigError("server.port must be non-zero".to_string()));
        }
        self.server.session_idle()?;
        self.server.delimiter()?;
        if self.agent.max_prompt_rows == 0 {
            return Err(AppError::ConfigError(
                "agent.max_prompt_rows must be positive".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(AppError::ConfigError("llm.timeout_secs must be positive".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::ConfigError("llm.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// `None` when no usable key is configured.
    pub fn credential(&self) -> Option<Credential> {
        self.openai_api_key.clone().and_then(Credential::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;
    use figment::Jail;

    fn from_toml(toml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8501);
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_toml_overrides_nested_keys() {
        let config = from_toml(
            r#"
            openai_api_key = "sk-file"

            [server]
            port = 9000

            [llm]
            provider = "OpenRouter"
            model = "openai/gpt-4o"

            [agent]
            max_prompt_rows = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.provider, LLMProvider::OpenRouter);
        assert_eq!(config.llm.endpoint(), "https://openrouter.ai/api/v1");
        assert_eq!(config.agent.max_prompt_rows, 50);
        assert_eq!(config.credential().unwrap().expose(), "sk-file");
    }

    #[test]
    fn test_blank_key_is_no_credential() {
        let config = from_toml(r#"openai_api_key = " ""#).unwrap();
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = from_toml("[agent]\nmax_prompt_rows = 0").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));

        let err = from_toml("[server]\nport = \"not a port\"").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_idle_timeout_and_delimiter_bounds() {
        let err = from_toml(&format!("[server]\nsession_idle_minutes = {}", i64::MAX)).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));

        let err = from_toml("[server]\nsession_idle_minutes = 0").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));

        let config = from_toml("[server]\nsession_idle_minutes = 5\ncsv_delimiter = \";\"").unwrap();
        assert_eq!(config.server.session_idle().unwrap(), chrono::Duration::minutes(5));
        assert_eq!(config.server.delimiter().unwrap(), b';');

        let err = from_toml("[server]\ncsv_delimiter = \"é\"").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "csvqa.toml",
                r#"
                openai_api_key = "sk-file"

                [server]
                port = 9000
                preview_rows = 10
                "#,
            )?;
            jail.set_env("CSVQA_SERVER__PORT", "9123");
            jail.set_env("CSVQA_LLM__MODEL", "gpt-4o");
            jail.set_env("OPENAI_API_KEY", "sk-env");

            let config = AppConfig::from_figment(AppConfig::figment(Path::new("csvqa.toml")))
                .expect("config");
            assert_eq!(config.server.port, 9123);
            assert_eq!(config.server.preview_rows, 10);
            assert_eq!(config.llm.model, "gpt-4o");
            assert_eq!(config.credential().expect("credential").expose(), "sk-env");
            Ok(())
        });
    }

    #[test]
    fn test_load_reads_config_path_from_env() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[server]\nport = 9200\n")?;
            jail.set_env("CSVQA_CONFIG", "custom.toml");

            let config = AppConfig::load().expect("config");
            assert_eq!(config.server.port, 9200);
            assert_eq!(config.server.host, "127.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("OPENAI_API_KEY", "  ");

            let config = AppConfig::from_figment(AppConfig::figment(Path::new("absent.toml")))
                .expect("config");
            assert_eq!(config.server, ServerConfig::default());
            assert!(config.credential().is_none());
            Ok(())
        });
    }
}
