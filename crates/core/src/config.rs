use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub guardrails: GuardrailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GuardrailConfig {
    /// Scores below this are off-topic; must stay below `threshold_clarify`
    /// or the banding collapses.
    pub threshold_offtopic: f32,
    pub threshold_clarify: f32,
    pub audit_log: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub embedding_model: Option<String>,
    pub audit_log: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.2".to_string(),
                timeout_secs: 60,
                api_key: None,
            },
            embedding: EmbeddingConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "nomic-embed-text".to_string(),
                timeout_secs: 30,
            },
            guardrails: GuardrailConfig {
                threshold_offtopic: 0.40,
                threshold_clarify: 0.48,
                audit_log: PathBuf::from("logs/guardrails.jsonl"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tablesafe.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = base_url;
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
        }

        if let Some(guardrails) = patch.guardrails {
            if let Some(threshold_offtopic) = guardrails.threshold_offtopic {
                self.guardrails.threshold_offtopic = threshold_offtopic;
            }
            if let Some(threshold_clarify) = guardrails.threshold_clarify {
                self.guardrails.threshold_clarify = threshold_clarify;
            }
            if let Some(audit_log) = guardrails.audit_log {
                self.guardrails.audit_log = audit_log;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TABLESAFE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("TABLESAFE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TABLESAFE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TABLESAFE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TABLESAFE_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }

        if let Some(value) = read_env("TABLESAFE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = value;
        }
        if let Some(value) = read_env("TABLESAFE_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = read_env("TABLESAFE_EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_u64("TABLESAFE_EMBEDDING_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TABLESAFE_THRESHOLD_OFFTOPIC") {
            self.guardrails.threshold_offtopic = parse_f32("TABLESAFE_THRESHOLD_OFFTOPIC", &value)?;
        }
        if let Some(value) = read_env("TABLESAFE_THRESHOLD_CLARIFY") {
            self.guardrails.threshold_clarify = parse_f32("TABLESAFE_THRESHOLD_CLARIFY", &value)?;
        }
        if let Some(value) = read_env("TABLESAFE_AUDIT_LOG") {
            self.guardrails.audit_log = PathBuf::from(value);
        }

        if let Some(value) = read_env("TABLESAFE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("TABLESAFE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(embedding_model) = overrides.embedding_model {
            self.embedding.model = embedding_model;
        }
        if let Some(audit_log) = overrides.audit_log {
            self.guardrails.audit_log = audit_log;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend("llm", &self.llm.base_url, self.llm.timeout_secs)?;
        validate_backend("embedding", &self.embedding.base_url, self.embedding.timeout_secs)?;
        validate_guardrails(&self.guardrails)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tablesafe.toml"), PathBuf::from("config/tablesafe.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_backend(section: &str, base_url: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{section}.base_url must start with http:// or https://"
        )));
    }
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=300"
        )));
    }
    Ok(())
}

fn validate_guardrails(guardrails: &GuardrailConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("guardrails.threshold_offtopic", guardrails.threshold_offtopic),
        ("guardrails.threshold_clarify", guardrails.threshold_clarify),
    ] {
        if !(-1.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{name} must be a cosine similarity in range -1.0..=1.0"
            )));
        }
    }

    if guardrails.threshold_offtopic >= guardrails.threshold_clarify {
        return Err(ConfigError::Validation(
            "guardrails.threshold_offtopic must be below guardrails.threshold_clarify".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    embedding: Option<EmbeddingPatch>,
    guardrails: Option<GuardrailsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GuardrailsPatch {
    threshold_offtopic: Option<f32>,
    threshold_clarify: Option<f32>,
    audit_log: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_validate_and_keep_threshold_ordering() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions::default()).expect("defaults are valid");

        assert!(config.guardrails.threshold_offtopic < config.guardrails.threshold_clarify);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let _guard = env_lock().lock().expect("env lock");

        env::set_var("TABLESAFE_THRESHOLD_OFFTOPIC", "0.9");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["TABLESAFE_THRESHOLD_OFFTOPIC"]);

        let error = result.expect_err("offtopic above clarify must fail");
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("threshold_offtopic")
        ));
    }

    #[test]
    fn file_patch_then_env_then_overrides_precedence() {
        let _guard = env_lock().lock().expect("env lock");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tablesafe.toml");
        fs::write(
            &path,
            r#"
[llm]
model = "from-file"

[logging]
level = "warn"
"#,
        )
        .expect("write config file");

        env::set_var("TABLESAFE_LLM_MODEL", "from-env");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        clear_vars(&["TABLESAFE_LLM_MODEL"]);

        let config = config.expect("config loads");
        assert_eq!(config.llm.model, "from-env", "env wins over file");
        assert_eq!(config.logging.level, "debug", "explicit override wins over file");
    }

    #[test]
    fn missing_required_file_fails() {
        let _guard = env_lock().lock().expect("env lock");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("absent required file must fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(found) if found == path));
    }

    #[test]
    fn malformed_env_override_is_reported() {
        let _guard = env_lock().lock().expect("env lock");

        env::set_var("TABLESAFE_LLM_TIMEOUT_SECS", "soon");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["TABLESAFE_LLM_TIMEOUT_SECS"]);

        assert!(matches!(
            result.expect_err("bad timeout must fail"),
            ConfigError::InvalidEnvOverride { ref key, .. } if key == "TABLESAFE_LLM_TIMEOUT_SECS"
        ));
    }
}
