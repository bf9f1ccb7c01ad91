//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{Config, ProviderKind};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "webpilot.toml";

/// Environment variable naming an explicit config file.
const CONFIG_PATH_VAR: &str = "WEBPILOT_CONFIG";

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"))
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        Self::expand_paths(&mut config);
        Ok(config)
    }

    /// Resolve, load and override the configuration for a run.
    ///
    /// An explicit path must exist. Otherwise `WEBPILOT_CONFIG` and then
    /// `./webpilot.toml` are tried, and defaults are used when neither exists.
    /// Process environment overrides are applied last.
    pub fn load_resolved(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match Self::resolve_path(explicit) {
            Some(path) => Self::load(&path)?,
            None => Config::default(),
        };
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(Self::expand_path(&path)));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    /// Apply the flat environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_PROVIDER") {
            config.llm.provider = ProviderKind::from_str(&v).map_err(|message| {
                ConfigError::InvalidValue {
                    field: "LLM_PROVIDER".to_string(),
                    message,
                }
            })?;
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_MODEL") {
            config.llm.anthropic_model = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            config.llm.openai_model = v;
        }
        if let Some(v) = get("HEADLESS") {
            config.browser.headless = parse_bool("HEADLESS", &v)?;
        }
        if let Some(v) = get("BROWSER_TIMEOUT") {
            config.browser.timeout_ms = parse_num("BROWSER_TIMEOUT", &v)?;
        }
        if let Some(v) = get("VIEWPORT_WIDTH") {
            config.browser.viewport_width = parse_num("VIEWPORT_WIDTH", &v)?;
        }
        if let Some(v) = get("VIEWPORT_HEIGHT") {
            config.browser.viewport_height = parse_num("VIEWPORT_HEIGHT", &v)?;
        }
        if let Some(v) = get("USER_DATA_DIR") {
            config.browser.user_data_dir = PathBuf::from(Self::expand_path(&v));
        }
        if let Some(v) = get("MAX_STEPS") {
            config.agent.max_steps = parse_num("MAX_STEPS", &v)?;
        }
        if let Some(v) = get("MAX_RETRIES") {
            config.agent.max_retries = parse_num("MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("QUERY_DOM_LIMIT") {
            config.agent.query_dom_limit = parse_num("QUERY_DOM_LIMIT", &v)?;
        }
        if let Some(v) = get("MAX_HISTORY_STEPS") {
            config.agent.max_history_steps = parse_num("MAX_HISTORY_STEPS", &v)?;
        }
        if let Some(v) = get("ACTION_DELAY") {
            config.agent.action_delay_secs = parse_num("ACTION_DELAY", &v)?;
        }
        if let Some(v) = get("MAX_OBSERVATION_LENGTH") {
            config.agent.max_observation_length = parse_num("MAX_OBSERVATION_LENGTH", &v)?;
        }
        if let Some(v) = get("OUTPUT_RUNS_DIR") {
            config.output.runs_dir = PathBuf::from(Self::expand_path(&v));
        }
        Ok(())
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in env_var_pattern().captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    fn expand_paths(config: &mut Config) {
        let expand = |p: &Path| PathBuf::from(Self::expand_path(&p.to_string_lossy()));
        config.browser.user_data_dir = expand(&config.browser.user_data_dir);
        config.output.runs_dir = expand(&config.output.runs_dir);
        if let Some(chrome) = config.browser.chrome_path.as_deref() {
            config.browser.chrome_path = Some(expand(chrome));
        }
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("expected a boolean, got '{}'", value),
        }),
    }
}

fn parse_num<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("expected a number, got '{}'", value),
    })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
