//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_llm(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_agent(config, &mut result);
        result
    }

    fn validate_llm(config: &Config, result: &mut ValidationResult) {
        if config.llm.api_key().is_none() {
            result.add_error(ValidationError::new(
                format!("llm.{}_api_key", config.llm.provider),
                format!("No API key set for provider '{}'", config.llm.provider),
            ));
        }

        if config.llm.model().is_empty() {
            result.add_error(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        if config.llm.max_tokens == 0 {
            result.add_error(ValidationError::new(
                "llm.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if config.browser.viewport_width == 0 || config.browser.viewport_height == 0 {
            result.add_error(ValidationError::new(
                "browser.viewport",
                "Viewport dimensions must be greater than 0",
            ));
        }

        if config.browser.timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "browser.timeout_ms",
                "timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        if config.agent.max_steps == 0 {
            result.add_error(ValidationError::new(
                "agent.max_steps",
                "max_steps must be greater than 0",
            ));
        }

        if config.agent.max_steps > 500 {
            result.add_warning(ValidationWarning::new(
                "agent.max_steps",
                "max_steps is very high (>500), a stuck task may run for a long time",
            ));
        }

        if config.agent.query_dom_limit == 0 {
            result.add_error(ValidationError::new(
                "agent.query_dom_limit",
                "query_dom_limit must be greater than 0",
            ));
        }

        if config.agent.action_delay_secs < 0.0 {
            result.add_error(ValidationError::new(
                "agent.action_delay_secs",
                "action_delay_secs cannot be negative",
            ));
        }
    }
}
