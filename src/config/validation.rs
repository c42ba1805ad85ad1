use crate::config::types::{
    Config, FetchConfig, OutputConfig, ScheduleConfig, ScorerConfig, SourceConfig, ThrottleConfig,
    UserAgentConfig,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_source_config(&config.source)?;
    validate_fetch_config(&config.fetch)?;
    validate_throttle_config(&config.throttle)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_http_url("scrape-api endpoint", &config.scrape_api.endpoint)?;
    if config.scrape_api.key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "scrape-api key-env cannot be empty".to_string(),
        ));
    }
    if config.cache.path.is_empty() {
        return Err(ConfigError::Validation(
            "cache path cannot be empty".to_string(),
        ));
    }
    validate_schedule_config(&config.schedule)?;
    validate_scorer_config(&config.scorer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> ConfigResult<()> {
    validate_http_url("source url", &config.url)?;

    if config.expected_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "expected-marker cannot be blank".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> ConfigResult<()> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

fn validate_throttle_config(config: &ThrottleConfig) -> ConfigResult<()> {
    if config.max_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "throttle max-requests must be >= 1, got {}",
            config.max_requests
        )));
    }

    if config.window_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "throttle window-secs must be >= 1, got {}",
            config.window_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> ConfigResult<()> {
    for (name, value) in [
        ("container-id-prefix", &config.container_id_prefix),
        ("period-stat", &config.period_stat),
        ("result-stat", &config.result_stat),
        ("link-text", &config.link_text),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "schedule {} cannot be empty",
                name
            )));
        }
    }

    validate_http_url("schedule link-base", &config.link_base)
}

fn validate_scorer_config(config: &ScorerConfig) -> ConfigResult<()> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "scorer program cannot be empty".to_string(),
        ));
    }

    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "scorer output-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.contains(|c: char| c == '/' || c == '\\') {
        return Err(ConfigError::Validation(format!(
            "output file-prefix must not contain path separators, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

/// Parses `value` and requires an http(s) scheme
fn validate_http_url(field: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
