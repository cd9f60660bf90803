use crate::config::types::{Config, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Upper bound for the launch spacing; anything slower is almost certainly a typo
const MAX_LAUNCH_SPACING_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_seed_config(&config.seed)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.launch_spacing_ms > MAX_LAUNCH_SPACING_MS {
        return Err(ConfigError::Validation(format!(
            "launch-spacing-ms must be <= {}ms, got {}ms",
            MAX_LAUNCH_SPACING_MS, config.launch_spacing_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed strategy
fn validate_seed_config(seed: &SeedConfig) -> Result<(), ConfigError> {
    match seed {
        SeedConfig::Sitemap { sitemap_url } => validate_http_url("sitemap-url", sitemap_url),
        SeedConfig::Categories { categories } => {
            if categories.is_empty() {
                return Err(ConfigError::Validation(
                    "categories seed strategy needs at least one category URL".to_string(),
                ));
            }
            for category in categories {
                validate_http_url("categories", category)?;
            }
            Ok(())
        }
        SeedConfig::PageRange {
            listing_url,
            first_page,
            last_page,
        } => {
            validate_http_url("listing-url", listing_url)?;
            if *first_page < 1 {
                return Err(ConfigError::Validation(
                    "first-page must be >= 1".to_string(),
                ));
            }
            if first_page > last_page {
                return Err(ConfigError::Validation(format!(
                    "first-page ({}) must not exceed last-page ({})",
                    first_page, last_page
                )));
            }
            Ok(())
        }
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for (key, path) in config.paths() {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
        }
        if !seen.insert(path) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' is used for more than one output",
                key, path
            )));
        }
    }

    Ok(())
}

/// Checks that every output path can be written
///
/// The parent directory of each path must exist and accept new files. A
/// throwaway temp file is created in it to prove this; it is removed on drop.
pub fn check_output_paths(config: &OutputConfig) -> Result<(), ConfigError> {
    for (_, path) in config.paths() {
        let parent = match Path::new(path).parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        if !parent.is_dir() {
            return Err(ConfigError::UnwritablePath {
                path: path.to_string(),
                reason: format!("directory {} does not exist", parent.display()),
            });
        }

        if Path::new(path).is_dir() {
            return Err(ConfigError::UnwritablePath {
                path: path.to_string(),
                reason: "path is a directory".to_string(),
            });
        }

        tempfile::NamedTempFile::new_in(parent).map_err(|e| ConfigError::UnwritablePath {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

/// Validates that a config value is an absolute http(s) URL
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
