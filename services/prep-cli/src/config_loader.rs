//! Configuration loader for the prep CLIs.
//!
//! Loads and validates YAML configuration files for:
//! - Catalog builds (catalog.yaml)
//! - Store transcodes (transcode.yaml)
//!
//! Supports environment variable substitution using ${VAR} and
//! ${VAR:-default} syntax.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use array_transcoder::TranscodeSpec;
use schema_catalog::TargetSpec;
use serde::{Deserialize, Serialize};

/// Delivery variant used when a transcode source is resolved through a
/// describe document without naming one.
pub const DEFAULT_SERVICE: &str = "arco-geo-series";

// ============================================================================
// Catalog Configuration (catalog.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Describe document location: a local path or an http(s) URL.
    pub describe_source: String,
    /// Where the catalog JSON is written.
    pub output: PathBuf,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

// ============================================================================
// Transcode Configuration (transcode.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    pub source: SourceConfig,
    pub transcode: TranscodeSpec,
}

/// Where the source store is read from. Exactly one of `store_url`,
/// `local_path` and `describe_source` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of a consolidated Zarr store.
    #[serde(default)]
    pub store_url: Option<String>,
    /// Local consolidated Zarr directory.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Describe document used to look up the store URL.
    #[serde(default)]
    pub describe_source: Option<String>,
    /// Delivery variant to look up in the describe document.
    #[serde(default)]
    pub service: Option<String>,
}

impl SourceConfig {
    pub fn service_name(&self) -> &str {
        self.service.as_deref().unwrap_or(DEFAULT_SERVICE)
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse catalog.yaml with environment variable substitution
pub fn load_catalog_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read catalog config from {:?}", path.as_ref()))?;

    let expanded = expand_env_vars(&content)?;

    let config: CatalogConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse catalog config from {:?}", path.as_ref()))?;

    validate_catalog_config(&config)?;

    Ok(config)
}

/// Load and parse transcode.yaml with environment variable substitution.
///
/// `TRANSCODE_*` environment overrides are applied before validation.
pub fn load_transcode_config<P: AsRef<Path>>(path: P) -> Result<TranscodeConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read transcode config from {:?}", path.as_ref()))?;

    let expanded = expand_env_vars(&content)?;

    let mut config: TranscodeConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse transcode config from {:?}", path.as_ref()))?;

    config.transcode.apply_env_overrides();
    validate_transcode_config(&config)?;

    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_catalog_config(config: &CatalogConfig) -> Result<()> {
    anyhow::ensure!(
        !config.describe_source.trim().is_empty(),
        "describe_source cannot be empty"
    );
    anyhow::ensure!(
        !config.output.as_os_str().is_empty(),
        "output path cannot be empty"
    );

    for target in &config.targets {
        target
            .validate()
            .with_context(|| format!("Invalid target {:?}", target.dataset_id))?;
    }

    Ok(())
}

fn validate_source_config(source: &SourceConfig) -> Result<()> {
    let configured = [
        source.store_url.is_some(),
        source.local_path.is_some(),
        source.describe_source.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    anyhow::ensure!(
        configured == 1,
        "Exactly one of source.store_url, source.local_path and source.describe_source must be set ({} given)",
        configured
    );

    if let Some(url) = &source.store_url {
        anyhow::ensure!(
            url.starts_with("http://") || url.starts_with("https://"),
            "source.store_url must be an http(s) URL: {}",
            url
        );
    }

    anyhow::ensure!(
        source.service.is_none() || source.describe_source.is_some(),
        "source.service only applies with source.describe_source"
    );

    Ok(())
}

fn validate_transcode_config(config: &TranscodeConfig) -> Result<()> {
    validate_source_config(&config.source)?;
    config
        .transcode
        .validate()
        .context("Invalid transcode settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("PREP_CLI_TEST_ROOT", "/srv/public");
        let expanded = expand_env_vars("output: ${PREP_CLI_TEST_ROOT}/catalog.json").unwrap();
        assert_eq!(expanded, "output: /srv/public/catalog.json");
    }

    #[test]
    fn test_expand_env_vars_default() {
        std::env::remove_var("PREP_CLI_TEST_UNSET");
        let expanded = expand_env_vars("factor: ${PREP_CLI_TEST_UNSET:-3}").unwrap();
        assert_eq!(expanded, "factor: 3");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        std::env::remove_var("PREP_CLI_TEST_MISSING");
        assert!(expand_env_vars("${PREP_CLI_TEST_MISSING}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_plain_dollar_kept() {
        assert_eq!(expand_env_vars("cost: $5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_source_must_be_unique() {
        let both = SourceConfig {
            store_url: Some("https://example.org/a.zarr".to_string()),
            local_path: Some(PathBuf::from("a.zarr")),
            ..Default::default()
        };
        assert!(validate_source_config(&both).is_err());
        assert!(validate_source_config(&SourceConfig::default()).is_err());

        let url = SourceConfig {
            store_url: Some("https://example.org/a.zarr".to_string()),
            ..Default::default()
        };
        assert!(validate_source_config(&url).is_ok());
    }

    #[test]
    fn test_service_requires_describe_source() {
        let source = SourceConfig {
            local_path: Some(PathBuf::from("a.zarr")),
            service: Some("arco-time-series".to_string()),
            ..Default::default()
        };
        assert!(validate_source_config(&source).is_err());

        let source = SourceConfig {
            describe_source: Some("describe.json".to_string()),
            ..Default::default()
        };
        assert_eq!(source.service_name(), DEFAULT_SERVICE);
    }
}
