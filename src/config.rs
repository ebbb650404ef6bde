use anyhow::{Context, Result};
use nlq_core::dispatch::DEFAULT_CACHE_CAPACITY;
use nlq_core::{EngineOptions, MergePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default)]
    pub hybrid_merge: MergePolicy,
    #[serde(default = "default_entity_columns")]
    pub entity_columns: Vec<String>,
    #[serde(default = "default_row_limit")]
    pub default_row_limit: u32,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_cache")]
    pub cache: bool,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            hybrid_merge: MergePolicy::default(),
            entity_columns: default_entity_columns(),
            default_row_limit: default_row_limit(),
            excerpt_chars: default_excerpt_chars(),
            cache: default_cache(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_entity_columns() -> Vec<String> {
    vec!["full_name".to_string()]
}
fn default_row_limit() -> u32 {
    10
}
fn default_excerpt_chars() -> usize {
    80
}
fn default_cache() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Files or directories ingested when the server starts.
    #[serde(default)]
    pub preload: Vec<PathBuf>,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            preload: Vec::new(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Defaults plus a database in `./data`, for commands run without a
    /// config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/nlq.sqlite"),
            },
            server: ServerConfig::default(),
            query: QueryConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            merge_policy: self.query.hybrid_merge,
            entity_columns: self.query.entity_columns.clone(),
            excerpt_chars: self.query.excerpt_chars,
            default_row_limit: self.query.default_row_limit,
            cache_enabled: self.query.cache,
            cache_capacity: Some(self.query.cache_capacity),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if !(1..=100).contains(&config.query.default_row_limit) {
        anyhow::bail!("query.default_row_limit must be in [1, 100]");
    }

    if config.query.excerpt_chars == 0 {
        anyhow::bail!("query.excerpt_chars must be > 0");
    }

    if config.query.hybrid_merge == MergePolicy::FilterByEntity
        && config.query.entity_columns.is_empty()
    {
        anyhow::bail!("query.entity_columns must not be empty when hybrid_merge is 'filter_by_entity'");
    }

    if config.query.cache_capacity == 0 {
        anyhow::bail!("query.cache_capacity must be > 0");
    }

    if config.documents.max_bytes == 0 {
        anyhow::bail!("documents.max_bytes must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: Config = toml::from_str("[db]\npath = \"data/x.sqlite\"\n").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.query.hybrid_merge, MergePolicy::FilterByEntity);
        assert_eq!(config.query.entity_columns, vec!["full_name"]);
        assert!(config.query.cache);
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_merge_policy_names() {
        let config: Config = toml::from_str(
            "[db]\npath = \"x.sqlite\"\n[query]\nhybrid_merge = \"concatenate\"\n",
        )
        .unwrap();
        assert_eq!(config.engine_options().merge_policy, MergePolicy::Concatenate);

        let bad = toml::from_str::<Config>(
            "[db]\npath = \"x.sqlite\"\n[query]\nhybrid_merge = \"union\"\n",
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_row_limit() {
        let config: Config =
            toml::from_str("[db]\npath = \"x.sqlite\"\n[query]\ndefault_row_limit = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_cache_capacity() {
        let config: Config = toml::from_str("[db]\npath = \"x.sqlite\"\n").unwrap();
        assert_eq!(config.engine_options().cache_capacity, Some(200));

        let config: Config =
            toml::from_str("[db]\npath = \"x.sqlite\"\n[query]\ncache_capacity = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/nlq.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
