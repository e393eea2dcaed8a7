use crate::error::{ConfigError, CoreError};
use crate::types::{is_valid_subreddit_name, Credentials, QuerySpec};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CLIENT_ID: &str = "CLIENT_ID";
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const USERNAME: &str = "USERNAME";
pub const PASSWORD: &str = "PASSWORD";
pub const USER_AGENT: &str = "USER_AGENT";

/// Environment variable pointing at a run config file.
pub const CONFIG_PATH_VAR: &str = "COLLECTOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "collector.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "reddit_data.csv";
pub const DEFAULT_MAX_SELFTEXT_CHARS: usize = 500;

const DEFAULT_SUBREDDITS: [&str; 3] = ["MachineLearning", "Artificial", "OpenAI"];
const DEFAULT_KEYWORD: &str = "GPT-4";
const DEFAULT_LIMIT: u32 = 10;

impl Credentials {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds credentials from any key lookup. Absent and empty values are
    /// both reported as missing, first missing key wins.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingCredential {
                    key: key.to_string(),
                }),
            }
        };

        let credentials = Self {
            client_id: require(CLIENT_ID)?,
            client_secret: require(CLIENT_SECRET)?,
            username: require(USERNAME)?,
            password: require(PASSWORD)?,
            user_agent: require(USER_AGENT)?,
        };

        debug!("Loaded credentials for user {}", credentials.username);
        Ok(credentials)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub output: PathBuf,
    /// `0` keeps post bodies whole.
    pub max_selftext_chars: usize,
    pub queries: Vec<QuerySpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let mut queries: Vec<QuerySpec> = DEFAULT_SUBREDDITS
            .iter()
            .map(|subreddit| QuerySpec::trending(*subreddit, DEFAULT_LIMIT))
            .collect();
        queries.extend(
            DEFAULT_SUBREDDITS
                .iter()
                .map(|subreddit| QuerySpec::search(*subreddit, DEFAULT_KEYWORD, DEFAULT_LIMIT)),
        );

        Self {
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_selftext_chars: DEFAULT_MAX_SELFTEXT_CHARS,
            queries,
        }
    }
}

impl RunConfig {
    /// `$COLLECTOR_CONFIG`, else `collector.toml` when present, else the built-in plan.
    pub fn load() -> Result<Self, CoreError> {
        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            return Self::from_file(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            info!(
                "No {} found, using the built-in query plan",
                DEFAULT_CONFIG_FILE
            );
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let contents = fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            "Loaded run config from {} ({} queries)",
            path.display(),
            config.queries.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "queries".to_string(),
                value: "[]".to_string(),
            });
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output".to_string(),
                value: String::new(),
            });
        }

        for query in &self.queries {
            if !is_valid_subreddit_name(query.subreddit()) {
                return Err(ConfigError::InvalidValue {
                    field: "subreddit".to_string(),
                    value: query.subreddit().to_string(),
                });
            }
            if query.limit() == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "limit".to_string(),
                    value: "0".to_string(),
                });
            }
            if let QuerySpec::Search { keyword, .. } = query {
                if keyword.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "keyword".to_string(),
                        value: keyword.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
