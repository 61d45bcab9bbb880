use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::epg::ChannelSelection;
use crate::errors::ConfigError;
use crate::utils::url::UrlUtils;

/// How channels are matched against the configured values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Match the channel `id` attribute
    Id,
    /// Match any trimmed `display-name` value
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    #[serde(default)]
    pub values: Vec<String>,
}

/// What happens to the run when one source fails to fetch, decode or parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceErrorPolicy {
    /// Abort with a single source, skip when several are configured
    #[default]
    Auto,
    Abort,
    Skip,
}

impl SourceErrorPolicy {
    /// Whether a failed source should be skipped given how many are configured
    pub fn skips_failures(&self, source_count: usize) -> bool {
        match self {
            SourceErrorPolicy::Auto => source_count > 1,
            SourceErrorPolicy::Abort => false,
            SourceErrorPolicy::Skip => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout, one attempt only
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source URLs in merge order
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionConfig>,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub on_source_error: SourceErrorPolicy,
    /// Fetch all sources at once; merge order still follows `sources`
    #[serde(default = "default_concurrent_fetch")]
    pub concurrent_fetch: bool,
    /// Refuse to write a partial merge when any source was skipped
    #[serde(default = "default_require_all_sources")]
    pub require_all_sources: bool,
    /// Keep each source's compressed and decompressed payload here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_concurrent_fetch() -> bool {
    DEFAULT_CONCURRENT_FETCH
}

fn default_require_all_sources() -> bool {
    DEFAULT_REQUIRE_ALL_SOURCES
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            selection: None,
            output_path: default_output_path(),
            http: HttpConfig::default(),
            on_source_error: SourceErrorPolicy::default(),
            concurrent_fetch: default_concurrent_fetch(),
            require_all_sources: default_require_all_sources(),
            download_dir: None,
        }
    }
}

impl Config {
    /// Layered provider: defaults, then the TOML file, then `EPG_*` variables
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from the optional file and the process environment
    ///
    /// An explicitly named file must exist. Without one, `EPG_CONFIG_FILE` is
    /// consulted before falling back to environment-only configuration.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let env_file = std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from);
        let config_file = config_file.map(Path::to_path_buf).or(env_file);

        if let Some(path) = &config_file {
            if !path.exists() {
                return Err(ConfigError::invalid(
                    "config",
                    format!("file {} does not exist", path.display()),
                ));
            }
            info!("Loading configuration from: {}", path.display());
        }

        let mut config: Config = Self::figment(config_file.as_deref()).extract()?;
        config.apply_env_shorthands(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Fold the numbered `EPG_URL_<n>` sources and the channel shorthands in
    ///
    /// `lookup` resolves an environment variable name; tests pass a map.
    pub fn apply_env_shorthands<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let numbered = numbered_source_urls(&lookup);
        debug!("Found {} numbered source URL(s) in the environment", numbered.len());
        self.sources.extend(numbered);

        let ids = lookup(ENV_CHANNEL_IDS).filter(|v| !v.trim().is_empty());
        let names = lookup(ENV_CHANNEL_NAMES).filter(|v| !v.trim().is_empty());

        match (ids, names) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid(
                    "selection",
                    format!("{ENV_CHANNEL_IDS} and {ENV_CHANNEL_NAMES} are mutually exclusive"),
                ));
            }
            (Some(ids), None) => {
                self.selection = Some(SelectionConfig {
                    mode: SelectionMode::Id,
                    values: split_list(&ids),
                });
            }
            (None, Some(names)) => {
                self.selection = Some(SelectionConfig {
                    mode: SelectionMode::Name,
                    values: split_list(&names),
                });
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Check everything the pipeline relies on before any network call
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::MissingSources);
        }

        for (index, source) in self.sources.iter().enumerate() {
            UrlUtils::parse_source_url(source).map_err(|reason| {
                ConfigError::invalid(
                    format!("sources[{index}]"),
                    format!("{} ({reason})", UrlUtils::obfuscate_credentials(source)),
                )
            })?;
        }

        if self.selection.is_none() {
            return Err(ConfigError::MissingSelection);
        }

        if self.http.timeout.is_zero() {
            return Err(ConfigError::invalid("http.timeout", "must be greater than zero"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("output_path", "must not be empty"));
        }

        Ok(())
    }

    /// Build the selection predicate handed to the filter engine
    pub fn channel_selection(&self) -> Result<ChannelSelection, ConfigError> {
        let selection = self.selection.as_ref().ok_or(ConfigError::MissingSelection)?;
        let values = selection.values.iter().cloned();
        Ok(match selection.mode {
            SelectionMode::Id => ChannelSelection::by_ids(values),
            SelectionMode::Name => ChannelSelection::by_names(values),
        })
    }

    /// Render the configuration as TOML, used for `--write-default-config`
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::invalid("config", e.to_string()))
    }
}

/// Read `EPG_URL_1`, `EPG_URL_2`, ... until the first missing or empty index
pub fn numbered_source_urls<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    (1..)
        .map(|index| lookup(&format!("{ENV_SOURCE_URL_PREFIX}{index}")))
        .take_while(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .flatten()
        .map(|value| value.trim().to_string())
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
