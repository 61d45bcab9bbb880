/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Output defaults
pub const DEFAULT_OUTPUT_PATH: &str = "filtered_epg.xml";

// Environment variable names
pub const ENV_PREFIX: &str = "EPG_";
pub const ENV_SOURCE_URL_PREFIX: &str = "EPG_URL_";
pub const ENV_CHANNEL_IDS: &str = "EPG_CHANNEL_IDS";
pub const ENV_CHANNEL_NAMES: &str = "EPG_CHANNEL_NAMES";
pub const ENV_CONFIG_FILE: &str = "EPG_CONFIG_FILE";

// HTTP defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Pipeline defaults
pub const DEFAULT_CONCURRENT_FETCH: bool = false;
pub const DEFAULT_REQUIRE_ALL_SOURCES: bool = false;
