pub mod decompression;
pub mod http_client;
pub mod url;

pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{FeedFetcher, StandardHttpClient};
pub use self::url::UrlUtils;
