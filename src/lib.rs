pub mod config;
pub mod epg;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod utils;
pub mod xmltv;
