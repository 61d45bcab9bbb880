//! Channel selection, filtering and multi-source merge

pub mod filter;
pub mod merge;
pub mod selection;

pub use filter::{FilterOutcome, FilterStats, filter_by_id, filter_by_name};
pub use merge::merge;
pub use selection::ChannelSelection;
