use std::collections::HashSet;
use std::fmt;

use crate::xmltv::Document;

use super::filter::{FilterOutcome, filter_by_id, filter_by_name};

/// Which channels, and through them which programmes, survive filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    /// Exact, case-sensitive channel `id` values
    ById(HashSet<String>),
    /// Exact, case-sensitive display names, compared after trimming
    ByName(HashSet<String>),
}

impl ChannelSelection {
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ById(ids.into_iter().map(Into::into).collect())
    }

    /// Names are trimmed so configured values compare the same way
    /// display-name values do
    pub fn by_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByName(
            names
                .into_iter()
                .map(|name| name.into().trim().to_string())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::ById(ids) => ids.is_empty(),
            Self::ByName(names) => names.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::ById(ids) => ids.len(),
            Self::ByName(names) => names.len(),
        }
    }

    /// Run the matching filter over `document`
    pub fn apply(&self, document: &Document) -> FilterOutcome {
        match self {
            Self::ById(ids) => filter_by_id(document, ids),
            Self::ByName(names) => filter_by_name(document, names),
        }
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, values) = match self {
            Self::ById(ids) => ("channel ids", ids),
            Self::ByName(names) => ("channel names", names),
        };
        let mut sorted: Vec<&String> = values.iter().collect();
        sorted.sort();
        write!(f, "{label} {sorted:?}")
    }
}
