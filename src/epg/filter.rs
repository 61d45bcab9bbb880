//! Channel/programme filter
//!
//! Both filters run two passes over the document: channels first, then
//! programmes. A programme is kept iff its `channel` attribute equals the id
//! of a kept channel. Name based selection resolves names to ids in the
//! first pass and then applies exactly the id rule to programmes.
//!
//! Output holds the kept channels in input order followed by the kept
//! programmes in input order.

use std::collections::HashSet;

use tracing::debug;

use crate::xmltv::{Channel, Document, Record};

/// Counters describing one filter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub channels_seen: usize,
    pub channels_kept: usize,
    pub programmes_seen: usize,
    pub programmes_kept: usize,
    /// Programmes whose channel attribute matches no channel in the input
    pub orphan_programmes: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub document: Document,
    /// Ids the programme pass matched against
    pub resolved_ids: HashSet<String>,
    pub stats: FilterStats,
}

/// Keep channels whose `id` is in `ids` and the programmes referencing them
pub fn filter_by_id(document: &Document, ids: &HashSet<String>) -> FilterOutcome {
    filter_with(document, |channel| {
        channel
            .id()
            .filter(|id| ids.contains(&**id))
            .map(|_| ChannelMatch::Keep)
            .unwrap_or(ChannelMatch::Drop)
    })
}

/// Keep channels with a trimmed display-name in `names` and the programmes
/// referencing their ids
///
/// A channel is included at most once; the first matching display-name
/// decides. A matched channel without an `id` is kept but cannot pull in
/// any programme.
pub fn filter_by_name(document: &Document, names: &HashSet<String>) -> FilterOutcome {
    filter_with(document, |channel| {
        let matched = channel
            .display_names()
            .iter()
            .any(|name| names.contains(name.trim()));
        if matched {
            ChannelMatch::Keep
        } else {
            ChannelMatch::Drop
        }
    })
}

enum ChannelMatch {
    Keep,
    Drop,
}

fn filter_with<F>(document: &Document, matches: F) -> FilterOutcome
where
    F: Fn(&Channel) -> ChannelMatch,
{
    let mut output = Document::new();
    let mut resolved_ids = HashSet::new();
    let mut known_ids = HashSet::new();
    let mut stats = FilterStats::default();

    for channel in document.channels() {
        stats.channels_seen += 1;
        if let Some(id) = channel.id() {
            known_ids.insert(id.to_string());
        }

        if let ChannelMatch::Keep = matches(channel) {
            if let Some(id) = channel.id() {
                debug!("Found channel id: {}", id);
                resolved_ids.insert(id.into_owned());
            }
            output.push(Record::Channel(channel.clone()));
            stats.channels_kept += 1;
        }
    }

    for programme in document.programmes() {
        stats.programmes_seen += 1;
        let Some(channel) = programme.channel() else {
            stats.orphan_programmes += 1;
            continue;
        };

        if resolved_ids.contains(&*channel) {
            output.push(Record::Programme(programme.clone()));
            stats.programmes_kept += 1;
        } else if !known_ids.contains(&*channel) {
            stats.orphan_programmes += 1;
        }
    }

    if stats.orphan_programmes > 0 {
        debug!(
            "{} programme(s) reference channels missing from the input and were excluded",
            stats.orphan_programmes
        );
    }

    FilterOutcome {
        document: output,
        resolved_ids,
        stats,
    }
}
