use tracing::debug;

use crate::xmltv::Document;

/// Concatenate the records of every document in the given order
///
/// No de-duplication happens: two channels sharing an id in different
/// sources both survive, and so do their programmes.
pub fn merge<I>(documents: I) -> Document
where
    I: IntoIterator<Item = Document>,
{
    let mut merged = Document::new();
    for (index, document) in documents.into_iter().enumerate() {
        debug!(
            "Merging source #{} ({} channels, {} programmes)",
            index + 1,
            document.channel_count(),
            document.programme_count()
        );
        merged.records.extend(document.records);
    }
    merged
}
