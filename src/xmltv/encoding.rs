//! Character encoding detection for downloaded feeds
//!
//! A byte order mark wins, then the `encoding` pseudo-attribute of the XML
//! declaration, then UTF-8. Everything is handed to the parser as UTF-8 and
//! the writer always declares UTF-8.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use regex::bytes::Regex;
use tracing::debug;

use crate::errors::ParseError;

/// `<?xml ... encoding="label" ... ?>` at the very start of the document
static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml\s[^>]*?\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});

/// Decode `data` to UTF-8, borrowing when it already is
pub fn decode(data: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let (encoding, body) = match Encoding::for_bom(data) {
        Some((encoding, bom_length)) => (encoding, &data[bom_length..]),
        None => (declared_encoding(data)?, data),
    };

    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(std::str::from_utf8(body)?));
    }

    debug!("Transcoding feed from {} to UTF-8", encoding.name());
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| ParseError::InvalidBytes {
            encoding: encoding.name().to_string(),
        })
}

fn declared_encoding(data: &[u8]) -> Result<&'static Encoding, ParseError> {
    let Some(label) = DECLARED_ENCODING
        .captures(data)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_bytes())
    else {
        return Ok(UTF_8);
    };

    let encoding = Encoding::for_label(label).ok_or_else(|| ParseError::UnsupportedEncoding {
        label: String::from_utf8_lossy(label).into_owned(),
    })?;

    // A declaration readable as ASCII cannot be UTF-16 without a BOM
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Ok(UTF_8);
    }
    Ok(encoding)
}
