use std::io::Read;

use tracing::debug;

use crate::errors::DecodeError;

/// Supported compression formats detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Bzip2,
    Xz,
    Uncompressed,
}

impl CompressionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionFormat::Gzip => "gzip",
            CompressionFormat::Bzip2 => "bzip2",
            CompressionFormat::Xz => "xz",
            CompressionFormat::Uncompressed => "uncompressed",
        }
    }
}

/// Magic byte detection and decompression of downloaded feeds
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        match infer::get(data).map(|kind| kind.mime_type()) {
            Some("application/gzip") => CompressionFormat::Gzip,
            Some("application/x-bzip2") => CompressionFormat::Bzip2,
            Some("application/x-xz") => CompressionFormat::Xz,
            _ => CompressionFormat::Uncompressed,
        }
    }

    /// Decompress a downloaded feed
    ///
    /// Feeds are expected to be compressed. Plain payloads and formats whose
    /// cargo feature is disabled are rejected rather than passed through.
    pub fn decompress(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let format = Self::detect_compression_format(data);
        debug!("Detected compression format: {}", format.as_str());

        match format {
            #[cfg(feature = "compression-gzip")]
            CompressionFormat::Gzip => {
                Self::read_all(flate2::read::MultiGzDecoder::new(data), format)
            }
            #[cfg(feature = "compression-bzip2")]
            CompressionFormat::Bzip2 => Self::read_all(bzip2::read::BzDecoder::new(data), format),
            #[cfg(feature = "compression-xz")]
            CompressionFormat::Xz => Self::read_all(xz2::read::XzDecoder::new(data), format),
            other => Err(DecodeError::UnsupportedFormat {
                detected: other.as_str().to_string(),
            }),
        }
    }

    #[allow(dead_code)]
    fn read_all<R: Read>(mut decoder: R, format: CompressionFormat) -> Result<Vec<u8>, DecodeError> {
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|source| DecodeError::Corrupt {
                format: format.as_str().to_string(),
                source,
            })?;
        Ok(decompressed)
    }
}
