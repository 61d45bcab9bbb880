use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::SourceError;
use crate::utils::{DecompressionService, FeedFetcher, UrlUtils};
use crate::xmltv::{self, Document};

/// Fetch, decompress and parse a single source
pub struct SourceLoader<'a, F: FeedFetcher> {
    fetcher: &'a F,
    download_dir: Option<&'a Path>,
}

impl<'a, F: FeedFetcher> SourceLoader<'a, F> {
    pub fn new(fetcher: &'a F, download_dir: Option<&'a Path>) -> Self {
        Self {
            fetcher,
            download_dir,
        }
    }

    /// Load source number `index` (1-based, used for artifact names)
    pub async fn load(&self, index: usize, url: &str) -> Result<Document, SourceError> {
        let display_url = UrlUtils::obfuscate_credentials(url);
        info!("Downloading source #{} from: {}", index, display_url);

        let payload = self.fetcher.fetch(url).await?;
        info!("Downloaded {} bytes from source #{}", payload.len(), index);
        self.keep_artifact(index, "xml.gz", &payload).await?;

        let xml = DecompressionService::decompress(&payload)?;
        debug!("Decompressed source #{} to {} bytes", index, xml.len());
        self.keep_artifact(index, "xml", &xml).await?;

        let document = xmltv::parse(&xml)?;
        info!(
            "Parsed source #{}: {} channels, {} programmes",
            index,
            document.channel_count(),
            document.programme_count()
        );
        Ok(document)
    }

    async fn keep_artifact(&self, index: usize, extension: &str, data: &[u8]) -> Result<(), SourceError> {
        let Some(directory) = self.download_dir else {
            return Ok(());
        };

        let path = artifact_path(directory, index, extension);
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| SourceError::Artifact {
                path: path.clone(),
                source,
            })?;
        debug!("Stored {}", path.display());
        Ok(())
    }
}

/// `<dir>/source_<n>.<extension>`
pub fn artifact_path(directory: &Path, index: usize, extension: &str) -> PathBuf {
    directory.join(format!("source_{index}.{extension}"))
}
