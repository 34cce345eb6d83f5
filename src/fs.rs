//! Getting files into the engine's virtual filesystem.
//!
//! Files reach the engine two ways: preloaded into the worklet's constructor
//! options before the engine starts, or injected later with a `createFile`
//! message. Both go through a [`Fetch`] implementation.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::error::{ChuckError, FetchError};

/// Extensions injected as text; everything else is sent as raw bytes.
pub const PLAINTEXT_EXTENSIONS: &[&str] = &["ck", "txt", "csv", "json", "xml", "html", "js"];

/// Where to fetch a file from, and what to call it inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filename {
    pub server_filename: String,
    pub virtual_filename: String,
}

impl Filename {
    pub fn new(server_filename: impl Into<String>, virtual_filename: impl Into<String>) -> Self {
        Self {
            server_filename: server_filename.into(),
            virtual_filename: virtual_filename.into(),
        }
    }
}

/// A fetched file, ready to be handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub filename: String,
    pub data: Vec<u8>,
}

pub fn is_plaintext_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, extension)| PLAINTEXT_EXTENSIONS.contains(&extension))
}

/// The last path segment of `url`.
pub fn file_name_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Retrieves file contents by location.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes).map_err(|_| FetchError::NotUtf8)
    }
}

/// Fetch every file in `files`, failing as a whole if any one fails.
pub async fn preload_files<F: Fetch>(fetcher: &F, files: &[Filename]) -> Result<Vec<File>, ChuckError> {
    try_join_all(files.iter().map(|file| async move {
        let data = fetcher
            .fetch_bytes(&file.server_filename)
            .await
            .map_err(|e| ChuckError::fetch(&file.server_filename, e))?;
        Ok::<_, ChuckError>(File {
            filename: file.virtual_filename.clone(),
            data,
        })
    }))
    .await
}

/// Files compiled into the host or assembled in memory, served by location.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedFiles {
    files: HashMap<String, Vec<u8>>,
}

impl EmbeddedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(location, data);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(location.into(), data.into());
    }
}

impl Fetch for EmbeddedFiles {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.files.get(url).cloned().ok_or(FetchError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_plaintext_allow_list() {
        for name in ["x.ck", "notes.txt", "a.b.json", "page.html", "lib.js"] {
            assert!(is_plaintext_file(name), "{name}");
        }
        for name in ["x.wav", "x.chug", "README", "x.CK"] {
            assert!(!is_plaintext_file(name), "{name}");
        }
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("https://host/dir/x.ck"), "x.ck");
        assert_eq!(file_name_from_url("x.wav"), "x.wav");
        assert_eq!(file_name_from_url("https://host/dir/"), "");
    }

    #[test]
    fn test_preload_keeps_virtual_names() {
        let fetcher = EmbeddedFiles::new()
            .with("server/a.ck", "<<< 1 >>>;")
            .with("server/b.wav", vec![0u8, 1, 2]);
        let files = block_on(preload_files(
            &fetcher,
            &[
                Filename::new("server/a.ck", "a.ck"),
                Filename::new("server/b.wav", "/samples/b.wav"),
            ],
        ))
        .unwrap();
        assert_eq!(files[0].filename, "a.ck");
        assert_eq!(files[1].filename, "/samples/b.wav");
        assert_eq!(files[1].data, vec![0, 1, 2]);
    }

    #[test]
    fn test_preload_fails_as_a_whole() {
        let fetcher = EmbeddedFiles::new().with("server/a.ck", "x");
        let err = block_on(preload_files(
            &fetcher,
            &[
                Filename::new("server/a.ck", "a.ck"),
                Filename::new("server/missing.wav", "missing.wav"),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, ChuckError::Fetch { ref url, .. } if url == "server/missing.wav"));
    }

    #[test]
    fn test_fetch_text_rejects_binary() {
        let fetcher = EmbeddedFiles::new().with("bad.txt", vec![0xff, 0xfe]);
        assert!(matches!(
            block_on(fetcher.fetch_text("bad.txt")),
            Err(FetchError::NotUtf8)
        ));
    }
}
