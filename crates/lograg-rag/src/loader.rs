//! Directory document loader

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use lograg_core::{Document, DocumentLoader, Error, Result};

/// Loads every `.txt` and `.log` file directly inside a directory
///
/// Subdirectories are not descended into. Files are returned sorted by name so
/// the chunk order of a build does not depend on the filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    extensions: Vec<String>,
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".to_string(), "log".to_string()],
        }
    }
}

impl DirectoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted file extensions (without the leading dot)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| accepted == ext))
    }

    async fn matching_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(directory).await.map_err(|e| {
            Error::DocumentLoader(format!("cannot read directory {}: {}", directory.display(), e))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && self.accepts(&path) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DocumentLoader for DirectoryLoader {
    async fn load(&self, source: &Path) -> Result<Vec<Document>> {
        let files = self.matching_files(source).await?;
        let mut documents = Vec::with_capacity(files.len());

        for path in files {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                Error::DocumentLoader(format!("cannot read {}: {}", path.display(), e))
            })?;

            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(file = %file_name, bytes = content.len(), "loaded document");

            documents.push(
                Document::new(content)
                    .with_metadata("source", path.to_string_lossy())
                    .with_metadata("file_name", file_name),
            );
        }

        info!(directory = %source.display(), documents = documents.len(), "loaded documents");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_only_text_and_log_files_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.log"), "second").unwrap();
        fs::write(dir.path().join("a.txt"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.log")).unwrap();

        let documents = DirectoryLoader::new().load(dir.path()).await.unwrap();

        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(documents[0].metadata.get("file_name").map(String::as_str), Some("a.txt"));
        assert!(documents[1].source().unwrap().ends_with("b.log"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryLoader::new()
            .load(&dir.path().join("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentLoader(_)));
    }

    #[tokio::test]
    async fn test_custom_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.out"), "x").unwrap();
        fs::write(dir.path().join("app.log"), "y").unwrap();

        let documents = DirectoryLoader::new()
            .with_extensions(["out"])
            .load(dir.path())
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content, "x");
    }
}
