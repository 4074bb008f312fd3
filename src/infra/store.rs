//! Filesystem-backed document storage for the published site.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::application::repos::{DocumentStore, StoreError};

/// Documents live under `root`; names are `/`-separated relative paths.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if name.is_empty() || relative.is_absolute() || escapes {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, name: &str) -> Result<String, StoreError> {
        let path = self.resolve(name)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(StoreError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        let io_error = |source: std::io::Error| StoreError::Io {
            name: name.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        // Readers either see the old document or the new one, never a partial write.
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("document");
        let temp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(contents.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp, &path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(err));
        }
        Ok(())
    }
}
