//! services/api/src/adapters/history_file.rs
//!
//! The history adapter, a concrete implementation of the `HistoryRepository` port.
//! The whole list lives in one JSON file: it is read once when the store is opened
//! and rewritten in full on every add or delete.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tax_blog_core::domain::HistoryItem;
use tax_blog_core::ports::{HistoryRepository, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed history store that implements the `HistoryRepository` port.
pub struct JsonFileHistoryStore {
    path: PathBuf,
    items: Mutex<Vec<HistoryItem>>,
}

impl JsonFileHistoryStore {
    /// Opens the store at `path`. A missing file is an empty history; an unreadable
    /// file or one that is not a JSON array is logged and also treated as empty.
    /// Entries that do not parse are skipped one by one.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Vec<Value>>(&contents) {
                Ok(entries) => parse_entries(entries),
                Err(e) => {
                    error!("Failed to parse history at {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!("Failed to read history at {}: {}", path.display(), e);
                Vec::new()
            }
        };
        info!("Loaded {} history entries from {}", items.len(), path.display());

        Self {
            path,
            items: Mutex::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, items: &[HistoryItem]) -> PortResult<()> {
        let json = serde_json::to_string(items)
            .map_err(|e| PortError::Unexpected(format!("Failed to serialize history: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write history: {}", e)))
    }
}

fn parse_entries(entries: Vec<Value>) -> Vec<HistoryItem> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<HistoryItem>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping unreadable history entry at index {}: {}", index, e);
                None
            }
        })
        .collect()
}

//=========================================================================================
// `HistoryRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryRepository for JsonFileHistoryStore {
    async fn list(&self) -> PortResult<Vec<HistoryItem>> {
        Ok(self.items.lock().await.clone())
    }

    async fn get(&self, id: &str) -> PortResult<HistoryItem> {
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("History item {} not found", id)))
    }

    async fn add(&self, item: HistoryItem) -> PortResult<()> {
        let mut items = self.items.lock().await;
        let mut updated = Vec::with_capacity(items.len() + 1);
        updated.push(item);
        updated.extend(items.iter().cloned());

        self.persist(&updated).await?;
        *items = updated;
        Ok(())
    }

    async fn delete(&self, id: &str) -> PortResult<()> {
        let mut items = self.items.lock().await;
        if !items.iter().any(|item| item.id == id) {
            return Err(PortError::NotFound(format!("History item {} not found", id)));
        }
        let updated: Vec<HistoryItem> = items.iter().filter(|item| item.id != id).cloned().collect();

        self.persist(&updated).await?;
        *items = updated;
        Ok(())
    }
}
