use crate::error::{ListError, Result};
use crate::matcher::ListSet;
use crate::parser::parse_list_file;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Anything that can produce the raw text of a list file.
pub trait ListSource {
    fn load(&self) -> impl Future<Output = Result<String>> + Send;

    /// Human readable origin, used in log lines
    fn describe(&self) -> String;
}

/// Reads the list file from disk
#[derive(Debug, Clone)]
pub struct FileListSource {
    path: PathBuf,
}

impl FileListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListSource for FileListSource {
    async fn load(&self) -> Result<String> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(ListError::NotFound(self.path.clone()));
        }
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The lists currently in force, shared between the loader and the engine.
///
/// Readers take a snapshot, so a refresh never blocks event processing for
/// longer than a pointer swap and only affects events handled after it.
#[derive(Debug, Clone, Default)]
pub struct SharedLists {
    current: Arc<RwLock<Arc<ListSet>>>,
}

impl SharedLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set(lists: ListSet) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(lists))),
        }
    }

    pub fn snapshot(&self) -> Arc<ListSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, lists: ListSet) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(lists);
    }

    /// Load and parse from `source`, then swap the result in.
    ///
    /// On failure the previous lists stay in force and the error is returned.
    pub async fn refresh<S: ListSource>(&self, source: &S) -> Result<usize> {
        let data = match source.load().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to load lists from {}: {}", source.describe(), e);
                return Err(e);
            }
        };

        let lists = tokio::task::spawn_blocking(move || parse_list_file(&data)).await?;
        let count = lists.len();
        info!(
            "Loaded {} whitelist and {} blacklist entries from {}",
            lists.whitelist.len(),
            lists.blacklist.len(),
            source.describe()
        );
        self.replace(lists);
        Ok(count)
    }
}
