use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Config;

/// Live-reloadable configuration holder.
///
/// Readers take lock-free snapshots; [`ConfigHandle::reload`] re-reads the
/// file and swaps the pointer only when the new contents validate, so a bad
/// edit leaves the running configuration untouched.
pub struct ConfigHandle {
    inner: Arc<ArcSwap<Config>>,
    path: PathBuf,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        let path = config.config_path.clone();
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
            path,
        }
    }

    /// Current snapshot. Lock-free.
    pub fn load(&self) -> arc_swap::Guard<Arc<Config>> {
        self.inner.load()
    }

    pub fn load_full(&self) -> Arc<Config> {
        self.inner.load_full()
    }

    /// Re-read the config file and atomically swap it in.
    pub fn reload(&self) -> crate::Result<()> {
        let fresh = Config::from_file(&self.path)?;
        self.inner.store(Arc::new(fresh));
        tracing::info!(path = %self.path.display(), "config hot-reloaded");
        Ok(())
    }

    pub fn store(&self, config: Config) {
        self.inner.store(Arc::new(config));
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Clone for ConfigHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            path: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
