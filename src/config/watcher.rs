//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AccessConfig;

/// Watches the configuration file and emits each new valid configuration.
pub struct ConfigWatcher {
    path: PathBuf,
    current: AccessConfig,
    update_tx: mpsc::UnboundedSender<AccessConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, seeded with the configuration already in use.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path, current: AccessConfig) -> (Self, mpsc::UnboundedReceiver<AccessConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut last = self.current;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match load_config(&path) {
                        Ok(new_config) => {
                            // Editors often emit several events per save.
                            if last == new_config {
                                return;
                            }
                            tracing::info!(
                                path = ?path,
                                endpoints = new_config.endpoints.urls.len(),
                                "Configuration reloaded"
                            );
                            last = new_config.clone();
                            let _ = tx.send(new_config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
