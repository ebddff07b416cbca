//! Snapshot publishing.
//!
//! # Responsibilities
//! - Run a build for each new set of options
//! - Keep the last good snapshot when a build fails
//! - Write each new snapshot to the output file
//!
//! # Design Decisions
//! - Readers load the current snapshot lock-free through `ArcSwapOption`
//! - Publishing the same output twice keeps the current version
//! - The file is written to a sibling temp file, then renamed into place

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::builder::{BuildError, Builder, CompiledConfig};
use crate::config::schema::{Config, Options};
use crate::observability::metrics;
use crate::render::PageRenderer;

/// A published build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    #[serde(flatten)]
    pub config: CompiledConfig,
}

/// Error publishing a snapshot. The previous snapshot stays current.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write snapshot to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Holds the last good snapshot and publishes new ones.
pub struct ConfigPublisher {
    renderer: Arc<dyn PageRenderer>,
    current: ArcSwapOption<Snapshot>,
    output: Option<PathBuf>,
    pretty: bool,
}

impl ConfigPublisher {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            renderer,
            current: ArcSwapOption::empty(),
            output: None,
            pretty: false,
        }
    }

    /// Also write every new snapshot to `path`.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Indent the written JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// The currently published snapshot, if any build has succeeded.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Encode a snapshot the way it is written to disk.
    pub fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(snapshot)?
        } else {
            serde_json::to_vec(snapshot)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Build from `options` and publish the result.
    ///
    /// On any failure the previously published snapshot is left in place
    /// and the error is returned for the caller to report.
    pub fn publish(&self, options: &Options) -> Result<Arc<Snapshot>, PublishError> {
        let previous = self.current();
        let previous_version = previous.as_ref().map_or(0, |s| s.version);

        let result = self.try_publish(options, previous);
        match &result {
            Ok(snapshot) => metrics::record_publish(true, snapshot.version),
            Err(_) => metrics::record_publish(false, previous_version),
        }
        result
    }

    fn try_publish(&self, options: &Options, previous: Option<Arc<Snapshot>>) -> Result<Arc<Snapshot>, PublishError> {
        let config = Builder::new(options, self.renderer.as_ref()).build()?;

        if let Some(previous) = previous.as_ref().filter(|p| p.config == config) {
            tracing::debug!(version = previous.version, "Route configuration unchanged");
            return Ok(Arc::clone(previous));
        }

        let snapshot = Arc::new(Snapshot {
            version: previous.map_or(1, |p| p.version + 1),
            config,
        });

        if let Some(path) = &self.output {
            let bytes = self.encode(&snapshot)?;
            write_atomic(path, &bytes).map_err(|source| PublishError::Write {
                path: path.clone(),
                source,
            })?;
        }

        self.current.store(Some(Arc::clone(&snapshot)));
        tracing::info!(
            version = snapshot.version,
            routes = snapshot.config.route_configuration.route_count(),
            output = ?self.output,
            "Published route configuration"
        );
        Ok(snapshot)
    }

    /// Publish every config update until the channel closes or shutdown fires.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::UnboundedReceiver<Config>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Publisher waiting for configuration updates");
        loop {
            tokio::select! {
                update = updates.recv() => {
                    match update {
                        Some(config) => match self.publish(&config.options) {
                            Ok(snapshot) => {
                                tracing::debug!(version = snapshot.version, "Config update applied");
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    version = ?self.current().map(|s| s.version),
                                    "Failed to apply config update, keeping previous route configuration"
                                );
                            }
                        },
                        None => {
                            tracing::info!("Config update channel closed, publisher exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Publisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
