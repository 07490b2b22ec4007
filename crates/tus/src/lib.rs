//! TUS 1.0.0 resumable upload engine for the Salvo web framework.
//!
//! The wire protocol is fixed at `/files` (collection root) and
//! `/files/<id>` (per-upload resource); see [`engine::TusEngine`] for the
//! verb-by-verb contract and the component modules for the collaborators
//! it coordinates: [`metadata_store`] (offset/lifecycle bookkeeping),
//! [`staging`] (in-flight bytes), [`locker`] (per-URI serialization),
//! [`pipeline`] (checksum/promotion/webhook on completion), and the
//! background [`sweeper`].
//!
//! # Example
//!
//! ```ignore
//! use tus::{Tus, config::EngineConfig};
//! use salvo_core::prelude::*;
//!
//! let tus = Tus::new(EngineConfig::default());
//! let router = Router::new().push(tus.into_router());
//!
//! let acceptor = TcpListener::new("0.0.0.0:8080").bind().await;
//! Server::new(acceptor).serve(router).await;
//! ```

use std::sync::Arc;

use salvo_core::{Depot, Router, handler};

pub mod config;
pub mod engine;
pub mod error;
mod handlers;
mod locker;
mod metadata;
pub mod metadata_store;
pub mod objectstore;
pub mod pipeline;
pub mod staging;
mod sweeper;
pub mod utils;

pub use locker::{Locker, LockGuard, MemoryLocker};

use config::{CallbackConfig, EngineConfig};
use engine::TusEngine;
use metadata_store::{InMemoryMetadataStore, MetadataStore};
use objectstore::{FilesystemObjectStore, ObjectStore};
use pipeline::CompletionPipeline;
use staging::{DiskStagingStore, StagingStore};
use sweeper::Sweeper;

/// The TUS protocol version this engine implements and advertises.
pub const TUS_VERSION: &str = "1.0.0";
/// Extensions advertised on `DISCOVER` (§4.D).
pub const TUS_EXTENSIONS: &str = "creation,termination,checksum,expiration";

pub const H_TUS_RESUMABLE: &str = "tus-resumable";
pub const H_TUS_VERSION: &str = "tus-version";
pub const H_TUS_EXTENSION: &str = "tus-extension";
pub const H_TUS_MAX_SIZE: &str = "tus-max-size";

pub const H_UPLOAD_LENGTH: &str = "upload-length";
pub const H_UPLOAD_OFFSET: &str = "upload-offset";
pub const H_UPLOAD_METADATA: &str = "upload-metadata";

pub const H_CONTENT_TYPE: &str = "content-type";
pub const CT_OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

#[derive(Clone)]
struct TusStateHoop {
    engine: Arc<TusEngine>,
}

#[handler]
impl TusStateHoop {
    async fn handle(&self, depot: &mut Depot) {
        depot.inject(self.engine.clone());
    }
}

/// Builder that wires components A-F into a mountable [`Router`], on the
/// model of the framework's own builder-style service configuration.
pub struct Tus {
    config: EngineConfig,
    metadata: Arc<dyn MetadataStore>,
    staging: Arc<dyn StagingStore>,
    locker: Arc<dyn Locker>,
    objects: Arc<dyn ObjectStore>,
}

impl Tus {
    /// Starts from in-memory/filesystem reference implementations for every
    /// store; override any of them with the `with_*` methods before calling
    /// [`Tus::into_router`].
    pub fn new(config: EngineConfig) -> Self {
        let staging = Arc::new(DiskStagingStore::new(config.storage_path.clone()));
        let objects = Arc::new(FilesystemObjectStore::new(
            format!("{}/objects", config.storage_path),
            "/objects",
        ));
        Self {
            config,
            metadata: Arc::new(InMemoryMetadataStore::new()),
            staging,
            locker: Arc::new(MemoryLocker::new()),
            objects,
        }
    }

    pub fn with_metadata_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata = store;
        self
    }

    pub fn with_staging_store(mut self, store: Arc<dyn StagingStore>) -> Self {
        self.staging = store;
        self
    }

    pub fn with_locker(mut self, locker: Arc<dyn Locker>) -> Self {
        self.locker = locker;
        self
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.objects = store;
        self
    }

    pub fn with_callback(mut self, callback: CallbackConfig) -> Self {
        self.config.callback = callback;
        self
    }

    /// Builds the router mounting `DISCOVER`/`CREATE` on `/files`,
    /// `INSPECT`/`APPEND`/`TERMINATE` on `/files/<id>`, and the progress API
    /// on `/api/progress`. Spawns the expiration sweeper as a background
    /// task when `config.expiration_enabled` (§4.F).
    pub fn into_router(self) -> Router {
        let pipeline = CompletionPipeline::new(
            self.metadata.clone(),
            self.staging.clone(),
            self.objects,
            self.config.callback.clone(),
        );
        let engine = Arc::new(TusEngine::new(
            self.config.clone(),
            self.metadata.clone(),
            self.staging.clone(),
            self.locker,
            pipeline,
        ));

        if self.config.expiration_enabled {
            let sweeper = Sweeper::new(self.metadata, self.staging, &self.config);
            let _ = sweeper.spawn();
        }

        Router::new()
            .hoop(TusStateHoop {
                engine: engine.clone(),
            })
            .push(
                Router::with_path("files")
                    .push(handlers::discover_handler())
                    .push(handlers::create_handler())
                    .push(handlers::inspect_handler())
                    .push(handlers::append_handler())
                    .push(handlers::terminate_handler()),
            )
            .push(handlers::progress_handler())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_constants() {
        assert_eq!(TUS_VERSION, "1.0.0");
        assert_eq!(TUS_EXTENSIONS, "creation,termination,checksum,expiration");
        assert_eq!(H_TUS_RESUMABLE, "tus-resumable");
        assert_eq!(H_UPLOAD_LENGTH, "upload-length");
        assert_eq!(H_UPLOAD_OFFSET, "upload-offset");
        assert_eq!(H_UPLOAD_METADATA, "upload-metadata");
        assert_eq!(CT_OFFSET_OCTET_STREAM, "application/offset+octet-stream");
    }

    #[test]
    fn into_router_builds_without_panicking() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.storage_path = dir.path().to_string_lossy().to_string();
        config.expiration_enabled = false;
        let _router = Tus::new(config).into_router();
    }
}
