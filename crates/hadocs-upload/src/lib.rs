#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Upload reconciliation workflow for health-examination result documents.
//!
//! A batch of dropped files is probed against the records service one file at
//! a time, conflicts are handed to a human through a single-flight resolver,
//! and the approved files are submitted as one multipart upload.
//!
//! Layout:
//! - `backend.rs`: transport seam (`DocumentBackend`)
//! - `probe.rs`: fail-open existence checks
//! - `resolver.rs`: conflict request queue and decision handlers
//! - `engine.rs`: sequential reconciliation into an `UploadPlan`
//! - `uploader.rs`: batch submission and outcome merging
//! - `pipeline.rs`: reconcile + submit with cycle state reporting
//! - `surface.rs`: drop surface lifecycle and drag tracking

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod probe;
pub mod resolver;
pub mod surface;
pub mod uploader;

pub use backend::DocumentBackend;
pub use config::{DEFAULT_PROBE_TIMEOUT, MAX_UPLOAD_BYTES, UploadConfig};
pub use engine::ReconciliationEngine;
pub use error::{ProbeError, SurfaceError, UploadError, UploadResult};
pub use model::{
    ConflictDecision, CycleState, CycleTracker, DroppedBatch, DroppedFile, ExistenceVerdict,
    UploadOutcome, UploadPlan,
};
pub use pipeline::UploadPipeline;
pub use probe::ExistenceProber;
pub use resolver::{
    ConflictHandler, ConflictPolicy, ConflictQueue, ConflictResolver, PendingConflict,
};
pub use surface::{DropSurface, SurfaceRegistration};
pub use uploader::{BatchUploader, multipart_body_estimate};
