// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches disk, network or process-wide state:
//
//   checkpoint.rs      — ModelCheckpoint envelope (MessagePack)
//                        and atomic save/load at the canonical
//                        path
//
//   provisioner.rs     — fetches a missing checkpoint from the
//                        model hub or a URL, verifies it, and
//                        renames it into place
//
//   model_manager.rs   — the process-wide LoadedModel:
//                        load once, share, swap after training
//
//   tokenizer_store.rs — local file → hub → corpus-built
//                        tokenizer, cached per process
//
//   metrics.rs         — per-epoch training metrics CSV
//
//   status.rs          — shared TrainingStatus, mirrored to disk
//
//   result_store.rs    — JSON-lines InstrumentResult tables
//
//   post_store.rs      — community posts and comments
//
// Reference: Rust Book §16 (Shared-State Concurrency)
//            Burn Book §5 (Checkpointing)

/// Checkpoint envelope and canonical path
pub mod checkpoint;

/// Remote checkpoint fetch with integrity checks
pub mod provisioner;

/// Lazy, shared, generation-counted model
pub mod model_manager;

/// Tokenizer resolution and caching
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// Training status shared with status queries
pub mod status;

/// Append-only assessment results
pub mod result_store;

/// Post and comment persistence
pub mod post_store;
