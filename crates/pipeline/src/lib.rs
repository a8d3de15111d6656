//! Request orchestration on top of `annolink-core`.
//!
//! - [`transfer`]: one-shot annotation transfer between two instances, with
//!   post-write verification.
//! - [`preview`]: read-only views of frame pairing and of which files carry
//!   annotations.
//! - [`selection`]: per-job random sampling with an optional duplicate check
//!   against another collection.

pub mod error;
pub mod preview;
pub mod selection;
pub mod transfer;

pub use error::{SelectionError, TransferError};
pub use preview::{preview_annotations, preview_frame_matches};
pub use selection::{load_exclusion_set, select_per_job, SelectionReport, SelectionRequest};
pub use transfer::{Transfer, TransferOptions, TransferOutcome, TransferStage};
