//! rollcall-store - Persisted state for the attendance service.
//!
//! The attendance ledger (a two-column `Name,Time` file rewritten on every
//! mutation) and the reference-image gallery tree (one folder per
//! identity, populated by the upload endpoint).

pub mod gallery;
pub mod ledger;

pub use gallery::{Gallery, GalleryError, SavedReference};
pub use ledger::{AttendanceLedger, LedgerError, MarkOutcome};
