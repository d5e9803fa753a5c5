//! Graphward Editor: staged create/update/delete/merge over the shared dataset.
//!
//! A [`GraphEditor`] hydrates a private working copy of the entities it
//! touches, applies edits locally, and on [`GraphEditor::save`] uploads the
//! dataset delta followed by one provenance snapshot per touched entity.

pub mod counter;
pub mod editor;
pub mod error;
pub mod index;
mod merge;
pub mod working;

pub use counter::{CounterKey, FileCounter, IdentifierCounter, MemoryCounter, RedisCounter};
pub use editor::{CommitSummary, EditorConfig, GraphEditor};
pub use error::{CounterError, EditorError};
pub use index::{EntityIndex, EntityIndexEntry};
pub use working::WorkingGraph;
