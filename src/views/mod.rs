//! Per-entity list and form state, written once for every [`Resource`](crate::resource::Resource).

pub mod confirm;
pub mod editor;
pub mod list;

pub use confirm::Confirm;
pub use editor::{Editor, EditorMode};
pub use list::{delete_row, DeleteOutcome, ListView, LoadTicket};
