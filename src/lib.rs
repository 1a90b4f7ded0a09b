//! Reusable, named groups of segmentation labels with distinct colors.
//!
//! [`GroupStore`] persists groups to a JSON file in the user's settings
//! directory. [`assign_colors_batch`] and [`ColorAssigner`] produce colors for
//! label lists. Turning a group into segments is left to a [`SegmentSink`]
//! implemented by the host.
pub mod apply;
pub mod color;
pub mod store;
pub mod types;

pub use apply::{ApplyReport, DuplicatePolicy, SegmentList, SegmentSink, apply_group};
pub use color::{ColorAssigner, assign_batch as assign_colors_batch};
pub use store::{GroupStore, StoreConfig};
pub use types::{LabelColor, LabelError, LabelGroup, parse_label_list, validate_save_request};
