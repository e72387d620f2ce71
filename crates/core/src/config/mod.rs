//! Per-plugin configuration: the document model, file formats and the store
//! that keeps the live document in sync with disk.

mod document;
mod format;
mod store;

pub use document::{ConfigDocument, PATH_SEPARATOR};
pub use format::ConfigFormat;
pub use store::{ConfigStore, DEFAULT_CONFIG_FILE};
