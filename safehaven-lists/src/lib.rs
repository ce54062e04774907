pub mod error;
pub mod loader;
pub mod matcher;
pub mod parser;

pub use error::ListError;
pub use loader::{FileListSource, ListSource, SharedLists};
pub use matcher::{ListKind, ListSet, is_listed};
pub use parser::parse_list_file;
