#[macro_use]
extern crate log;

mod index;
mod sorted_file;
pub mod storage_manager;

pub use index::IndexScan;
pub use sorted_file::SortedFile;
pub use storage_manager::{StorageManager, ValueIterator};
