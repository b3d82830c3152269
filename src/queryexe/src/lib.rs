#[macro_use]
extern crate log;

pub mod query;
pub use memstore::storage_manager::StorageManager;
pub use query::Executor;

#[cfg(test)]
mod testutil;
