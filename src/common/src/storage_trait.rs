//! The contracts the operators need from the layers underneath them: heap storage
//! of relations, secondary indexes, external sorting and buffer pool statistics.
use crate::codec::{compare_values, extract};
use crate::ids::{ContainerId, IndexId, ValueId};
use crate::{AttrDesc, CrustyError, DataType, PredicateOp};

/// Where a key lives inside the tuples of a relation and how to compare it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDesc {
    pub offset: usize,
    pub len: usize,
    pub dtype: DataType,
}

impl KeyDesc {
    pub fn new(offset: usize, len: usize, dtype: DataType) -> Self {
        KeyDesc { offset, len, dtype }
    }

    /// Borrow this key out of a tuple.
    pub fn extract<'a>(&self, tuple: &'a [u8]) -> Result<&'a [u8], CrustyError> {
        extract(tuple, self.offset, self.len)
    }
}

impl From<&AttrDesc> for KeyDesc {
    fn from(attr: &AttrDesc) -> Self {
        KeyDesc::new(attr.offset, attr.len, attr.dtype)
    }
}

/// A predicate pushed down into a sequential scan: `tuple[key] op literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    pub key: KeyDesc,
    pub literal: Vec<u8>,
    pub op: PredicateOp,
}

impl ScanFilter {
    pub fn new(key: KeyDesc, literal: Vec<u8>, op: PredicateOp) -> Self {
        ScanFilter { key, literal, op }
    }

    /// Whether a tuple passes the filter.
    pub fn matches(&self, tuple: &[u8]) -> Result<bool, CrustyError> {
        let value = self.key.extract(tuple)?;
        let ord = compare_values(self.key.dtype, value, &self.literal)?;
        Ok(self.op.matches(ord))
    }
}

/// A checkpoint in a sorted stream that can be rewound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPosition(usize);

impl StreamPosition {
    pub fn new(pos: usize) -> Self {
        StreamPosition(pos)
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

/// Append-only heap storage of named relations.
pub trait StorageTrait {
    /// Yields `(record id, tuple)` pairs. `None` ends the scan; `Some(Err(_))` is a failure.
    type ValIterator: Iterator<Item = Result<(ValueId, Vec<u8>), CrustyError>>;

    /// Create a new storage manager that will use storage_path as the location to persist data
    /// (if the storage manager persists records on disk)
    fn new(storage_path: String) -> Self;

    /// Create a new storage manager for testing. Nothing is persisted.
    fn new_test_sm() -> Self;

    /// Open the relation's container, creating an empty one if it does not exist yet.
    fn open_or_create(&self, name: &str) -> Result<ContainerId, CrustyError>;

    /// Open an existing relation's container.
    fn open(&self, name: &str) -> Result<ContainerId, CrustyError>;

    /// Append a tuple to a container and return its record id.
    fn insert_value(&self, container_id: ContainerId, value: Vec<u8>) -> Result<ValueId, CrustyError>;

    /// Fetch the tuple a record id points at.
    fn get_value(&self, id: ValueId) -> Result<Vec<u8>, CrustyError>;

    /// Scan a container in insertion order, optionally keeping only tuples that pass `filter`.
    fn get_iterator(
        &self,
        container_id: ContainerId,
        filter: Option<ScanFilter>,
    ) -> Result<Self::ValIterator, CrustyError>;

    /// Number of tuples stored in a container.
    fn num_values(&self, container_id: ContainerId) -> Result<usize, CrustyError>;

    /// Remove a relation and all of its tuples and indexes.
    fn remove_container(&self, name: &str) -> Result<(), CrustyError>;

    /// Persist state, if the storage manager has a storage path.
    fn shutdown(&self) -> Result<(), CrustyError>;
}

/// Secondary indexes over one attribute of a relation.
pub trait IndexTrait {
    /// Yields the record ids whose key equals the scan's literal.
    type IndexIterator: Iterator<Item = Result<ValueId, CrustyError>>;

    /// Open the index on `key` of a relation, building it from the stored tuples if needed.
    fn open_index(&self, rel_name: &str, key: &KeyDesc, unique: bool) -> Result<IndexId, CrustyError>;

    /// Start an equality scan of an open index.
    fn index_scan(&self, index: IndexId, literal: &[u8]) -> Result<Self::IndexIterator, CrustyError>;

    /// Add an entry mapping `value` to `rid`.
    fn insert_entry(&self, index: IndexId, value: &[u8], rid: ValueId) -> Result<(), CrustyError>;
}

/// A lazily consumed, ascending sequence of tuples that supports rewinding.
pub trait SortedStream {
    /// The next tuple, or `None` at the end of the stream.
    fn next_record(&mut self) -> Result<Option<Vec<u8>>, CrustyError>;

    /// Position of the tuple most recently returned by `next_record`.
    fn position(&self) -> StreamPosition;

    /// Rewind so that the next call to `next_record` returns the tuple at `pos` again.
    fn restore(&mut self, pos: StreamPosition) -> Result<(), CrustyError>;
}

/// External sorting of a relation on one key.
pub trait SortTrait {
    type Sorted: SortedStream;

    /// Sort a relation on `key`, holding at most `max_tuples` tuples in memory per run.
    fn open_sorted(
        &self,
        rel_name: &str,
        key: &KeyDesc,
        max_tuples: usize,
    ) -> Result<Self::Sorted, CrustyError>;
}

/// Read-only view of the buffer pool.
pub trait BufferPoolTrait {
    /// Pages currently not pinned by anyone.
    fn num_unpinned_pages(&self) -> usize;
}

/// Everything the operators need from the storage layer.
pub trait StorageEngine: StorageTrait + IndexTrait + SortTrait + BufferPoolTrait {}

impl<T> StorageEngine for T where T: StorageTrait + IndexTrait + SortTrait + BufferPoolTrait {}
