use common::codec::compare_values;
use common::ids::ValueId;
use common::storage_trait::KeyDesc;
use common::CrustyError;
use std::cmp::Ordering;

/// A secondary index: entries kept sorted by key, ties in insertion order.
pub(crate) struct IndexData {
    pub rel_name: String,
    pub key: KeyDesc,
    unique: bool,
    entries: Vec<(Vec<u8>, ValueId)>,
}

impl IndexData {
    pub(crate) fn new(rel_name: String, key: KeyDesc, unique: bool) -> Self {
        IndexData {
            rel_name,
            key,
            unique,
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Add `value -> rid`. An identical entry already present is left alone.
    pub(crate) fn insert(&mut self, value: &[u8], rid: ValueId) -> Result<(), CrustyError> {
        self.check_len(value)?;
        let (start, end) = self.equal_range(value)?;
        if self.entries[start..end].iter().any(|(_, r)| *r == rid) {
            return Ok(());
        }
        if self.unique && start != end {
            return Err(CrustyError::IndexFailure(format!(
                "duplicate key in unique index on {} {:?}",
                self.rel_name, self.key
            )));
        }
        self.entries.insert(end, (value.to_vec(), rid));
        Ok(())
    }

    /// Record ids of every entry equal to `literal`.
    pub(crate) fn scan(&self, literal: &[u8]) -> Result<IndexScan, CrustyError> {
        let (start, end) = self.equal_range(literal)?;
        let rids: Vec<ValueId> = self.entries[start..end].iter().map(|(_, rid)| *rid).collect();
        Ok(IndexScan {
            rids: rids.into_iter(),
        })
    }

    fn check_len(&self, value: &[u8]) -> Result<(), CrustyError> {
        if value.len() != self.key.len {
            return Err(CrustyError::IndexFailure(format!(
                "key of {} bytes for an index on {} byte values",
                value.len(),
                self.key.len
            )));
        }
        Ok(())
    }

    /// The half open range of entries comparing equal to `value`.
    fn equal_range(&self, value: &[u8]) -> Result<(usize, usize), CrustyError> {
        let dtype = self.key.dtype;
        // Stored keys were checked on insert and `value` is checked here, so the
        // comparisons below cannot fail and the fallback never applies.
        compare_values(dtype, value, value).map_err(|e| CrustyError::IndexFailure(e.to_string()))?;
        let cmp = |k: &[u8]| compare_values(dtype, k, value).unwrap_or(Ordering::Equal);
        let start = self
            .entries
            .partition_point(|(k, _)| cmp(k) == Ordering::Less);
        let end = start
            + self.entries[start..]
                .iter()
                .take_while(|(k, _)| cmp(k) == Ordering::Equal)
                .count();
        Ok((start, end))
    }
}

/// Equality scan over an index, snapshotted when the scan starts.
pub struct IndexScan {
    rids: std::vec::IntoIter<ValueId>,
}

impl Iterator for IndexScan {
    type Item = Result<ValueId, CrustyError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rids.next().map(Ok)
    }
}
