use super::Executor;
use common::catalog::Catalog;
use common::codec::extract_attr;
use common::storage_trait::{IndexTrait, KeyDesc, StorageEngine, StorageTrait};
use common::{Algorithm, AttrDesc, CrustyError};

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Indexed nested loop join on `outer = inner`.
    ///
    /// Scans the outer relation and probes the index on the inner attribute once per
    /// outer tuple, opening a fresh index scan each time. Returns the number of tuples
    /// written to `result`.
    pub(crate) fn inl(
        &self,
        result: &str,
        projection: &[AttrDesc],
        reclen: usize,
        outer: &AttrDesc,
        inner: &AttrDesc,
    ) -> Result<usize, CrustyError> {
        info!("Algorithm: {}", Algorithm::IndexedNestedLoop);
        let out = self.storage_manager.open_or_create(result)?;
        self.open_relation(&inner.rel_name)?;
        let index = self
            .storage_manager
            .open_index(&inner.rel_name, &KeyDesc::from(inner), false)?;
        let source = self.open_relation(&outer.rel_name)?;

        let mut count = 0;
        for item in self.storage_manager.get_iterator(source, None)? {
            let (_, outer_rec) = item?;
            let value = extract_attr(&outer_rec, outer)?;
            let key = match self.probe_key(value, outer, inner)? {
                Some(key) => key,
                None => continue,
            };
            for rid in self.storage_manager.index_scan(index, &key)? {
                let inner_rec = self.storage_manager.get_value(rid?)?;
                self.project_and_insert(
                    out,
                    &outer.rel_name,
                    Some(&inner.rel_name),
                    &outer_rec,
                    Some(&inner_rec),
                    projection,
                    reclen,
                )?;
                count += 1;
            }
        }
        debug!(
            "indexed nested loop {}.{} = {}.{} wrote {} tuples",
            outer.rel_name, outer.attr_name, inner.rel_name, inner.attr_name, count
        );
        Ok(count)
    }
}
