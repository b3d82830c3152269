use super::Executor;
use common::catalog::Catalog;
use common::codec::extract_attr;
use common::storage_trait::{KeyDesc, ScanFilter, StorageEngine, StorageTrait};
use common::{Algorithm, AttrDesc, CrustyError, PredicateOp};

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Simple nested loop join on `attr1 op attr2`, for any operator.
    ///
    /// The relation of `attr2` is the outer one. For every outer tuple the relation of
    /// `attr1` is scanned with the outer value pushed down as the filter literal.
    /// Returns the number of tuples written to `result`.
    pub(crate) fn snl(
        &self,
        result: &str,
        projection: &[AttrDesc],
        reclen: usize,
        attr1: &AttrDesc,
        op: PredicateOp,
        attr2: &AttrDesc,
    ) -> Result<usize, CrustyError> {
        info!("Algorithm: {}", Algorithm::SimpleNestedLoop);
        let out = self.storage_manager.open_or_create(result)?;
        let outer = self.open_relation(&attr2.rel_name)?;
        let inner = self.open_relation(&attr1.rel_name)?;

        let mut count = 0;
        for item in self.storage_manager.get_iterator(outer, None)? {
            let (_, rec2) = item?;
            let literal = extract_attr(&rec2, attr2)?.to_vec();
            let filter = ScanFilter::new(KeyDesc::from(attr1), literal, op);
            for inner_item in self.storage_manager.get_iterator(inner, Some(filter))? {
                let (_, rec1) = inner_item?;
                self.project_and_insert(
                    out,
                    &attr1.rel_name,
                    Some(&attr2.rel_name),
                    &rec1,
                    Some(&rec2),
                    projection,
                    reclen,
                )?;
                count += 1;
            }
        }
        debug!(
            "simple nested loop {}.{} {} {}.{} wrote {} tuples",
            attr1.rel_name, attr1.attr_name, op, attr2.rel_name, attr2.attr_name, count
        );
        Ok(count)
    }
}
