use super::Executor;
use common::catalog::Catalog;
use common::codec::field_to_bytes;
use common::ids::ValueId;
use common::storage_trait::{IndexTrait, KeyDesc, ScanFilter, StorageEngine, StorageTrait};
use common::{Algorithm, AttrDesc, AttrInfo, CrustyError, PredicateOp, QueryResult};

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Selects the tuples of one relation into `result`.
    ///
    /// The source relation is the one owning the projected attributes. Without a
    /// predicate every tuple is selected; otherwise only tuples with `attr op value`,
    /// where the literal is `attr.value`. An equality predicate on an indexed attribute
    /// is answered through the index, anything else by a sequential scan.
    ///
    /// # Arguments
    ///
    /// * `result` - Name of the output relation, created if it does not exist.
    /// * `proj_names` - Attributes to project, all of the source relation.
    /// * `attr` - Predicate attribute carrying the literal, if any.
    /// * `op` - Predicate operator. Ignored without a predicate.
    pub fn select(
        &self,
        result: &str,
        proj_names: &[AttrInfo],
        attr: Option<&AttrInfo>,
        op: PredicateOp,
    ) -> Result<QueryResult, CrustyError> {
        let (projection, reclen) = self.resolve_projection(proj_names)?;
        let rel_name = projection[0].rel_name.clone();
        if let Some(other) = projection.iter().find(|a| a.rel_name != rel_name) {
            return Err(CrustyError::AttributeOwnerMismatch(format!(
                "{}.{} does not belong to {}",
                other.rel_name, other.attr_name, rel_name
            )));
        }

        let predicate = match attr {
            None => None,
            Some(info) => Some(self.resolve_predicate(&rel_name, info)?),
        };

        let res = match predicate {
            Some((desc, literal)) if desc.indexed && op.is_equality() => self
                .index_select(result, &projection, reclen, &desc, &literal)
                .map(|n| QueryResult::new(Algorithm::IndexSelect, n)),
            predicate => {
                let filter =
                    predicate.map(|(desc, literal)| ScanFilter::new(KeyDesc::from(&desc), literal, op));
                self.scan_select(result, &rel_name, &projection, reclen, filter)
                    .map(|n| QueryResult::new(Algorithm::ScanSelect, n))
            }
        };
        if let Err(e) = &res {
            error!("select from {} into {} failed: {}", rel_name, result, e);
        }
        res
    }

    /// Resolves a predicate attribute of `rel_name` and encodes its literal.
    fn resolve_predicate(
        &self,
        rel_name: &str,
        info: &AttrInfo,
    ) -> Result<(AttrDesc, Vec<u8>), CrustyError> {
        if info.rel_name != rel_name {
            return Err(CrustyError::SchemaMismatch(format!(
                "predicate attribute {}.{} is not an attribute of {}",
                info.rel_name, info.attr_name, rel_name
            )));
        }
        let desc = self.resolve_attr(info)?;
        let value = info.value.as_ref().ok_or_else(|| {
            CrustyError::SchemaMismatch(format!(
                "predicate on {}.{} has no value",
                info.rel_name, info.attr_name
            ))
        })?;
        let literal = field_to_bytes(value, desc.dtype, desc.len)?;
        Ok((desc, literal))
    }

    /// Selects through the index on `attr` every tuple whose `attr` equals `literal`.
    ///
    /// Returns the number of tuples written to `result`.
    pub(crate) fn index_select(
        &self,
        result: &str,
        projection: &[AttrDesc],
        reclen: usize,
        attr: &AttrDesc,
        literal: &[u8],
    ) -> Result<usize, CrustyError> {
        info!("Algorithm: {}", Algorithm::IndexSelect);
        let out = self.storage_manager.open_or_create(result)?;
        self.open_relation(&attr.rel_name)?;
        let index = self
            .storage_manager
            .open_index(&attr.rel_name, &KeyDesc::from(attr), false)?;
        let mut count = 0;
        for item in self.storage_manager.index_scan(index, literal)? {
            let rid = item?;
            let tuple = self.storage_manager.get_value(rid)?;
            self.project_and_insert(out, &attr.rel_name, None, &tuple, None, projection, reclen)?;
            count += 1;
        }
        debug!("index select on {}.{} wrote {} tuples", attr.rel_name, attr.attr_name, count);
        Ok(count)
    }

    /// Selects by scanning `rel_name`, keeping the tuples that pass `filter`.
    ///
    /// The scan stops early if it hands back the same record id twice in a row.
    /// Returns the number of tuples written to `result`.
    pub(crate) fn scan_select(
        &self,
        result: &str,
        rel_name: &str,
        projection: &[AttrDesc],
        reclen: usize,
        filter: Option<ScanFilter>,
    ) -> Result<usize, CrustyError> {
        info!("Algorithm: {}", Algorithm::ScanSelect);
        let out = self.storage_manager.open_or_create(result)?;
        let source = self.open_relation(rel_name)?;
        let mut last: Option<ValueId> = None;
        let mut count = 0;
        for item in self.storage_manager.get_iterator(source, filter)? {
            let (rid, tuple) = item?;
            if last == Some(rid) {
                warn!("scan of {} returned {:?} twice in a row, stopping", rel_name, rid);
                break;
            }
            last = Some(rid);
            self.project_and_insert(out, rel_name, None, &tuple, None, projection, reclen)?;
            count += 1;
        }
        debug!("scan select on {} wrote {} tuples", rel_name, count);
        Ok(count)
    }
}
