use super::Executor;
use common::catalog::Catalog;
use common::storage_trait::StorageEngine;
use common::{Algorithm, AttrInfo, CrustyError, PredicateOp, QueryResult};

/// Picks the join algorithm from the operator and which join attributes are indexed.
///
/// Returns the algorithm and whether the two sides must be swapped so that the
/// indexed attribute is the inner side of an indexed nested loop.
///
/// # Arguments
///
/// * `op` - Join operator.
/// * `left_indexed` - Whether the left join attribute is indexed.
/// * `right_indexed` - Whether the right join attribute is indexed.
pub fn choose_join(op: PredicateOp, left_indexed: bool, right_indexed: bool) -> (Algorithm, bool) {
    if !op.is_equality() {
        return (Algorithm::SimpleNestedLoop, false);
    }
    match (left_indexed, right_indexed) {
        (_, true) => (Algorithm::IndexedNestedLoop, false),
        (true, false) => (Algorithm::IndexedNestedLoop, true),
        (false, false) => (Algorithm::SortMerge, false),
    }
}

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Joins two relations on `attr1 op attr2` into `result`.
    ///
    /// # Arguments
    ///
    /// * `result` - Name of the output relation, created if it does not exist.
    /// * `proj_names` - Attributes to project, each of either joined relation.
    /// * `attr1` - Left join attribute.
    /// * `op` - Join operator.
    /// * `attr2` - Right join attribute.
    pub fn join(
        &self,
        result: &str,
        proj_names: &[AttrInfo],
        attr1: &AttrInfo,
        op: PredicateOp,
        attr2: &AttrInfo,
    ) -> Result<QueryResult, CrustyError> {
        let left = self.resolve_attr(attr1)?;
        let right = self.resolve_attr(attr2)?;
        if left.dtype != right.dtype {
            return Err(CrustyError::SchemaMismatch(format!(
                "cannot join {}.{} ({:?}) with {}.{} ({:?})",
                left.rel_name, left.attr_name, left.dtype, right.rel_name, right.attr_name, right.dtype
            )));
        }
        let (projection, reclen) = self.resolve_projection(proj_names)?;
        if let Some(attr) = projection
            .iter()
            .find(|a| a.rel_name != left.rel_name && a.rel_name != right.rel_name)
        {
            return Err(CrustyError::AttributeOwnerMismatch(format!(
                "{}.{} belongs to neither {} nor {}",
                attr.rel_name, attr.attr_name, left.rel_name, right.rel_name
            )));
        }

        let (algorithm, swapped) = choose_join(op, left.indexed, right.indexed);
        debug!(
            "join {}.{} {} {}.{} -> {} (swapped: {})",
            left.rel_name, left.attr_name, op, right.rel_name, right.attr_name, algorithm, swapped
        );
        let res = match algorithm {
            Algorithm::IndexedNestedLoop if swapped => {
                self.inl(result, &projection, reclen, &right, &left)
            }
            Algorithm::IndexedNestedLoop => self.inl(result, &projection, reclen, &left, &right),
            Algorithm::SortMerge => self.smj(result, &projection, reclen, &left, &right),
            _ => self.snl(result, &projection, reclen, &left, op, &right),
        };
        match res {
            Ok(n) => Ok(QueryResult::new(algorithm, n)),
            Err(e) => {
                error!("{} into {} failed: {}", algorithm, result, e);
                Err(e)
            }
        }
    }
}
