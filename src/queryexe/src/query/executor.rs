use common::catalog::Catalog;
use common::codec::{extract_attr, field_from_bytes, field_to_bytes};
use common::config::ExecConfig;
use common::ids::{ContainerId, ValueId};
use common::storage_trait::{BufferPoolTrait, StorageEngine, StorageTrait};
use common::{AttrDesc, AttrInfo, CrustyError, PAGE_SIZE};
use std::cmp::Ordering;

/// Runs selections, joins and inserts against a catalog and a storage manager.
///
/// Every operator resolves names through `catalog`, reads and writes relations through
/// `storage_manager`, and materializes its result as a relation in the storage manager.
/// Storage handles opened by an operator are released when the operator returns, on
/// success and on error alike.
pub struct Executor<'a, T: Catalog, S: StorageEngine> {
    pub(crate) catalog: &'a T,
    pub(crate) storage_manager: &'a S,
    pub(crate) config: ExecConfig,
}

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Initializes an executor with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Catalog of the database containing the metadata about the tables and such.
    /// * `storage_manager` - The SM for the DB to get access to relations, indexes and sorting.
    pub fn new(catalog: &'a T, storage_manager: &'a S) -> Self {
        Self::with_config(catalog, storage_manager, ExecConfig::default())
    }

    pub fn with_config(catalog: &'a T, storage_manager: &'a S, config: ExecConfig) -> Self {
        Self {
            catalog,
            storage_manager,
            config,
        }
    }

    /// Resolves a projection list and returns it with the length of an output tuple.
    ///
    /// # Arguments
    ///
    /// * `proj_names` - Attributes to project, in output order.
    pub(crate) fn resolve_projection(
        &self,
        proj_names: &[AttrInfo],
    ) -> Result<(Vec<AttrDesc>, usize), CrustyError> {
        if proj_names.is_empty() {
            return Err(CrustyError::SchemaMismatch(String::from(
                "Empty projection list",
            )));
        }
        let mut reclen = 0;
        let mut projection = Vec::with_capacity(proj_names.len());
        for info in proj_names {
            let desc = self.resolve_attr(info)?;
            reclen += desc.len;
            projection.push(desc);
        }
        Ok((projection, reclen))
    }

    /// Opens the storage of a catalog relation, creating it empty if nothing was stored yet.
    pub(crate) fn open_relation(&self, rel_name: &str) -> Result<ContainerId, CrustyError> {
        self.catalog.get_table_ptr(rel_name)?;
        self.storage_manager.open_or_create(rel_name)
    }

    pub(crate) fn resolve_attr(&self, info: &AttrInfo) -> Result<AttrDesc, CrustyError> {
        self.catalog.get_attr_desc(&info.rel_name, &info.attr_name)
    }

    /// Compares the left attribute of one record with the right attribute of another.
    ///
    /// The left attribute's dtype decides how the bytes are compared. This is the only
    /// ordering the join algorithms use.
    pub fn match_rec(
        &self,
        left_rec: &[u8],
        right_rec: &[u8],
        left_attr: &AttrDesc,
        right_attr: &AttrDesc,
    ) -> Result<Ordering, CrustyError> {
        let left = extract_attr(left_rec, left_attr)?;
        let right = extract_attr(right_rec, right_attr)?;
        common::codec::compare_values(left_attr.dtype, left, right)
    }

    /// Re-encodes a value of `from` so it can be looked up in an index on `to`.
    ///
    /// Only string attributes can differ in length. Returns `None` when the value
    /// cannot be stored in `to`, in which case no entry of that index can equal it.
    pub(crate) fn probe_key(
        &self,
        value: &[u8],
        from: &AttrDesc,
        to: &AttrDesc,
    ) -> Result<Option<Vec<u8>>, CrustyError> {
        if from.len == to.len {
            return Ok(Some(value.to_vec()));
        }
        let field = field_from_bytes(value, from.dtype)?;
        match field_to_bytes(&field, to.dtype, to.len) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(CrustyError::SchemaMismatch(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Builds one output tuple from one or two source records and appends it to `result`.
    ///
    /// Each projected attribute is copied out of the record of the relation that owns it.
    /// The tuple is only appended once it is complete.
    ///
    /// # Arguments
    ///
    /// * `result` - Container of the output relation.
    /// * `rel1` - Relation of `rec1`.
    /// * `rel2` - Relation of `rec2`, `None` for single relation operators.
    /// * `projection` - Projection list.
    /// * `reclen` - Length of an output tuple.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn project_and_insert(
        &self,
        result: ContainerId,
        rel1: &str,
        rel2: Option<&str>,
        rec1: &[u8],
        rec2: Option<&[u8]>,
        projection: &[AttrDesc],
        reclen: usize,
    ) -> Result<ValueId, CrustyError> {
        let mut out = Vec::with_capacity(reclen);
        for attr in projection {
            let source = if attr.rel_name == rel1 {
                rec1
            } else {
                match (rel2, rec2) {
                    (Some(rel2), Some(rec2)) if attr.rel_name == rel2 => rec2,
                    _ => {
                        return Err(CrustyError::AttributeOwnerMismatch(format!(
                            "{}.{} is not an attribute of {} or {}",
                            attr.rel_name,
                            attr.attr_name,
                            rel1,
                            rel2.unwrap_or("-")
                        )))
                    }
                }
            };
            out.extend_from_slice(extract_attr(source, attr)?);
        }
        if out.len() != reclen {
            return Err(CrustyError::ValidationError(format!(
                "projected {} bytes for a {} byte output tuple",
                out.len(),
                reclen
            )));
        }
        self.storage_manager.insert_value(result, out)
    }

    /// How many tuples of `rel_name` one sort run may hold.
    ///
    /// A run gets `sort_buffer_fraction` of the currently unpinned pages, and always at
    /// least one tuple.
    pub(crate) fn sort_run_capacity(&self, rel_name: &str) -> Result<usize, CrustyError> {
        let unpinned = self.storage_manager.num_unpinned_pages();
        let pages = (unpinned as f64 * self.config.sort_buffer_fraction) as usize;
        let tuple_len = self.catalog.get_tuple_len(rel_name)?.max(1);
        Ok((pages * PAGE_SIZE / tuple_len).max(1))
    }
}
