use crate::table::*;
use crate::{AttrDesc, CrustyError, RelDesc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Functions needed to implement a catalog. It keeps track of all available tables in the
/// database and their associated schemas, and resolves attribute names to the byte layout
/// the operators work with.
pub trait Catalog {
    /// Get tables from catalog.
    fn get_tables(&self) -> Arc<RwLock<HashMap<u64, Arc<RwLock<Table>>>>>;

    /// Get the table pointer for the catalog.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to get the pointer for.
    fn get_table_ptr(&self, name: &str) -> Result<Arc<RwLock<Table>>, CrustyError> {
        let tables = self.get_tables();
        let tables_ref: &HashMap<u64, Arc<RwLock<Table>>> = &tables.read().unwrap();
        match tables_ref.get(&Table::get_table_id(name)) {
            Some(table_ptr) => Ok(Arc::clone(table_ptr)),
            _ => Err(CrustyError::SchemaMismatch(format!(
                "relation {} not found",
                name
            ))),
        }
    }

    /// Checks if the table is in the catalog.
    fn is_valid_table(&self, name: &str) -> bool {
        self.get_table_ptr(name).is_ok()
    }

    /// Checks if the column is valid for the given table.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to look for the column name in.
    /// * `col_name` - Name of column to look for in the table.
    fn is_valid_column(&self, name: &str, col_name: &str) -> bool {
        match self.get_table_ptr(name) {
            Ok(table_ptr) => table_ptr.read().unwrap().schema.contains(col_name),
            _ => false,
        }
    }

    /// Resolves one attribute of a relation.
    ///
    /// # Arguments
    ///
    /// * `rel_name` - Relation owning the attribute.
    /// * `attr_name` - Attribute to resolve.
    fn get_attr_desc(&self, rel_name: &str, attr_name: &str) -> Result<AttrDesc, CrustyError> {
        self.get_rel_attrs(rel_name)?
            .into_iter()
            .find(|a| a.attr_name == attr_name)
            .ok_or_else(|| {
                CrustyError::SchemaMismatch(format!(
                    "attribute {}.{} not found",
                    rel_name, attr_name
                ))
            })
    }

    /// Resolves every attribute of a relation, in tuple layout order.
    fn get_rel_attrs(&self, rel_name: &str) -> Result<Vec<AttrDesc>, CrustyError> {
        let table_ptr = self.get_table_ptr(rel_name)?;
        let table = table_ptr.read().unwrap();
        Ok(table.attr_descs())
    }

    /// Relation level information.
    fn get_rel_info(&self, rel_name: &str) -> Result<RelDesc, CrustyError> {
        let table_ptr = self.get_table_ptr(rel_name)?;
        let table = table_ptr.read().unwrap();
        Ok(RelDesc {
            name: table.name.clone(),
            attr_count: table.schema.size(),
        })
    }

    /// Length in bytes of every tuple of the relation.
    fn get_tuple_len(&self, rel_name: &str) -> Result<usize, CrustyError> {
        let table_ptr = self.get_table_ptr(rel_name)?;
        let table = table_ptr.read().unwrap();
        Ok(table.tuple_len())
    }
}
