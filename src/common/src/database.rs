use crate::catalog;
use crate::table::*;
use crate::{Attribute, CrustyError, TableSchema};
use catalog::Catalog;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// The actual database. Holds the catalog of tables.
#[derive(Clone, Serialize, Deserialize)]
pub struct Database {
    /// Name of the database.
    pub name: String,
    // Requires RwLock on both map and tables to enable adding/removing tables as well as table mutability.
    /// Locks for the tables.
    #[serde(with = "table_map")]
    pub tables: Arc<RwLock<HashMap<u64, Arc<RwLock<Table>>>>>,
}

impl Database {
    /// Initialize a new database with a given name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name for the new database.
    pub fn new(name: String) -> Self {
        Database {
            name,
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a relation. Attribute offsets follow the order of `attributes`.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the new relation.
    /// * `attributes` - Attributes of the relation.
    pub fn create_table(&self, name: &str, attributes: Vec<Attribute>) -> Result<(), CrustyError> {
        if attributes.is_empty() {
            return Err(CrustyError::ValidationError(format!(
                "relation {} has no attributes",
                name
            )));
        }
        let names: HashSet<&str> = attributes.iter().map(|a| a.name()).collect();
        if names.len() != attributes.len() {
            return Err(CrustyError::ValidationError(String::from(
                "Duplicate attribute names",
            )));
        }
        let schema = TableSchema::new(attributes);
        let table = Table::new(name.to_string(), schema);
        let mut tables = self.tables.write().unwrap();
        if tables.contains_key(&table.id) {
            return Err(CrustyError::ValidationError(format!(
                "relation {} already exists",
                name
            )));
        }
        debug!("Creating relation {} ({} bytes per tuple)", name, table.tuple_len());
        tables.insert(table.id, Arc::new(RwLock::new(table)));
        Ok(())
    }

    /// Mark an attribute as indexed.
    ///
    /// The storage manager builds the index itself the first time it is opened.
    pub fn create_index(&self, rel_name: &str, attr_name: &str) -> Result<(), CrustyError> {
        let table_ptr = self.get_table_ptr(rel_name)?;
        let mut table = table_ptr.write().unwrap();
        match table.schema.get_attribute_mut(attr_name) {
            Some(attr) => {
                debug!("Indexing {}.{}", rel_name, attr_name);
                attr.indexed = true;
                Ok(())
            }
            None => Err(CrustyError::SchemaMismatch(format!(
                "attribute {}.{} not found",
                rel_name, attr_name
            ))),
        }
    }

    /// Write the catalog to a json file.
    pub fn save(&self, path: &Path) -> Result<(), CrustyError> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    /// Read a catalog written by `save`.
    pub fn load(path: &Path) -> Result<Self, CrustyError> {
        let file = File::open(path)?;
        let db: Database = serde_json::from_reader(file)?;
        info!("Loaded catalog {} from {:?}", db.name, path);
        Ok(db)
    }
}

impl Catalog for Database {
    /// Gets the tables from the catalog of the database.
    fn get_tables(&self) -> Arc<RwLock<HashMap<u64, Arc<RwLock<Table>>>>> {
        self.tables.clone()
    }
}

/// Serializes the table map as a plain list of tables.
mod table_map {
    use super::Table;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    type TableMap = Arc<RwLock<HashMap<u64, Arc<RwLock<Table>>>>>;

    pub fn serialize<S>(tables: &TableMap, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tables = tables.read().unwrap();
        let list: Vec<Table> = tables.values().map(|t| t.read().unwrap().clone()).collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TableMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<Table>::deserialize(deserializer)?;
        let map = list
            .into_iter()
            .map(|t| (t.id, Arc::new(RwLock::new(t))))
            .collect();
        Ok(Arc::new(RwLock::new(map)))
    }
}
