use crate::{AttrDesc, TableSchema};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Table implementation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Table id.
    pub id: u64,
    /// Table schema.
    pub schema: TableSchema,
}

impl Table {
    /// Creates a new table with the given name and schema.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table.
    /// * `schema` - Attributes of the table, in tuple layout order.
    pub fn new(name: String, schema: TableSchema) -> Self {
        let table_id = Table::get_table_id(&name);

        Table {
            name,
            id: table_id,
            schema,
        }
    }

    /// Creates table id of the table by hashing the table name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to get the id for.
    pub fn get_table_id(name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    /// Resolves every attribute to its descriptor. Offsets follow declaration order.
    pub fn attr_descs(&self) -> Vec<AttrDesc> {
        let mut offset = 0;
        let mut descs = Vec::with_capacity(self.schema.size());
        for attr in self.schema.attributes() {
            descs.push(AttrDesc {
                rel_name: self.name.clone(),
                attr_name: attr.name().to_string(),
                offset,
                len: attr.get_byte_len(),
                dtype: *attr.dtype(),
                indexed: attr.indexed,
            });
            offset += attr.get_byte_len();
        }
        descs
    }

    /// Length in bytes of every tuple of this table.
    pub fn tuple_len(&self) -> usize {
        self.schema.byte_size()
    }
}
