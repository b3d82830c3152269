#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;

pub mod catalog;
pub mod codec;
pub mod config;
pub mod database;
pub mod ids;
pub mod predicate;
pub mod storage_trait;
pub mod table;
pub mod testutil;

pub use predicate::PredicateOp;

/// How big each page is
pub const PAGE_SIZE: usize = 4096;
// How many pages a buffer pool can hold
pub const PAGE_SLOTS: usize = 50;

/// Two doubles closer than this compare as equal.
///
/// This equality is not transitive: 0, 0.6e-7 and 1.2e-7 are each equal to
/// their neighbour but the ends are not. Joins over chains of such values may
/// pair them differently depending on the algorithm.
pub const DOUBLE_EPSILON: f64 = 1e-7;

/// Custom error type.
#[derive(Debug, Clone, PartialEq)]
pub enum CrustyError {
    /// IO Errors.
    IOError(String),
    /// A relation, attribute or value does not fit the catalog schema.
    SchemaMismatch(String),
    /// A projected attribute belongs to neither source relation.
    AttributeOwnerMismatch(String),
    /// Heap open/scan/fetch/insert failures.
    StorageFailure(String),
    /// Index open/scan/insert failures.
    IndexFailure(String),
    /// An attribute slice reaches past the end of its tuple.
    BufferOverrun {
        offset: usize,
        len: usize,
        size: usize,
    },
    /// Validation errors.
    ValidationError(String),
}

impl fmt::Display for CrustyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CrustyError::ValidationError(s) => format!("Validation Error: {}", s),
                CrustyError::SchemaMismatch(s) => format!("Schema Mismatch: {}", s),
                CrustyError::AttributeOwnerMismatch(s) => {
                    format!("Attribute Owner Mismatch: {}", s)
                }
                CrustyError::StorageFailure(s) => format!("Storage Failure: {}", s),
                CrustyError::IndexFailure(s) => format!("Index Failure: {}", s),
                CrustyError::BufferOverrun { offset, len, size } => format!(
                    "Buffer Overrun: [{}, {}) exceeds tuple of {} bytes",
                    offset,
                    offset + len,
                    size
                ),
                CrustyError::IOError(s) => s.to_string(),
            }
        )
    }
}

// Implement std::convert::From for AppError; from io::Error
impl From<io::Error> for CrustyError {
    fn from(error: io::Error) -> Self {
        CrustyError::IOError(error.to_string())
    }
}

impl From<serde_cbor::Error> for CrustyError {
    fn from(error: serde_cbor::Error) -> Self {
        CrustyError::StorageFailure(error.to_string())
    }
}

impl From<serde_json::Error> for CrustyError {
    fn from(error: serde_json::Error) -> Self {
        CrustyError::ValidationError(error.to_string())
    }
}

impl Error for CrustyError {}

/// The physical algorithm an operator ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    IndexSelect,
    ScanSelect,
    IndexedNestedLoop,
    SortMerge,
    SimpleNestedLoop,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::IndexSelect => "Index Select",
            Algorithm::ScanSelect => "File Scan",
            Algorithm::IndexedNestedLoop => "Indexed NL Join",
            Algorithm::SortMerge => "SM Join",
            Algorithm::SimpleNestedLoop => "Simple NL Join",
        };
        write!(f, "{}", name)
    }
}

/// Return type for a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    algorithm: Algorithm,
    tuples_written: usize,
}

impl QueryResult {
    /// Create a result.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Algorithm that produced the output relation.
    /// * `tuples_written` - Number of tuples appended to the output relation.
    pub fn new(algorithm: Algorithm, tuples_written: usize) -> Self {
        Self {
            algorithm,
            tuples_written,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn tuples_written(&self) -> usize {
        self.tuples_written
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} tuples", self.algorithm, self.tuples_written)
    }
}

/// Handle schemas.
#[derive(PartialEq, Clone, Debug)]
pub struct TableSchema {
    /// Attributes of the schema.
    attributes: Vec<Attribute>,
    /// Mapping from attribute name to order in the schema.
    name_map: HashMap<String, usize>,
}

impl Serialize for TableSchema {
    /// Custom serialize to avoid serializing name_map.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    /// Custom deserialize to avoid serializing name_map.
    fn deserialize<D>(deserializer: D) -> Result<TableSchema, D::Error>
    where
        D: Deserializer<'de>,
    {
        let attrs = Vec::deserialize(deserializer)?;
        Ok(TableSchema::new(attrs))
    }
}

impl TableSchema {
    /// Create a new schema.
    ///
    /// # Arguments
    ///
    /// * `attributes` - Attributes of the schema in the order that they are laid out in a tuple.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut name_map = HashMap::new();
        for (i, attr) in attributes.iter().enumerate() {
            name_map.insert(attr.name().to_string(), i);
        }
        Self {
            attributes,
            name_map,
        }
    }

    /// Get a mutable attribute by name.
    pub fn get_attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        let i = *self.name_map.get(name)?;
        self.attributes.get_mut(i)
    }

    /// Check if the attribute name is in the schema.
    pub fn contains(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// Get an iterator of the attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Returns the number of attributes.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the size of a tuple of this schema in bytes.
    pub fn byte_size(&self) -> usize {
        self.attributes.iter().map(|a| a.get_byte_len()).sum()
    }
}

/// Handle attributes. Pairs the name with the dtype and the declared length.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute dtype.
    pub dtype: DataType,
    /// Declared length in bytes.
    pub len: usize,
    /// Whether a secondary index exists on this attribute.
    #[serde(default)]
    pub indexed: bool,
}

impl Attribute {
    /// Create a new attribute with the natural length of the dtype.
    ///
    /// Strings default to 32 bytes; use `with_len` to declare another width.
    pub fn new(name: String, dtype: DataType) -> Self {
        let len = dtype.default_len();
        Self {
            name,
            dtype,
            len,
            indexed: false,
        }
    }

    /// Create a new attribute with an explicit byte length.
    pub fn with_len(name: String, dtype: DataType, len: usize) -> Self {
        Self {
            name,
            dtype,
            len,
            indexed: false,
        }
    }

    /// Returns the name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dtype of the attribute.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    /// Returns the length of the attribute in bytes.
    pub fn get_byte_len(&self) -> usize {
        self.len
    }
}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Debug, Hash)]
pub enum DataType {
    Int,
    Double,
    String,
}

impl DataType {
    /// Byte width used when a schema does not declare one.
    pub fn default_len(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Double => 8,
            DataType::String => 32,
        }
    }
}

/// For each of the dtypes, make sure that there is a corresponding field type.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, Clone)]
pub enum Field {
    IntField(i32),
    DoubleField(f64),
    StringField(String),
}

impl Field {
    /// The dtype this field is stored as.
    pub fn dtype(&self) -> DataType {
        match self {
            Field::IntField(_) => DataType::Int,
            Field::DoubleField(_) => DataType::Double,
            Field::StringField(_) => DataType::String,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::IntField(x) => write!(f, "{}", x),
            Field::DoubleField(x) => write!(f, "{}", x),
            Field::StringField(x) => write!(f, "{}", x),
        }
    }
}

/// Names an attribute of a relation, optionally with a value for it.
///
/// Projection lists and predicates only use the names; inserts carry a value
/// per attribute. A `None` value is a null and is rejected by inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrInfo {
    pub rel_name: String,
    pub attr_name: String,
    pub value: Option<Field>,
}

impl AttrInfo {
    pub fn new(rel_name: &str, attr_name: &str) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            attr_name: attr_name.to_string(),
            value: None,
        }
    }

    pub fn with_value(rel_name: &str, attr_name: &str, value: Field) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            attr_name: attr_name.to_string(),
            value: Some(value),
        }
    }
}

/// Resolved schema metadata for one attribute of one relation.
///
/// `offset` and `len` give the exact byte range of the attribute in every
/// tuple of `rel_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDesc {
    pub rel_name: String,
    pub attr_name: String,
    pub offset: usize,
    pub len: usize,
    pub dtype: DataType,
    pub indexed: bool,
}

/// Relation level catalog information.
#[derive(Debug, Clone, PartialEq)]
pub struct RelDesc {
    pub name: String,
    pub attr_count: usize,
}

/// Tuple type. Decoded field values of one record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Tuple {
    /// Tuple data.
    pub field_vals: Vec<Field>,
}

impl Tuple {
    /// Create a new tuple with the given data.
    pub fn new(field_vals: Vec<Field>) -> Self {
        Self { field_vals }
    }

    /// Get the field at index.
    pub fn get_field(&self, i: usize) -> Option<&Field> {
        self.field_vals.get(i)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for field in &self.field_vals {
            res.push_str(&field.to_string());
            res.push('\t');
        }
        write!(f, "{}", res)
    }
}
