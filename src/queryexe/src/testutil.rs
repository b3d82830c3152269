use crate::query::Executor;
use crate::StorageManager;
use common::catalog::Catalog;
use common::codec::pack;
use common::database::Database;
use common::storage_trait::StorageTrait;
use common::testutil::*;
use common::{AttrInfo, Attribute, DataType, Field};

/// A catalog and an in-memory storage manager to run operators against.
pub struct TestDb {
    pub db: Database,
    pub sm: StorageManager,
}

impl TestDb {
    pub fn new() -> Self {
        init();
        TestDb {
            db: Database::new(String::from("testdb")),
            sm: StorageManager::new_test_sm(),
        }
    }

    pub fn executor(&self) -> Executor<'_, Database, StorageManager> {
        Executor::new(&self.db, &self.sm)
    }

    /// emp(id INT, name STRING(24), salary DOUBLE), 36 bytes per tuple.
    pub fn create_emp(&self) {
        self.db
            .create_table(
                "emp",
                vec![
                    Attribute::new(String::from("id"), DataType::Int),
                    Attribute::with_len(String::from("name"), DataType::String, 24),
                    Attribute::new(String::from("salary"), DataType::Double),
                ],
            )
            .unwrap();
    }

    /// dept(did INT, dname STRING(8), manager STRING(16)).
    pub fn create_dept(&self) {
        self.db
            .create_table(
                "dept",
                vec![
                    Attribute::new(String::from("did"), DataType::Int),
                    Attribute::with_len(String::from("dname"), DataType::String, 8),
                    Attribute::with_len(String::from("manager"), DataType::String, 16),
                ],
            )
            .unwrap();
    }

    pub fn emp_bytes(&self, id: i32, name: &str, salary: f64) -> Vec<u8> {
        let attrs = self.db.get_rel_attrs("emp").unwrap();
        pack(
            &attrs,
            &[
                Some(Field::IntField(id)),
                Some(Field::StringField(name.to_string())),
                Some(Field::DoubleField(salary)),
            ],
        )
        .unwrap()
    }

    /// A dept tuple named `d<did>`.
    pub fn dept_bytes(&self, did: i32, manager: &str) -> Vec<u8> {
        let attrs = self.db.get_rel_attrs("dept").unwrap();
        pack(
            &attrs,
            &[
                Some(Field::IntField(did)),
                Some(Field::StringField(format!("d{}", did))),
                Some(Field::StringField(manager.to_string())),
            ],
        )
        .unwrap()
    }

    pub fn insert_emp(&self, id: i32, name: &str, salary: f64) {
        self.executor()
            .insert(
                "emp",
                &[
                    AttrInfo::with_value("emp", "id", Field::IntField(id)),
                    AttrInfo::with_value("emp", "name", Field::StringField(name.to_string())),
                    AttrInfo::with_value("emp", "salary", Field::DoubleField(salary)),
                ],
            )
            .unwrap();
    }

    pub fn insert_dept(&self, did: i32, manager: &str) {
        self.executor()
            .insert(
                "dept",
                &[
                    AttrInfo::with_value("dept", "did", Field::IntField(did)),
                    AttrInfo::with_value("dept", "dname", Field::StringField(format!("d{}", did))),
                    AttrInfo::with_value("dept", "manager", Field::StringField(manager.to_string())),
                ],
            )
            .unwrap();
    }

    /// A relation of int attributes, with the attributes in `indexed` marked indexed.
    pub fn create_int_table(&self, name: &str, attrs: &[&str], indexed: &[&str]) {
        self.db.create_table(name, int_attributes(attrs)).unwrap();
        for attr in indexed {
            self.db.create_index(name, attr).unwrap();
        }
    }

    /// Insert rows into a relation made by `create_int_table`.
    pub fn insert_int_rows(&self, name: &str, attrs: &[&str], rows: &[Vec<i32>]) {
        let ex = self.executor();
        for row in rows {
            let values: Vec<AttrInfo> = attrs
                .iter()
                .zip(row.iter())
                .map(|(a, v)| AttrInfo::with_value(name, a, Field::IntField(*v)))
                .collect();
            ex.insert(name, &values).unwrap();
        }
    }

    /// Every tuple stored in a relation, in insertion order. Empty if it has no storage.
    pub fn read_rel(&self, name: &str) -> Vec<Vec<u8>> {
        match self.sm.open(name) {
            Ok(cid) => self
                .sm
                .get_iterator(cid, None)
                .unwrap()
                .map(|r| r.unwrap().1)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Projection list of `rel.attr` pairs.
pub fn proj(attrs: &[(&str, &str)]) -> Vec<AttrInfo> {
    attrs.iter().map(|(r, a)| AttrInfo::new(r, a)).collect()
}
