use super::Executor;
use common::catalog::Catalog;
use common::codec::{extract_attr, pack};
use common::ids::ValueId;
use common::storage_trait::{IndexTrait, KeyDesc, StorageEngine, StorageTrait};
use common::{AttrInfo, CrustyError, Field};

impl<'a, T: Catalog, S: StorageEngine> Executor<'a, T, S> {
    /// Inserts one tuple into `rel_name` and adds it to every index of the relation.
    ///
    /// `values` must name every attribute of the relation exactly once, in any order.
    /// Nothing is written unless the whole tuple can be built. If adding an index entry
    /// fails, the tuple stays in the relation and the error is returned.
    ///
    /// # Arguments
    ///
    /// * `rel_name` - Relation to insert into.
    /// * `values` - Attribute names with their values.
    pub fn insert(&self, rel_name: &str, values: &[AttrInfo]) -> Result<ValueId, CrustyError> {
        let attrs = self.catalog.get_rel_attrs(rel_name)?;
        if attrs.len() != values.len() {
            return Err(CrustyError::SchemaMismatch(format!(
                "{} has {} attributes, got {} values",
                rel_name,
                attrs.len(),
                values.len()
            )));
        }

        let mut ordered: Vec<Option<Field>> = Vec::with_capacity(attrs.len());
        for attr in &attrs {
            match values.iter().find(|v| v.attr_name == attr.attr_name) {
                Some(v) => ordered.push(v.value.clone()),
                None => {
                    return Err(CrustyError::SchemaMismatch(format!(
                        "no value for {}.{}",
                        rel_name, attr.attr_name
                    )))
                }
            }
        }
        let tuple = pack(&attrs, &ordered)?;

        let cid = self.storage_manager.open_or_create(rel_name)?;
        let rid = self.storage_manager.insert_value(cid, tuple.clone())?;
        trace!("inserted {:?} into {}", rid, rel_name);

        for attr in attrs.iter().filter(|a| a.indexed) {
            let res = self
                .storage_manager
                .open_index(rel_name, &KeyDesc::from(attr), false)
                .and_then(|index| {
                    let value = extract_attr(&tuple, attr)?;
                    self.storage_manager.insert_entry(index, value, rid)
                });
            if let Err(e) = res {
                warn!(
                    "{:?} is stored in {} but missing from the index on {}: {}",
                    rid, rel_name, attr.attr_name, e
                );
                return Err(e);
            }
        }
        Ok(rid)
    }
}

#[cfg(test)]
mod test {
    use crate::testutil::*;
    use common::catalog::Catalog;
    use common::codec::unpack;
    use common::storage_trait::{IndexTrait, KeyDesc, StorageTrait};
    use common::testutil::*;
    use common::{AttrInfo, CrustyError, DataType, Field};

    #[test]
    fn test_insert_schema_order() {
        let tdb = TestDb::new();
        tdb.create_emp();
        let ex = tdb.executor();
        let rid = ex
            .insert(
                "emp",
                &[
                    AttrInfo::with_value("emp", "salary", Field::DoubleField(3.5)),
                    AttrInfo::with_value("emp", "id", Field::IntField(42)),
                    AttrInfo::with_value("emp", "name", Field::StringField(String::from("zoe"))),
                ],
            )
            .unwrap();
        let stored = tdb.sm.get_value(rid).unwrap();
        assert_eq!(tdb.emp_bytes(42, "zoe", 3.5), stored);
        let decoded = unpack(&tdb.db.get_rel_attrs("emp").unwrap(), &stored).unwrap();
        assert_eq!("42\tzoe\t3.5\t", decoded.to_string());
    }

    #[test]
    fn test_insert_rejects_bad_values() {
        let tdb = TestDb::new();
        tdb.create_int_table("r", &["a", "b"], &["a"]);
        tdb.insert_int_rows("r", &["a", "b"], &[vec![1, 2]]);
        let ex = tdb.executor();

        let too_few = [AttrInfo::with_value("r", "a", Field::IntField(1))];
        assert!(matches!(ex.insert("r", &too_few), Err(CrustyError::SchemaMismatch(_))));
        let unmatched = [
            AttrInfo::with_value("r", "a", Field::IntField(1)),
            AttrInfo::with_value("r", "z", Field::IntField(2)),
        ];
        assert!(matches!(ex.insert("r", &unmatched), Err(CrustyError::SchemaMismatch(_))));
        let null = [
            AttrInfo::with_value("r", "a", Field::IntField(1)),
            AttrInfo::new("r", "b"),
        ];
        assert!(matches!(ex.insert("r", &null), Err(CrustyError::SchemaMismatch(_))));
        let wrong_type = [
            AttrInfo::with_value("r", "a", Field::IntField(1)),
            AttrInfo::with_value("r", "b", Field::StringField(String::from("x"))),
        ];
        assert!(matches!(ex.insert("r", &wrong_type), Err(CrustyError::SchemaMismatch(_))));
        assert!(matches!(ex.insert("nope", &too_few), Err(CrustyError::SchemaMismatch(_))));

        // None of the failed inserts touched the relation or its index.
        assert_eq!(vec![int_row_bytes(&[1, 2])], tdb.read_rel("r"));
        let index = tdb
            .sm
            .open_index("r", &KeyDesc::new(0, 4, DataType::Int), false)
            .unwrap();
        assert_eq!(1, tdb.sm.index_scan(index, &1i32.to_le_bytes()).unwrap().count());
    }

    #[test]
    fn test_insert_maintains_indexes() {
        let tdb = TestDb::new();
        tdb.create_int_table("r", &["a", "b", "c"], &["a", "c"]);
        let rows: Vec<Vec<i32>> = (0..20).map(|i| vec![i % 4, i, i % 3]).collect();
        tdb.insert_int_rows("r", &["a", "b", "c"], &rows);
        let a_index = tdb
            .sm
            .open_index("r", &KeyDesc::new(0, 4, DataType::Int), false)
            .unwrap();
        let c_index = tdb
            .sm
            .open_index("r", &KeyDesc::new(8, 4, DataType::Int), false)
            .unwrap();
        for k in 0..4i32 {
            let rids: Vec<_> = tdb
                .sm
                .index_scan(a_index, &k.to_le_bytes())
                .unwrap()
                .map(|r| r.unwrap())
                .collect();
            assert_eq!(5, rids.len());
            for rid in rids {
                let tuple = tdb.sm.get_value(rid).unwrap();
                assert_eq!(&k.to_le_bytes()[..], &tuple[0..4]);
            }
        }
        assert_eq!(7, tdb.sm.index_scan(c_index, &0i32.to_le_bytes()).unwrap().count());
    }

    #[test]
    fn test_insert_index_failure_keeps_tuple() {
        let tdb = TestDb::new();
        tdb.create_int_table("r", &["a", "b"], &["a"]);
        // Open the index on r.a as a unique one before any insert does.
        tdb.sm.open_or_create("r").unwrap();
        tdb.sm
            .open_index("r", &KeyDesc::new(0, 4, DataType::Int), true)
            .unwrap();
        tdb.insert_int_rows("r", &["a", "b"], &[vec![1, 10]]);

        let ex = tdb.executor();
        let dup = [
            AttrInfo::with_value("r", "a", Field::IntField(1)),
            AttrInfo::with_value("r", "b", Field::IntField(11)),
        ];
        assert!(matches!(ex.insert("r", &dup), Err(CrustyError::IndexFailure(_))));
        assert_eq!(
            vec![int_row_bytes(&[1, 10]), int_row_bytes(&[1, 11])],
            tdb.read_rel("r")
        );
    }
}
