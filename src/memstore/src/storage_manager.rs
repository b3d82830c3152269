use crate::index::{IndexData, IndexScan};
use crate::sorted_file::SortedFile;
use common::ids::{AtomicContainerId, ContainerId, IndexId, SlotId, ValueId};
use common::storage_trait::{
    BufferPoolTrait, IndexTrait, KeyDesc, ScanFilter, SortTrait, StorageTrait,
};
use common::{CrustyError, PAGE_SLOTS};

use std::collections::HashMap;
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, RwLock};

/// The tuples of one relation, in insertion order. A tuple's slot id is its position.
type ContainerMap = Arc<RwLock<Vec<Vec<u8>>>>;

/// The MemStore StorageManager. A map for storing containers, a map from relation names to
/// containers, the open indexes, and where to persist on shutdown/startup
pub struct StorageManager {
    containers: Arc<RwLock<HashMap<ContainerId, ContainerMap>>>,
    names: Arc<RwLock<HashMap<String, ContainerId>>>,
    next_container: AtomicContainerId,
    indexes: Arc<RwLock<HashMap<IndexId, Arc<RwLock<IndexData>>>>>,
    next_index: AtomicU16,
    persist_path: PathBuf,
}

impl Drop for StorageManager {
    fn drop(&mut self) {
        info!("Dropping Storage Manager");
    }
}

impl StorageTrait for StorageManager {
    type ValIterator = ValueIterator;

    /// Create a new SM from scratch or create containers from files.
    fn new(storage_path: String) -> Self {
        if storage_path != "" && Path::exists(Path::new(&storage_path)) {
            info!(
                "Initializing memstore::storage_manager from path: {:?}",
                &storage_path
            );
            match StorageManager::load(&storage_path) {
                Ok(sm) => return sm,
                Err(e) => error!("Failed to load containers from {}: {}", storage_path, e),
            }
        }
        info!(
            "Creating new memstore::storage_manager with path: {:?}",
            &storage_path
        );
        StorageManager::empty(PathBuf::from(storage_path))
    }

    /// Create a new SM that will not be persisted
    fn new_test_sm() -> Self {
        StorageManager::new(String::from(""))
    }

    fn open_or_create(&self, name: &str) -> Result<ContainerId, CrustyError> {
        let mut names = self.names.write().unwrap();
        if let Some(cid) = names.get(name) {
            return Ok(*cid);
        }
        let cid = self.next_container.fetch_add(1, Ordering::SeqCst);
        debug!("memstore::create_container {} as container_id: {:?}", name, cid);
        self.containers
            .write()
            .unwrap()
            .insert(cid, Arc::new(RwLock::new(Vec::new())));
        names.insert(name.to_string(), cid);
        Ok(cid)
    }

    fn open(&self, name: &str) -> Result<ContainerId, CrustyError> {
        self.names
            .read()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| CrustyError::StorageFailure(format!("relation {} has no storage", name)))
    }

    /// Append bytes to a container
    fn insert_value(&self, container_id: ContainerId, value: Vec<u8>) -> Result<ValueId, CrustyError> {
        let vals = self.get_container(container_id)?;
        let mut vals = vals.write().unwrap();
        let rid = ValueId::new_slot(container_id, vals.len() as SlotId);
        trace!("memstore:storage_manager insert key: {:?} value: {:?}", &rid, &value);
        vals.push(value);
        Ok(rid)
    }

    /// Get the bytes for a given value if found
    fn get_value(&self, id: ValueId) -> Result<Vec<u8>, CrustyError> {
        let vals = self.get_container(id.container_id)?;
        let vals = vals.read().unwrap();
        id.slot_id
            .and_then(|slot| vals.get(slot as usize))
            .cloned()
            .ok_or_else(|| CrustyError::StorageFailure(format!("Record ID not found {:?}", id)))
    }

    /// Get an iterator for a container
    fn get_iterator(
        &self,
        container_id: ContainerId,
        filter: Option<ScanFilter>,
    ) -> Result<ValueIterator, CrustyError> {
        let table_map = self.get_container(container_id)?;
        debug!("memstore::get_iterator container_id: {:?} filter: {:?}", &container_id, &filter);
        Ok(ValueIterator::new(table_map, container_id, filter))
    }

    fn num_values(&self, container_id: ContainerId) -> Result<usize, CrustyError> {
        Ok(self.get_container(container_id)?.read().unwrap().len())
    }

    /// Remove the container, its indexes, and all stored values in the container.
    /// If the container is persisted remove the underlying file.
    fn remove_container(&self, name: &str) -> Result<(), CrustyError> {
        let cid = match self.names.write().unwrap().remove(name) {
            Some(cid) => cid,
            None => {
                debug!("memstore::remove_container {} does not exist", name);
                return Ok(());
            }
        };
        debug!("memstore::remove_container {} exists. dropping", name);
        self.containers.write().unwrap().remove(&cid);
        self.indexes
            .write()
            .unwrap()
            .retain(|_, idx| idx.read().unwrap().rel_name != name);
        if self.is_persisted() {
            let file_path = self.container_path(name);
            if file_path.exists() {
                fs::remove_file(file_path)?;
            }
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), CrustyError> {
        info!("Shutting down and persisting containers");
        if !self.is_persisted() {
            info!("Test SM or no path, not persisting");
            return Ok(());
        }
        fs::create_dir_all(&self.persist_path)?;
        let names = self.names.read().unwrap();
        let containers = self.containers.read().unwrap();
        for (name, cid) in names.iter() {
            let vals = match containers.get(cid) {
                Some(vals) => vals.read().unwrap(),
                None => continue,
            };
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(self.container_path(name))?;
            serde_cbor::to_writer(file, &*vals)?;
        }
        Ok(())
    }
}

impl IndexTrait for StorageManager {
    type IndexIterator = IndexScan;

    fn open_index(&self, rel_name: &str, key: &KeyDesc, unique: bool) -> Result<IndexId, CrustyError> {
        let mut indexes = self.indexes.write().unwrap();
        for (id, idx) in indexes.iter() {
            let idx = idx.read().unwrap();
            if idx.rel_name == rel_name && idx.key == *key {
                return Ok(*id);
            }
        }
        let cid = self
            .open(rel_name)
            .map_err(|e| CrustyError::IndexFailure(e.to_string()))?;
        let mut data = IndexData::new(rel_name.to_string(), key.clone(), unique);
        for item in self.get_iterator(cid, None)? {
            let (rid, tuple) = item?;
            data.insert(key.extract(&tuple)?, rid)?;
        }
        let id = self.next_index.fetch_add(1, Ordering::SeqCst);
        debug!(
            "memstore::open_index built index {} on {} {:?} with {} entries",
            id,
            rel_name,
            key,
            data.len()
        );
        indexes.insert(id, Arc::new(RwLock::new(data)));
        Ok(id)
    }

    fn index_scan(&self, index: IndexId, literal: &[u8]) -> Result<IndexScan, CrustyError> {
        let idx = self.get_index(index)?;
        let idx = idx.read().unwrap();
        idx.scan(literal)
    }

    fn insert_entry(&self, index: IndexId, value: &[u8], rid: ValueId) -> Result<(), CrustyError> {
        let idx = self.get_index(index)?;
        let mut idx = idx.write().unwrap();
        idx.insert(value, rid)
    }
}

impl SortTrait for StorageManager {
    type Sorted = SortedFile;

    fn open_sorted(
        &self,
        rel_name: &str,
        key: &KeyDesc,
        max_tuples: usize,
    ) -> Result<SortedFile, CrustyError> {
        let cid = self.open(rel_name)?;
        let iter = self.get_iterator(cid, None)?;
        SortedFile::new(iter, key.clone(), max_tuples)
    }
}

impl BufferPoolTrait for StorageManager {
    /// Memstore never pins pages, so the whole pool is always available.
    fn num_unpinned_pages(&self) -> usize {
        PAGE_SLOTS
    }
}

impl StorageManager {
    fn empty(persist_path: PathBuf) -> Self {
        StorageManager {
            containers: Arc::new(RwLock::new(HashMap::new())),
            names: Arc::new(RwLock::new(HashMap::new())),
            next_container: AtomicContainerId::new(0),
            indexes: Arc::new(RwLock::new(HashMap::new())),
            next_index: AtomicU16::new(0),
            persist_path,
        }
    }

    /// Create a Memstore SM from a file path and populate from the files
    fn load(path: &str) -> Result<Self, CrustyError> {
        let sm = StorageManager::empty(PathBuf::from(path));
        // Find the files that end with .ms
        let entries: Vec<fs::DirEntry> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .filter(|x| x.path().extension().map_or(false, |ext| ext == "ms"))
            .collect();
        for entry in entries {
            let file = OpenOptions::new().read(true).open(entry.path())?;
            let vals: Vec<Vec<u8>> = serde_cbor::from_reader(file)?;
            // The file name is the relation name
            let name = match entry.path().file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };
            let cid = sm.open_or_create(&name)?;
            debug!("memstore::load {} with {} values", name, vals.len());
            *sm.get_container(cid)?.write().unwrap() = vals;
        }
        Ok(sm)
    }

    fn is_persisted(&self) -> bool {
        self.persist_path.to_string_lossy() != ""
    }

    fn container_path(&self, name: &str) -> PathBuf {
        let mut file_path = self.persist_path.clone();
        file_path.push(name);
        file_path.set_extension("ms");
        file_path
    }

    fn get_container(&self, container_id: ContainerId) -> Result<ContainerMap, CrustyError> {
        self.containers
            .read()
            .unwrap()
            .get(&container_id)
            .cloned()
            .ok_or_else(|| {
                CrustyError::StorageFailure(format!("File ID not found {:?}", container_id))
            })
    }

    fn get_index(&self, index: IndexId) -> Result<Arc<RwLock<IndexData>>, CrustyError> {
        self.indexes
            .read()
            .unwrap()
            .get(&index)
            .cloned()
            .ok_or_else(|| CrustyError::IndexFailure(format!("Index {} is not open", index)))
    }
}

/// Sequential scan over one container.
///
/// Only sees the tuples that were stored when the scan started.
pub struct ValueIterator {
    container_id: ContainerId,
    table_map: ContainerMap,
    filter: Option<ScanFilter>,
    current: usize,
    max: usize,
}

impl ValueIterator {
    //Create a new iterator for a container
    fn new(table_map: ContainerMap, container_id: ContainerId, filter: Option<ScanFilter>) -> Self {
        let max = table_map.read().unwrap().len();
        debug!("new iterator {:?} max {}", container_id, max);
        ValueIterator {
            container_id,
            table_map,
            filter,
            current: 0,
            max,
        }
    }
}

impl Iterator for ValueIterator {
    type Item = Result<(ValueId, Vec<u8>), CrustyError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.current < self.max {
            let slot = self.current;
            self.current += 1;
            let tuple = match self.table_map.read().unwrap().get(slot) {
                Some(tuple) => tuple.clone(),
                None => return None,
            };
            let keep = match &self.filter {
                None => true,
                Some(filter) => match filter.matches(&tuple) {
                    Ok(keep) => keep,
                    Err(e) => return Some(Err(e)),
                },
            };
            if keep {
                let rid = ValueId::new_slot(self.container_id, slot as SlotId);
                return Some(Ok((rid, tuple)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage_trait::SortedStream;
    use common::testutil::*;
    use common::{DataType, PredicateOp};

    fn int_key(offset: usize) -> KeyDesc {
        KeyDesc::new(offset, 4, DataType::Int)
    }

    fn load_rows(sm: &StorageManager, name: &str, rows: &[[i32; 2]]) -> ContainerId {
        let cid = sm.open_or_create(name).unwrap();
        for row in rows {
            sm.insert_value(cid, int_row_bytes(row)).unwrap();
        }
        cid
    }

    #[test]
    fn test_get_val() {
        let sm = StorageManager::new_test_sm();
        let cid = sm.open_or_create("r").unwrap();
        let bytes = get_random_byte_vec(40);
        let bytes2 = get_random_byte_vec(40);
        let rid = sm.insert_value(cid, bytes.clone()).unwrap();
        let rid2 = sm.insert_value(cid, bytes2.clone()).unwrap();
        assert_ne!(rid, rid2);
        assert_eq!(bytes, sm.get_value(rid).unwrap());
        assert_eq!(bytes2, sm.get_value(rid2).unwrap());
        assert_eq!(2, sm.num_values(cid).unwrap());
        assert_eq!(cid, sm.open_or_create("r").unwrap());
        assert_eq!(cid, sm.open("r").unwrap());
    }

    #[test]
    fn test_not_found() {
        let sm = StorageManager::new_test_sm();
        let cid = sm.open_or_create("r").unwrap();
        sm.insert_value(cid, get_random_byte_vec(10)).unwrap();
        let mut rid2 = ValueId::new_slot(cid, 1000);
        assert!(sm.get_value(rid2).is_err(), "value should not exist");
        rid2.container_id = 1400;
        assert!(sm.get_value(rid2).is_err(), "file should not exist");
        assert!(matches!(sm.open("s"), Err(CrustyError::StorageFailure(_))));
        assert!(sm.insert_value(1400, vec![1]).is_err());
    }

    #[test]
    fn test_simple_iter() {
        init();
        let sm = StorageManager::new_test_sm();
        let byte_vec = get_random_vec_of_byte_vec(20, 10, 30);
        let cid = sm.open_or_create("r").unwrap();
        for val in &byte_vec {
            sm.insert_value(cid, val.clone()).unwrap();
        }
        let iter = sm.get_iterator(cid, None).unwrap();
        let mut count = 0;
        for (i, item) in iter.enumerate() {
            let (rid, bytes) = item.unwrap();
            assert_eq!(byte_vec[i], bytes);
            assert_eq!(Some(i as SlotId), rid.slot_id);
            count += 1;
        }
        assert_eq!(20, count);
    }

    #[test]
    fn test_iter_snapshot() {
        let sm = StorageManager::new_test_sm();
        let cid = load_rows(&sm, "r", &[[1, 1], [2, 2]]);
        let mut iter = sm.get_iterator(cid, None).unwrap();
        assert!(iter.next().is_some());
        sm.insert_value(cid, int_row_bytes(&[3, 3])).unwrap();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_filtered_iter() {
        let sm = StorageManager::new_test_sm();
        let cid = load_rows(&sm, "r", &[[1, 10], [2, 20], [3, 30], [4, 20]]);
        let filter = ScanFilter::new(int_key(4), 20i32.to_le_bytes().to_vec(), PredicateOp::Equals);
        let hits: Vec<Vec<u8>> = sm
            .get_iterator(cid, Some(filter))
            .unwrap()
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(vec![int_row_bytes(&[2, 20]), int_row_bytes(&[4, 20])], hits);

        let filter = ScanFilter::new(int_key(0), 3i32.to_le_bytes().to_vec(), PredicateOp::GreaterThanOrEq);
        assert_eq!(2, sm.get_iterator(cid, Some(filter)).unwrap().count());

        // A key past the end of every tuple fails the scan instead of reading garbage.
        let filter = ScanFilter::new(int_key(8), vec![0; 4], PredicateOp::Equals);
        let first = sm.get_iterator(cid, Some(filter)).unwrap().next().unwrap();
        assert!(matches!(first, Err(CrustyError::BufferOverrun { .. })));
    }

    #[test]
    fn test_index_build_and_scan() {
        let sm = StorageManager::new_test_sm();
        let cid = load_rows(&sm, "r", &[[1, 10], [2, 20], [3, 10]]);
        let idx = sm.open_index("r", &int_key(4), false).unwrap();
        assert_eq!(idx, sm.open_index("r", &int_key(4), false).unwrap());

        let rids: Vec<ValueId> = sm
            .index_scan(idx, &10i32.to_le_bytes())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(vec![ValueId::new_slot(cid, 0), ValueId::new_slot(cid, 2)], rids);

        let rid = sm.insert_value(cid, int_row_bytes(&[4, 10])).unwrap();
        sm.insert_entry(idx, &10i32.to_le_bytes(), rid).unwrap();
        // Re-adding the same entry is a no-op.
        sm.insert_entry(idx, &10i32.to_le_bytes(), rid).unwrap();
        assert_eq!(3, sm.index_scan(idx, &10i32.to_le_bytes()).unwrap().count());
        assert_eq!(0, sm.index_scan(idx, &99i32.to_le_bytes()).unwrap().count());
    }

    #[test]
    fn test_index_errors() {
        let sm = StorageManager::new_test_sm();
        assert!(matches!(
            sm.open_index("missing", &int_key(0), false),
            Err(CrustyError::IndexFailure(_))
        ));
        let cid = load_rows(&sm, "r", &[[1, 10]]);
        let idx = sm.open_index("r", &int_key(0), true).unwrap();
        let rid = sm.insert_value(cid, int_row_bytes(&[1, 11])).unwrap();
        assert!(matches!(
            sm.insert_entry(idx, &1i32.to_le_bytes(), rid),
            Err(CrustyError::IndexFailure(_))
        ));
        assert!(matches!(
            sm.insert_entry(idx, &[1, 2], rid),
            Err(CrustyError::IndexFailure(_))
        ));
        assert!(sm.index_scan(77, &[0; 4]).is_err());
    }

    #[test]
    fn test_sorted_with_mark() {
        let sm = StorageManager::new_test_sm();
        load_rows(&sm, "r", &[[5, 0], [1, 1], [3, 2], [1, 3], [4, 4], [2, 5]]);
        let mut sorted = sm.open_sorted("r", &int_key(0), 2).unwrap();
        let mut keys = Vec::new();
        let mut mark = None;
        while let Some(tuple) = sorted.next_record().unwrap() {
            let key = i32::from_le_bytes([tuple[0], tuple[1], tuple[2], tuple[3]]);
            if key == 3 {
                mark = Some(sorted.position());
            }
            keys.push(key);
        }
        assert_eq!(vec![1, 1, 2, 3, 4, 5], keys);
        sorted.restore(mark.unwrap()).unwrap();
        let again = sorted.next_record().unwrap().unwrap();
        assert_eq!(int_row_bytes(&[3, 2]), again);
        assert!(sm.open_sorted("r", &int_key(0), 0).is_err());
        assert!(sm.open_sorted("missing", &int_key(0), 10).is_err());
    }

    #[test]
    fn test_remove_container() {
        let sm = StorageManager::new_test_sm();
        load_rows(&sm, "r", &[[1, 1]]);
        sm.open_index("r", &int_key(0), false).unwrap();
        sm.remove_container("r").unwrap();
        assert!(sm.open("r").is_err());
        assert!(sm.open_index("r", &int_key(0), false).is_err());
        sm.remove_container("r").unwrap();
    }

    #[test]
    fn test_sm_shutdown() {
        init();
        let persist = gen_random_dir();
        let sm = StorageManager::new(persist.to_string_lossy().to_string());
        let bytes1 = get_random_byte_vec(100);
        let bytes2 = get_random_byte_vec(300);
        let bytes3 = get_random_byte_vec(100);
        let c1 = sm.open_or_create("one").unwrap();
        let c2 = sm.open_or_create("two").unwrap();
        sm.insert_value(c1, bytes1.clone()).unwrap();
        sm.insert_value(c1, bytes2.clone()).unwrap();
        sm.insert_value(c2, bytes3.clone()).unwrap();
        sm.shutdown().unwrap();

        let sm2 = StorageManager::new(persist.to_string_lossy().to_string());
        let c1 = sm2.open("one").unwrap();
        let stored: Vec<Vec<u8>> = sm2
            .get_iterator(c1, None)
            .unwrap()
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(vec![bytes1, bytes2], stored);
        let c2 = sm2.open("two").unwrap();
        assert_eq!(bytes3, sm2.get_value(ValueId::new_slot(c2, 0)).unwrap());

        fs::remove_dir_all(persist).unwrap();
    }
}
