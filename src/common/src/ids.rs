use std::sync::atomic::AtomicU16;

/// Storage handle of one relation inside a storage manager.
pub type ContainerId = u16;
pub type AtomicContainerId = AtomicU16;
pub type SlotId = u32;
/// Handle of an open secondary index inside a storage manager.
pub type IndexId = u16;

/// Record id: where a tuple lives in the storage manager that stored it.
///
/// Only meaningful to that storage manager. A slot-less id names no tuple.
#[derive(PartialEq, Clone, Copy, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ValueId {
    pub container_id: ContainerId,
    pub slot_id: Option<SlotId>,
}

impl ValueId {
    pub fn new_slot(container_id: ContainerId, slot_id: SlotId) -> Self {
        ValueId {
            container_id,
            slot_id: Some(slot_id),
        }
    }
}
