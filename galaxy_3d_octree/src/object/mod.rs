pub mod scene_object;
pub mod object_slot;
pub mod object_list;
pub mod object_record;
pub mod persisted_object;

pub use scene_object::{
    SceneObject, ObjectType, ObjectCategory, RenderFlags, InternalFlags,
    MeshId, MaterialId, CATEGORY_COUNT,
};
pub use object_slot::{ObjectKey, ObjectSlot, ListLinks};
pub use object_list::{ObjectList, ObjectListIter};
pub use object_record::{ObjectRecord, RecordPayload};
pub use persisted_object::PersistedObject;
