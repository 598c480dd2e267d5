/// Persisted node format.
///
/// A blob is a file header followed by the root node chunk; children
/// follow their parent in octant order.
///
/// ```text
/// file header : magic "G3OT", endian u8, 3 pad
/// node chunk  : version u32, node box 6xf32, child mask u8, 3 pad,
///               objects size u32, records[objects size], child chunks
/// record      : type tag u32, box 6xf32, layer u16, shadow lod bias i8,
///               pad u8, render flags u64, mesh index u16,
///               view dist ratio u8, lod ratio u8, payload
/// ```
///
/// Loaders report the number of nodes read; 0 tells the caller to stop
/// descending. Streamable records skipped by a load stay on disk and the
/// node remembers where its objects block lives so the streaming
/// controller can fetch it later.

use std::sync::Arc;
use rustc_hash::FxHashSet;
use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::math::AABB;
use crate::object::{
    InternalFlags, ObjectCategory, ObjectRecord, ObjectSlot, ObjectType, PersistedObject, RecordPayload,
    RenderFlags,
};
use crate::tree::{NodeKey, SpatialTree};
use super::chunk::{ChunkReader, ChunkWriter, Endian};

const SOURCE: &str = "galaxy3d::NodeFormat";

pub const FILE_MAGIC: [u8; 4] = *b"G3OT";
pub const FILE_HEADER_SIZE: usize = 8;
pub const NODE_CHUNK_VERSION: u32 = 3;

/// Which records a load materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    #[default]
    All,
    /// Leave streamable records on disk
    OnlyNonStreamable,
    /// Streaming fetch of a node's objects block
    OnlyStreamable,
}

impl LoadMode {
    fn accepts(self, streamable: bool) -> bool {
        match self {
            LoadMode::All => true,
            LoadMode::OnlyNonStreamable => !streamable,
            LoadMode::OnlyStreamable => streamable,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub mode: LoadMode,
    /// Objects on these layers load hidden
    pub hidden_layers: FxHashSet<u16>,
}

impl LoadOptions {
    /// Level load options: streamable records stay on disk when instance
    /// streaming is enabled.
    pub fn for_config(config: &TreeConfig) -> Self {
        Self {
            mode: if config.stream_instances { LoadMode::OnlyNonStreamable } else { LoadMode::All },
            hidden_layers: FxHashSet::default(),
        }
    }
}

// ===== SAVE =====

/// Serialize the whole tree.
///
/// Only resident objects are written: content of nodes still waiting to
/// be streamed in is not part of the output.
pub fn save_tree(tree: &SpatialTree, endian: Endian) -> Result<Vec<u8>> {
    let mut writer = ChunkWriter::new(endian);
    writer.write_bytes(&FILE_MAGIC);
    writer.write_u8(endian.to_byte());
    writer.pad(3);

    let nodes = save_node(tree, tree.root(), &mut writer)?;
    crate::engine_debug!(SOURCE, "Saved {} nodes, {} bytes", nodes, writer.position());
    Ok(writer.into_bytes())
}

fn save_node(tree: &SpatialTree, key: NodeKey, writer: &mut ChunkWriter) -> Result<usize> {
    let node = tree
        .node(key)
        .ok_or_else(|| crate::engine_err!(SOURCE, "save: unknown node {:?}", key))?;

    #[cfg(debug_assertions)]
    if node.has_file_data() && node.streaming_state() != crate::streaming::StreamingState::Ready {
        crate::engine_warn!(SOURCE, "Node {:?} saved without its streamed content", key);
    }

    let child_mask = node.children().fold(0u8, |mask, (octant, _)| mask | (1 << octant));

    writer.write_u32(NODE_CHUNK_VERSION);
    writer.write_aabb(node.node_box());
    writer.write_u8(child_mask);
    writer.pad(3);
    let size_at = writer.position();
    writer.write_u32(0);

    let block_start = writer.position();
    for category in ObjectCategory::ALL {
        for (_, slot) in node.list(category).iter(&tree.objects) {
            if let Some(record) = slot.object().to_record() {
                write_record(writer, &record);
            }
        }
    }
    let block_size = writer.position() - block_start;
    writer.patch_u32(size_at, block_size as u32)?;

    let mut count = 1;
    for (_, child) in node.children() {
        count += save_node(tree, child, writer)?;
    }
    Ok(count)
}

fn write_record(writer: &mut ChunkWriter, record: &ObjectRecord) {
    writer.write_u32(record.object_type.tag());
    writer.write_aabb(&record.bbox);
    writer.write_u16(record.layer_id);
    writer.write_i8(record.shadow_lod_bias);
    writer.pad(1);
    writer.write_u64(record.render_flags.bits());
    writer.write_u16(record.mesh_index);
    writer.write_u8(record.view_dist_ratio);
    writer.write_u8(record.lod_ratio);

    let fallback;
    let payload = if record.payload.matches(record.object_type) {
        &record.payload
    } else {
        fallback = RecordPayload::default_for(record.object_type);
        &fallback
    };

    match payload {
        RecordPayload::None => {}
        RecordPayload::Vegetation { position, scale, angles, material } => {
            writer.write_vec3(*position);
            writer.write_f32(*scale);
            writer.write_bytes(angles);
            writer.pad(1);
            writer.write_u32(*material);
        }
        RecordPayload::Brush { transform, material } => {
            for value in transform {
                writer.write_f32(*value);
            }
            writer.write_u32(*material);
        }
        RecordPayload::Decal { position, normal, radius, material, sort_priority } => {
            writer.write_vec3(*position);
            writer.write_vec3(*normal);
            writer.write_f32(*radius);
            writer.write_u32(*material);
            writer.write_u8(*sort_priority);
            writer.pad(3);
        }
        RecordPayload::Road { material, sort_priority, vertex_count } => {
            writer.write_u32(*material);
            writer.write_u8(*sort_priority);
            writer.pad(3);
            writer.write_u32(*vertex_count);
        }
        RecordPayload::WaterVolume { material, vertex_count, index_count } => {
            writer.write_u32(*material);
            writer.write_u32(*vertex_count);
            writer.write_u32(*index_count);
        }
        RecordPayload::Light { color, radius } => {
            writer.write_vec3(*color);
            writer.write_f32(*radius);
        }
    }
}

// ===== LOAD =====

fn read_record(reader: &mut ChunkReader) -> Result<ObjectRecord> {
    let tag = reader.read_u32()?;
    let object_type = ObjectType::from_tag(tag)
        .ok_or_else(|| Error::InvalidChunk(format!("unknown record type tag {}", tag)))?;

    let bbox = reader.read_aabb()?;
    let layer_id = reader.read_u16()?;
    let shadow_lod_bias = reader.read_i8()?;
    reader.skip(1)?;
    let render_flags = RenderFlags::from_bits_retain(reader.read_u64()?);
    let mesh_index = reader.read_u16()?;
    let view_dist_ratio = reader.read_u8()?;
    let lod_ratio = reader.read_u8()?;

    let payload = match RecordPayload::default_for(object_type) {
        RecordPayload::None => RecordPayload::None,
        RecordPayload::Vegetation { .. } => {
            let position = reader.read_vec3()?;
            let scale = reader.read_f32()?;
            let angles = [reader.read_u8()?, reader.read_u8()?, reader.read_u8()?];
            reader.skip(1)?;
            RecordPayload::Vegetation { position, scale, angles, material: reader.read_u32()? }
        }
        RecordPayload::Brush { .. } => {
            let mut transform = [0.0f32; 12];
            for value in transform.iter_mut() {
                *value = reader.read_f32()?;
            }
            RecordPayload::Brush { transform, material: reader.read_u32()? }
        }
        RecordPayload::Decal { .. } => {
            let position = reader.read_vec3()?;
            let normal = reader.read_vec3()?;
            let radius = reader.read_f32()?;
            let material = reader.read_u32()?;
            let sort_priority = reader.read_u8()?;
            reader.skip(3)?;
            RecordPayload::Decal { position, normal, radius, material, sort_priority }
        }
        RecordPayload::Road { .. } => {
            let material = reader.read_u32()?;
            let sort_priority = reader.read_u8()?;
            reader.skip(3)?;
            RecordPayload::Road { material, sort_priority, vertex_count: reader.read_u32()? }
        }
        RecordPayload::WaterVolume { .. } => RecordPayload::WaterVolume {
            material: reader.read_u32()?,
            vertex_count: reader.read_u32()?,
            index_count: reader.read_u32()?,
        },
        RecordPayload::Light { .. } => RecordPayload::Light {
            color: reader.read_vec3()?,
            radius: reader.read_f32()?,
        },
    };

    Ok(ObjectRecord {
        object_type,
        bbox,
        layer_id,
        shadow_lod_bias,
        render_flags,
        mesh_index,
        view_dist_ratio,
        lod_ratio,
        payload,
    })
}

/// Runtime flags never survive a load; casting implies the aggregate bit.
fn prepare_loaded_record(record: &mut ObjectRecord, hidden_layers: &FxHashSet<u16>) {
    record.render_flags.remove(RenderFlags::HIDDEN | RenderFlags::SELECTED);
    if record.render_flags.contains(RenderFlags::CAST_SHADOW_MAPS) {
        record.render_flags.insert(RenderFlags::HAS_CAST_SHADOW_MAPS);
    }
    if hidden_layers.contains(&record.layer_id) {
        record.render_flags.insert(RenderFlags::HIDDEN);
    }
}

#[derive(Debug, Default)]
struct BlockLoad {
    loaded: usize,
    skipped_streamable: usize,
}

/// Decode one objects block into `node_key`.
fn load_objects(
    tree: &mut SpatialTree,
    node_key: NodeKey,
    block: &[u8],
    endian: Endian,
    options: &LoadOptions,
) -> Result<BlockLoad> {
    let mut reader = ChunkReader::new(block, endian);
    let mut result = BlockLoad::default();
    let streamed = options.mode == LoadMode::OnlyStreamable;

    while !reader.is_empty() {
        let mut record = read_record(&mut reader)?;
        let streamable = record.is_streamable();
        if !options.mode.accepts(streamable) {
            if streamable {
                tree.reserve_streamed_content(node_key, &record);
                result.skipped_streamable += 1;
            }
            continue;
        }

        prepare_loaded_record(&mut record, &options.hidden_layers);
        let mut slot = ObjectSlot::new(Arc::new(PersistedObject::new(record)));
        if streamed {
            slot.internal |= InternalFlags::STREAMED;
        }
        let key = tree.register_object(slot);
        tree.link_object_at(node_key, key);
        result.loaded += 1;
    }
    Ok(result)
}

fn boxes_match(a: &AABB, b: &AABB) -> bool {
    let tolerance = 1.0e-3 * a.size().max_element().max(1.0);
    (a.min - b.min).abs().max_element() <= tolerance && (a.max - b.max).abs().max_element() <= tolerance
}

/// Load a blob produced by `save_tree` into `tree`.
///
/// The tree must have been created over the same world box. Returns the
/// number of nodes read; 0 means the root chunk was rejected.
pub fn load_tree(tree: &mut SpatialTree, data: &[u8], options: &LoadOptions) -> Result<usize> {
    if data.len() < FILE_HEADER_SIZE {
        return Err(Error::UnexpectedEndOfData { needed: FILE_HEADER_SIZE, available: data.len() });
    }
    if data[..4] != FILE_MAGIC {
        return Err(Error::InvalidChunk("bad file magic".to_string()));
    }
    let endian = Endian::from_byte(data[4])
        .ok_or_else(|| Error::InvalidChunk(format!("bad endian marker {}", data[4])))?;
    tree.persisted_endian = Some(endian);

    let mut reader = ChunkReader::new(data, endian);
    reader.skip(FILE_HEADER_SIZE)?;
    let root = tree.root();
    let nodes = load_node(tree, root, &mut reader, options);
    crate::engine_info!(SOURCE, "Loaded {} nodes ({} objects)", nodes, tree.object_count());
    Ok(nodes)
}

/// Node count of the subtree, 0 when the chunk or a descendant failed.
fn load_node(tree: &mut SpatialTree, node_key: NodeKey, reader: &mut ChunkReader, options: &LoadOptions) -> usize {
    match read_node(tree, node_key, reader, options) {
        Ok(count) => count,
        Err(err) => {
            crate::engine_error!(SOURCE, "Node chunk rejected: {}", err);
            0
        }
    }
}

fn read_node(tree: &mut SpatialTree, node_key: NodeKey, reader: &mut ChunkReader, options: &LoadOptions) -> Result<usize> {
    let version = reader.read_u32()?;
    if version != NODE_CHUNK_VERSION {
        return Err(Error::ChunkVersionMismatch { expected: NODE_CHUNK_VERSION, found: version });
    }

    let node_box = reader.read_aabb()?;
    let expected = *tree
        .node(node_key)
        .ok_or_else(|| crate::engine_err!(SOURCE, "load: unknown node {:?}", node_key))?
        .node_box();
    if !boxes_match(&expected, &node_box) {
        return Err(Error::InvalidChunk(format!(
            "node box {:?} does not match {:?}",
            node_box, expected
        )));
    }

    let child_mask = reader.read_u8()?;
    reader.skip(3)?;
    if child_mask != 0 && !tree.node(node_key).is_some_and(|node| node.can_subdivide(&tree.config)) {
        return Err(Error::InvalidChunk(format!("node {:?} is below the minimum size but lists children", node_key)));
    }
    let objects_size = reader.read_u32()? as usize;
    let objects_offset = reader.position();
    let block = reader.read_bytes(objects_size)?;

    let loaded = load_objects(tree, node_key, block, reader.endian(), options)?;
    if loaded.skipped_streamable > 0 {
        if let Some(node) = tree.node_mut(node_key) {
            node.file_offset = objects_offset as u64;
            node.file_size = objects_size as u32;
        }
    }

    let mut count = 1;
    for octant in 0..8 {
        if child_mask & (1 << octant) == 0 {
            continue;
        }
        let child = tree.get_or_create_child(node_key, octant);
        let child_count = load_node(tree, child, reader, options);
        if child_count == 0 {
            return Ok(0);
        }
        count += child_count;
    }
    Ok(count)
}

/// Load the streamable records of one node from its objects block.
///
/// Objects are flagged `STREAMED` so eviction can drop them again.
pub fn load_streamed_objects(
    tree: &mut SpatialTree,
    node_key: NodeKey,
    block: &[u8],
    hidden_layers: &FxHashSet<u16>,
) -> Result<usize> {
    let endian = tree.persisted_endian.unwrap_or(Endian::NATIVE);
    let options = LoadOptions { mode: LoadMode::OnlyStreamable, hidden_layers: hidden_layers.clone() };
    let loaded = load_objects(tree, node_key, block, endian, &options)?;
    Ok(loaded.loaded)
}

impl SpatialTree {
    /// Widen a node's aggregates for a record left on disk, so culling and
    /// prefetch see the node before its content arrives.
    pub(crate) fn reserve_streamed_content(&mut self, node_key: NodeKey, record: &ObjectRecord) {
        let radius = record.bbox.radius();
        let view = record.max_view_distance().max(radius * self.config.view_dist_ratio) * self.config.stream_dist_ratio;

        if let Some(node) = self.nodes.get_mut(node_key) {
            node.stream_box.add_box(&record.bbox);
            node.stream_view_distance = node.stream_view_distance.max(view);
        }
        let mut cursor = Some(node_key);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get_mut(current) else { break };
            node.objects_box.add_box(&record.bbox);
            node.max_view_distance = node.max_view_distance.max(view);
            cursor = node.parent;
        }
    }
}


#[cfg(test)]
#[path = "node_format_tests.rs"]
mod tests;
