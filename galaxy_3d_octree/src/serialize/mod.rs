pub mod chunk;
pub mod node_format;

pub use chunk::{ChunkReader, ChunkWriter, Endian};
pub use node_format::{
    load_streamed_objects, load_tree, save_tree, LoadMode, LoadOptions, FILE_MAGIC, NODE_CHUNK_VERSION,
};
