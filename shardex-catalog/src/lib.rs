//! shardex-catalog - Vector catalog and content store implementations.
//!
//! Vectors are stored as content-addressed payloads through a
//! [`ContentStore`](shardex_core::ContentStore). Two stores are provided:
//!
//! - [`MemoryContentStore`]: in-process, for tests and ephemeral catalogs
//! - [`FsContentStore`]: one file per payload under a directory tree

pub mod catalog;
pub mod codec;
pub mod error;
pub mod fs;
pub mod memory;

pub use catalog::{SimilarityHit, VectorCatalog};
pub use error::CatalogError;
pub use fs::FsContentStore;
pub use memory::MemoryContentStore;
