// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod gcs;
pub mod local;
pub mod memory;

#[cfg(feature = "s3")]
pub mod s3;

pub use gcs::GcsObjectBackend;
pub use local::LocalObjectBackend;
pub use memory::{MemoryBlobIndex, MemoryBlobService, MemoryObjectBackend};

#[cfg(feature = "s3")]
pub use s3::S3ObjectBackend;
