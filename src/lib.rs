pub mod adapters;
pub mod config;
pub mod conversion;
pub mod domain;
pub mod identity;
pub mod storage;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use config::AppConfig;
pub use conversion::{convert_pdf, ConversionService, HttpConversionService, PdfOptions};
pub use domain::model::{BlobInfo, BlobKey, OpenMode, Principal, RequestUser, StoredFile, User};
pub use domain::ports::{
    BlobIndex, BlobService, IdentityProvider, ObjectBackend, Storage, UserRepository,
};
pub use identity::{AuthenticationMiddleware, BootstrapPolicy, HeaderIdentityProvider, RequestContext};
pub use storage::{build_storage, BlobStorage, ObjectStoreStorage};
pub use utils::error::{Result, ShimError};
