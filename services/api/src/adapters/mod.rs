pub mod db;
pub mod external;
pub mod identity;
pub mod storage;

pub use db::DbAdapter;
pub use external::{HttpAnalysisAdapter, HttpExtractionAdapter, ServiceCredentials};
pub use identity::HttpIdentityAdapter;
pub use storage::FsStorageAdapter;
