pub mod dispatcher;
pub mod domain;
pub mod extraction;
pub mod intake;
pub mod payload;
pub mod pipeline;
pub mod poller;
pub mod ports;
pub mod records;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dispatcher::{AnalysisDispatcher, DispatchError};
pub use domain::{
    Analysis, AnalysisPayload, BulkDeleteOutcome, BulkDeleteStatus, CategoryEntry,
    DashboardStats, DeleteOutcome, Document, DocumentFilter, DocumentStatus, FindingEntry, NewDocument,
    RiskLevel, RiskScore, StatusTransition, UploadedFile,
};
pub use intake::{IntakeError, IntakePolicy};
pub use pipeline::{SubmittedUpload, UploadError, UploadPipeline, UploadRequest};
pub use poller::{PollConfig, PollOutcome, StatusPoller};
pub use ports::{
    AnalysisService, DatabaseService, IdentityService, ObjectStorage, PortError, PortResult,
    TextExtractionService,
};
pub use records::DocumentManager;
