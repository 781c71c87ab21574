pub mod admin;
pub mod api;
pub mod asset;
pub mod channel;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod protocol;
pub mod secret;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{AdminSession, AdminView, HistoryEntry, ROLLBACK_STEPS};
pub use api::{TreeApi, UploadFile};
pub use asset::AssetReference;
pub use channel::{ChannelCommand, ConnectionState, PushChannel, PushEvent, RECONNECT_DELAY};
pub use client::{system_clock, ClientHooks, Clock, TreeClient};
pub use endpoints::Endpoints;
pub use error::ClientError;
pub use protocol::{
    interpret_admin_reply, interpret_upload_reply, AdminAck, HistoryResponse, PushMessage,
    RestoreRequest, RollbackRequest, UploadResponse, UPDATE_TREE,
};
pub use secret::{SecretSequenceDetector, ADMIN_SECRET};
pub use upload::{SubmitOutcome, UploadPipeline, UploadState, UploadStatus, UploadView};
