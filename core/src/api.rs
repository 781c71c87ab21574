use std::path::Path;

use crate::error::ClientError;
use crate::protocol::{AdminAck, HistoryResponse, RestoreRequest, RollbackRequest, UploadResponse};

/// HTTP surface of the tree server.
///
/// Implemented over `gloo-net` in the browser and `reqwest` natively. Futures
/// are not required to be `Send`: the browser runs everything on one event
/// loop and the controllers hold `Rc` state.
#[allow(async_fn_in_trait)]
pub trait TreeApi {
    type Upload: Clone;

    async fn upload(&self, file: &Self::Upload) -> Result<UploadResponse, ClientError>;
    async fn history(&self) -> Result<HistoryResponse, ClientError>;
    async fn restore(&self, request: &RestoreRequest) -> Result<AdminAck, ClientError>;
    async fn rollback(&self, request: &RollbackRequest) -> Result<AdminAck, ClientError>;
}

/// An image held in memory, for transports that cannot hand over a
/// platform file handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name).to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }
}

pub fn guess_content_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}
