use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::api::{TreeApi, UploadFile};
use crate::error::ClientError;
use crate::protocol::{
    AdminAck, HistoryResponse, RestoreRequest, RollbackRequest, UploadResponse, STATUS_SUCCESS,
};

/// In-memory server double. Records `(path, body)` per call, with request
/// bodies serialized exactly as they would go on the wire.
#[derive(Default)]
pub(crate) struct RecordingApi {
    calls: RefCell<Vec<(String, String)>>,
    upload_replies: RefCell<VecDeque<Result<UploadResponse, ClientError>>>,
    history_replies: RefCell<VecDeque<Result<HistoryResponse, ClientError>>>,
    admin_replies: RefCell<VecDeque<Result<AdminAck, ClientError>>>,
    upload_gate: RefCell<Option<Rc<Notify>>>,
    history_gate: RefCell<Option<Rc<Notify>>>,
}

impl RecordingApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn upload_success() -> UploadResponse {
        UploadResponse {
            status: STATUS_SUCCESS.to_string(),
            message: None,
        }
    }

    pub(crate) fn upload_failure(message: &str) -> UploadResponse {
        UploadResponse {
            status: "failed".to_string(),
            message: Some(message.to_string()),
        }
    }

    pub(crate) fn history_of(names: &[&str]) -> HistoryResponse {
        HistoryResponse {
            history: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub(crate) fn push_upload_reply(&self, reply: Result<UploadResponse, ClientError>) {
        self.upload_replies.borrow_mut().push_back(reply);
    }

    pub(crate) fn push_history_reply(&self, reply: Result<HistoryResponse, ClientError>) {
        self.history_replies.borrow_mut().push_back(reply);
    }

    pub(crate) fn push_admin_reply(&self, reply: Result<AdminAck, ClientError>) {
        self.admin_replies.borrow_mut().push_back(reply);
    }

    /// Uploads block until the returned handle is notified.
    pub(crate) fn gate_uploads(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.upload_gate.borrow_mut() = Some(gate.clone());
        gate
    }

    pub(crate) fn gate_history(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.history_gate.borrow_mut() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }

    fn record(&self, path: &str, body: String) {
        self.calls.borrow_mut().push((path.to_string(), body));
    }

    fn admin_reply(&self) -> Result<AdminAck, ClientError> {
        self.admin_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(AdminAck::default()))
    }
}

impl TreeApi for RecordingApi {
    type Upload = UploadFile;

    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ClientError> {
        self.record("/upload", file.name.clone());
        let gate = self.upload_gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.upload_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::upload_success()))
    }

    async fn history(&self) -> Result<HistoryResponse, ClientError> {
        self.record("/admin/history", String::new());
        let gate = self.history_gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.history_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(HistoryResponse::default()))
    }

    async fn restore(&self, request: &RestoreRequest) -> Result<AdminAck, ClientError> {
        self.record("/admin/restore", serde_json::to_string(request)?);
        self.admin_reply()
    }

    async fn rollback(&self, request: &RollbackRequest) -> Result<AdminAck, ClientError> {
        self.record("/admin/rollback", serde_json::to_string(request)?);
        self.admin_reply()
    }
}
