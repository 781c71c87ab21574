use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const UPDATE_TREE: &str = "update_tree";
pub const STATUS_SUCCESS: &str = "success";
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMessage {
    UpdateTree,
    Unknown,
}

impl PushMessage {
    /// Only the exact literal counts; anything else is forward-compatible noise.
    pub fn parse(payload: &str) -> Self {
        if payload == UPDATE_TREE {
            PushMessage::UpdateTree
        } else {
            PushMessage::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn failure_reason(&self) -> String {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => self.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub steps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAck {
    pub current: Option<String>,
}

/// Shared interpretation of `/admin/restore` and `/admin/rollback` replies.
///
/// Non-2xx is a failure regardless of body. A 2xx reply fails only when it
/// carries a `status` other than `success`; an empty or unreadable body is
/// accepted since the change itself is confirmed by the push broadcast.
pub fn interpret_admin_reply(status: u16, body: &str) -> Result<AdminAck, ClientError> {
    if !(200..300).contains(&status) {
        return Err(ClientError::Status(status));
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(AdminAck::default());
    }
    let Ok(reply) = serde_json::from_str::<AdminResponse>(trimmed) else {
        return Ok(AdminAck::default());
    };
    match reply.status.as_deref() {
        Some(STATUS_SUCCESS) | None => Ok(AdminAck {
            current: reply.current,
        }),
        Some(other) => Err(ClientError::Rejected(
            reply.message.unwrap_or_else(|| other.to_string()),
        )),
    }
}

/// `/upload` replies are always JSON; a non-2xx status without a readable
/// body is reported by status code.
pub fn interpret_upload_reply(status: u16, body: &str) -> Result<UploadResponse, ClientError> {
    match serde_json::from_str::<UploadResponse>(body.trim()) {
        Ok(reply) => Ok(reply),
        Err(_) if !(200..300).contains(&status) => Err(ClientError::Status(status)),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_update_literal_is_recognized() {
        assert_eq!(PushMessage::parse("update_tree"), PushMessage::UpdateTree);
        assert_eq!(PushMessage::parse("UPDATE_TREE"), PushMessage::Unknown);
        assert_eq!(PushMessage::parse(" update_tree"), PushMessage::Unknown);
        assert_eq!(PushMessage::parse("{\"type\":\"update_tree\"}"), PushMessage::Unknown);
        assert_eq!(PushMessage::parse(""), PushMessage::Unknown);
    }

    #[test]
    fn rollback_and_restore_bodies_match_wire_contract() {
        let rollback = serde_json::to_string(&RollbackRequest { steps: 1 }).expect("encode");
        assert_eq!(rollback, r#"{"steps":1}"#);
        let restore = serde_json::to_string(&RestoreRequest {
            filename: "a.png".to_string(),
        })
        .expect("encode");
        assert_eq!(restore, r#"{"filename":"a.png"}"#);
    }

    #[test]
    fn history_without_list_defaults_to_empty() {
        let parsed: HistoryResponse = serde_json::from_str("{}").expect("decode");
        assert!(parsed.history.is_empty());
    }

    #[test]
    fn upload_failure_reason_falls_back_to_status() {
        let reply: UploadResponse =
            serde_json::from_str(r#"{"status":"failed","message":"Generation failed"}"#)
                .expect("decode");
        assert!(!reply.is_success());
        assert_eq!(reply.failure_reason(), "Generation failed");

        let bare: UploadResponse = serde_json::from_str(r#"{"status":"error"}"#).expect("decode");
        assert_eq!(bare.failure_reason(), "error");
    }

    #[test]
    fn admin_reply_rejection_and_status_codes() {
        assert_eq!(
            interpret_admin_reply(200, r#"{"status":"success","current":"tree_1.png"}"#),
            Ok(AdminAck {
                current: Some("tree_1.png".to_string())
            })
        );
        assert_eq!(interpret_admin_reply(204, ""), Ok(AdminAck::default()));
        assert_eq!(interpret_admin_reply(200, "not json"), Ok(AdminAck::default()));
        assert_eq!(
            interpret_admin_reply(200, r#"{"status":"error","message":"History file x not found"}"#),
            Err(ClientError::Rejected("History file x not found".to_string()))
        );
        assert_eq!(
            interpret_admin_reply(500, r#"{"status":"success"}"#),
            Err(ClientError::Status(500))
        );
    }

    #[test]
    fn upload_reply_prefers_body_over_status() {
        let reply = interpret_upload_reply(500, r#"{"status":"error","message":"boom"}"#)
            .expect("body parsed");
        assert_eq!(reply.failure_reason(), "boom");
        assert_eq!(
            interpret_upload_reply(502, "<html>bad gateway</html>"),
            Err(ClientError::Status(502))
        );
        assert!(matches!(
            interpret_upload_reply(200, "<html>"),
            Err(ClientError::Decode(_))
        ));
    }
}
