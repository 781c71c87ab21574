use std::cell::RefCell;
use std::rc::Rc;

use crate::api::TreeApi;
use crate::error::ClientError;
use crate::protocol::{AdminAck, RestoreRequest, RollbackRequest};

/// The undo control always moves the server's pointer back by exactly one.
pub const ROLLBACK_STEPS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub filename: String,
    pub position: usize,
}

impl HistoryEntry {
    pub fn is_current(&self) -> bool {
        self.position == 0
    }
}

pub fn entries_from(history: Vec<String>) -> Vec<HistoryEntry> {
    history
        .into_iter()
        .enumerate()
        .map(|(position, filename)| HistoryEntry { filename, position })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminView {
    pub active: bool,
    pub loading: bool,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Default)]
struct AdminInner {
    active: bool,
    loading: bool,
    entries: Vec<HistoryEntry>,
    fetch_seq: u64,
}

impl AdminInner {
    fn view(&self) -> AdminView {
        AdminView {
            active: self.active,
            loading: self.loading,
            entries: self.entries.clone(),
        }
    }
}

/// Admin history browsing. The local entry list is a read-only mirror of the
/// server's; restore and rollback never touch it, only a later `open` does.
#[derive(Clone, Default)]
pub struct AdminSession {
    inner: Rc<RefCell<AdminInner>>,
    observer: Rc<RefCell<Option<Rc<dyn Fn(&AdminView)>>>>,
}

impl AdminSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&self, observer: Option<Rc<dyn Fn(&AdminView)>>) {
        *self.observer.borrow_mut() = observer;
    }

    pub fn view(&self) -> AdminView {
        self.inner.borrow().view()
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    /// Returns `false` when the session was already active.
    pub fn activate(&self) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.active {
                return false;
            }
            inner.active = true;
        }
        self.notify();
        true
    }

    pub fn close(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.active {
                return;
            }
            inner.active = false;
            inner.loading = false;
            inner.entries.clear();
            inner.fetch_seq = inner.fetch_seq.wrapping_add(1);
        }
        self.notify();
    }

    /// Fetches the history list. A failed fetch keeps the previous entries.
    /// A reply that lands after `close` (or after a newer `open`) is dropped.
    pub async fn open<A: TreeApi>(&self, api: &A) -> Result<(), ClientError> {
        let seq = {
            let mut inner = self.inner.borrow_mut();
            if !inner.active {
                return Err(ClientError::SessionInactive);
            }
            inner.fetch_seq = inner.fetch_seq.wrapping_add(1);
            inner.loading = true;
            inner.fetch_seq
        };
        self.notify();

        let result = api.history().await;

        {
            let mut inner = self.inner.borrow_mut();
            if !inner.active || inner.fetch_seq != seq {
                tracing::debug!("discarding stale history reply");
                return Ok(());
            }
            inner.loading = false;
            if let Ok(reply) = &result {
                inner.entries = entries_from(reply.history.clone());
            }
        }
        self.notify();

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch history");
                Err(err)
            }
        }
    }

    pub async fn restore<A: TreeApi>(&self, api: &A, filename: &str) -> Result<AdminAck, ClientError> {
        if !self.is_active() {
            return Err(ClientError::SessionInactive);
        }
        let request = RestoreRequest {
            filename: filename.to_string(),
        };
        api.restore(&request).await
    }

    /// `requested_steps` is whatever the calling control computed; the wire
    /// value is always [`ROLLBACK_STEPS`].
    pub async fn rollback<A: TreeApi>(
        &self,
        api: &A,
        requested_steps: u32,
    ) -> Result<AdminAck, ClientError> {
        if !self.is_active() {
            return Err(ClientError::SessionInactive);
        }
        if requested_steps != ROLLBACK_STEPS {
            tracing::debug!(requested_steps, sent = ROLLBACK_STEPS, "rollback step count pinned");
        }
        let request = RollbackRequest {
            steps: ROLLBACK_STEPS,
        };
        api.rollback(&request).await
    }

    fn notify(&self) {
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            let view = self.view();
            observer(&view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingApi;

    fn names(view: &AdminView) -> Vec<&str> {
        view.entries.iter().map(|e| e.filename.as_str()).collect()
    }

    #[tokio::test]
    async fn open_populates_ordered_entries() {
        let api = RecordingApi::new();
        api.push_history_reply(Ok(RecordingApi::history_of(&["c.png", "b.png", "a.png"])));
        let session = AdminSession::new();
        assert!(session.activate());
        session.open(&api).await.expect("history");

        let view = session.view();
        assert!(!view.loading);
        assert_eq!(names(&view), vec!["c.png", "b.png", "a.png"]);
        assert!(view.entries[0].is_current());
        assert_eq!(view.entries[2].position, 2);
        assert!(!view.entries[1].is_current());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_entries() {
        let api = RecordingApi::new();
        api.push_history_reply(Err(ClientError::Transport("offline".to_string())));
        api.push_history_reply(Ok(RecordingApi::history_of(&["b.png", "a.png"])));
        api.push_history_reply(Err(ClientError::Status(502)));
        let session = AdminSession::new();
        session.activate();

        assert!(session.open(&api).await.is_err());
        let view = session.view();
        assert!(view.active);
        assert!(!view.loading);
        assert!(view.entries.is_empty());

        session.open(&api).await.expect("history");
        assert!(session.open(&api).await.is_err());
        assert_eq!(names(&session.view()), vec!["b.png", "a.png"]);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn restore_sends_exact_body_and_leaves_entries_alone() {
        let api = RecordingApi::new();
        api.push_history_reply(Ok(RecordingApi::history_of(&["b.png", "a.png"])));
        let session = AdminSession::new();
        session.activate();
        session.open(&api).await.expect("history");
        let before = session.view();

        session.restore(&api, "a.png").await.expect("restore");

        assert_eq!(
            api.calls().last().cloned(),
            Some(("/admin/restore".to_string(), r#"{"filename":"a.png"}"#.to_string()))
        );
        assert_eq!(session.view(), before);
    }

    #[tokio::test]
    async fn rollback_wire_payload_is_always_one_step() {
        let api = RecordingApi::new();
        let session = AdminSession::new();
        session.activate();
        for requested in [0, 1, 5] {
            session.rollback(&api, requested).await.expect("rollback");
        }
        let bodies: Vec<String> = api.calls().into_iter().map(|(_, body)| body).collect();
        assert_eq!(bodies, vec![r#"{"steps":1}"#; 3]);
    }

    #[tokio::test]
    async fn actions_require_active_session() {
        let api = RecordingApi::new();
        let session = AdminSession::new();
        assert_eq!(session.open(&api).await, Err(ClientError::SessionInactive));
        assert_eq!(
            session.restore(&api, "a.png").await,
            Err(ClientError::SessionInactive)
        );
        assert_eq!(session.rollback(&api, 1).await, Err(ClientError::SessionInactive));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn close_discards_entries_and_late_reply() {
        let api = RecordingApi::new();
        api.push_history_reply(Ok(RecordingApi::history_of(&["b.png", "a.png"])));
        let gate = api.gate_history();
        let session = AdminSession::new();
        session.activate();

        let open = session.open(&api);
        let close = async {
            tokio::task::yield_now().await;
            assert!(session.view().loading);
            session.close();
            gate.notify_one();
        };
        let (result, ()) = tokio::join!(open, close);

        assert_eq!(result, Ok(()));
        assert_eq!(session.view(), AdminView::default());
    }

    #[tokio::test]
    async fn rejected_admin_action_is_reported() {
        let api = RecordingApi::new();
        api.push_admin_reply(Err(ClientError::Rejected("No history available".to_string())));
        let session = AdminSession::new();
        session.activate();
        assert_eq!(
            session.rollback(&api, 1).await,
            Err(ClientError::Rejected("No history available".to_string()))
        );
    }

    #[test]
    fn activate_is_idempotent() {
        let session = AdminSession::new();
        assert!(session.activate());
        assert!(!session.activate());
        session.close();
        assert!(!session.is_active());
        assert!(session.activate());
    }
}
