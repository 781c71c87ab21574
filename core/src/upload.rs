use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::api::TreeApi;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Added,
    Failed(String),
    TransportError(String),
}

impl UploadStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, UploadStatus::Added)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Added => f.write_str("Decoration added!"),
            UploadStatus::Failed(reason) => write!(f, "Failed: {reason}"),
            UploadStatus::TransportError(reason) => write!(f, "Error uploading image: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub state: UploadState,
    pub loading: bool,
    pub has_selection: bool,
    pub status: Option<UploadStatus>,
}

impl UploadView {
    pub fn can_submit(&self) -> bool {
        self.has_selection && !self.loading
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Skipped,
    Succeeded,
    Failed(String),
}

struct UploadInner<F> {
    state: UploadState,
    selected: Option<F>,
    loading: bool,
    status: Option<UploadStatus>,
}

impl<F> UploadInner<F> {
    fn view(&self) -> UploadView {
        UploadView {
            state: self.state.clone(),
            loading: self.loading,
            has_selection: self.selected.is_some(),
            status: self.status.clone(),
        }
    }
}

/// Upload lifecycle plus the loading indicator shown over the tree.
///
/// The indicator is raised on submit and lowered by whichever authoritative
/// event arrives: a failed reply, or the push notification that the composite
/// changed. A successful reply alone leaves it up, and a push that arrived
/// before the reply is never undone by it.
pub struct UploadPipeline<F> {
    inner: Rc<RefCell<UploadInner<F>>>,
    observer: Rc<RefCell<Option<Rc<dyn Fn(&UploadView)>>>>,
}

impl<F> Clone for UploadPipeline<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<F: Clone> UploadPipeline<F> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(UploadInner {
                state: UploadState::Idle,
                selected: None,
                loading: false,
                status: None,
            })),
            observer: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_observer(&self, observer: Option<Rc<dyn Fn(&UploadView)>>) {
        *self.observer.borrow_mut() = observer;
    }

    pub fn view(&self) -> UploadView {
        self.inner.borrow().view()
    }

    pub fn state(&self) -> UploadState {
        self.inner.borrow().state.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.borrow().loading
    }

    pub fn select(&self, file: F) {
        self.inner.borrow_mut().selected = Some(file);
        self.notify();
    }

    pub fn clear_selection(&self) {
        let had_selection = self.inner.borrow_mut().selected.take().is_some();
        if had_selection {
            self.notify();
        }
    }

    pub fn can_submit(&self) -> bool {
        self.inner.borrow().view().can_submit()
    }

    pub async fn submit<A>(&self, api: &A) -> SubmitOutcome
    where
        A: TreeApi<Upload = F>,
    {
        let file = {
            let mut inner = self.inner.borrow_mut();
            if inner.loading {
                tracing::debug!("upload already in flight");
                return SubmitOutcome::Skipped;
            }
            let Some(file) = inner.selected.clone() else {
                return SubmitOutcome::Skipped;
            };
            inner.state = UploadState::InFlight;
            inner.loading = true;
            inner.status = None;
            file
        };
        self.notify();

        let result = api.upload(&file).await;

        let outcome = {
            let mut inner = self.inner.borrow_mut();
            match result {
                Ok(reply) if reply.is_success() => {
                    inner.state = UploadState::Succeeded;
                    inner.status = Some(UploadStatus::Added);
                    inner.selected = None;
                    SubmitOutcome::Succeeded
                }
                Ok(reply) => {
                    let reason = reply.failure_reason();
                    inner.state = UploadState::Failed(reason.clone());
                    inner.status = Some(UploadStatus::Failed(reason.clone()));
                    inner.loading = false;
                    SubmitOutcome::Failed(reason)
                }
                Err(ClientError::Transport(reason)) => {
                    inner.state = UploadState::Failed(reason.clone());
                    inner.status = Some(UploadStatus::TransportError(reason.clone()));
                    inner.loading = false;
                    SubmitOutcome::Failed(reason)
                }
                Err(err) => {
                    let reason = err.to_string();
                    inner.state = UploadState::Failed(reason.clone());
                    inner.status = Some(UploadStatus::Failed(reason.clone()));
                    inner.loading = false;
                    SubmitOutcome::Failed(reason)
                }
            }
        };
        if let SubmitOutcome::Failed(reason) = &outcome {
            tracing::warn!(%reason, "upload failed");
        }
        self.notify();
        outcome
    }

    /// Push notification side of the reconciliation rule.
    pub fn on_composite_updated(&self) -> bool {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            std::mem::replace(&mut inner.loading, false)
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            let view = self.view();
            observer(&view);
        }
    }
}

impl<F: Clone> Default for UploadPipeline<F> {
    fn default() -> Self {
        Self::new()
    }
}
