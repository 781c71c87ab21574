use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::admin::{AdminSession, AdminView, HistoryEntry};
use crate::api::TreeApi;
use crate::asset::AssetReference;
use crate::channel::PushEvent;
use crate::endpoints::Endpoints;
use crate::error::ClientError;
use crate::protocol::AdminAck;
use crate::secret::SecretSequenceDetector;
use crate::upload::{SubmitOutcome, UploadPipeline, UploadView};

pub type Clock = Rc<dyn Fn() -> u64>;

/// Wall clock in milliseconds. Not usable on `wasm32-unknown-unknown`; the
/// browser shell supplies `Date.now()` instead.
pub fn system_clock() -> Clock {
    Rc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    })
}

#[derive(Clone)]
pub struct ClientHooks {
    pub on_asset: Rc<dyn Fn(&AssetReference)>,
    pub on_upload: Rc<dyn Fn(&UploadView)>,
    pub on_admin: Rc<dyn Fn(&AdminView)>,
    pub on_notice: Rc<dyn Fn(String)>,
}

impl ClientHooks {
    pub fn empty() -> Self {
        Self {
            on_asset: Rc::new(|_: &AssetReference| {}),
            on_upload: Rc::new(|_: &UploadView| {}),
            on_admin: Rc::new(|_: &AdminView| {}),
            on_notice: Rc::new(|_: String| {}),
        }
    }
}

/// Everything the page keeps between events: the displayed asset, the upload
/// form, the key buffer and the admin session.
///
/// The displayed asset changes only through [`TreeClient::handle_push_event`];
/// admin actions rely on the same broadcast as every other viewer.
pub struct TreeClient<A: TreeApi> {
    api: A,
    endpoints: Endpoints,
    clock: Clock,
    asset: RefCell<AssetReference>,
    upload: UploadPipeline<A::Upload>,
    detector: RefCell<SecretSequenceDetector>,
    admin: AdminSession,
    hooks: Rc<RefCell<ClientHooks>>,
}

impl<A: TreeApi> TreeClient<A> {
    pub fn new(api: A, endpoints: Endpoints, clock: Clock) -> Self {
        let asset = AssetReference::new(endpoints.composite_base(), clock());
        let hooks = Rc::new(RefCell::new(ClientHooks::empty()));
        let upload = UploadPipeline::new();
        let admin = AdminSession::new();
        {
            let hooks = hooks.clone();
            upload.set_observer(Some(Rc::new(move |view: &UploadView| {
                let hook = hooks.borrow().on_upload.clone();
                hook(view);
            })));
        }
        {
            let hooks = hooks.clone();
            admin.set_observer(Some(Rc::new(move |view: &AdminView| {
                let hook = hooks.borrow().on_admin.clone();
                hook(view);
            })));
        }
        Self {
            api,
            endpoints,
            clock,
            asset: RefCell::new(asset),
            upload,
            detector: RefCell::new(SecretSequenceDetector::new()),
            admin,
            hooks,
        }
    }

    pub fn set_hooks(&self, hooks: ClientHooks) {
        *self.hooks.borrow_mut() = hooks;
    }

    pub fn clear_hooks(&self) {
        *self.hooks.borrow_mut() = ClientHooks::empty();
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn asset(&self) -> AssetReference {
        self.asset.borrow().clone()
    }

    pub fn asset_uri(&self) -> String {
        self.asset.borrow().current_uri()
    }

    pub fn upload_view(&self) -> UploadView {
        self.upload.view()
    }

    pub fn admin_view(&self) -> AdminView {
        self.admin.view()
    }

    pub fn history_image_uri(&self, entry: &HistoryEntry) -> String {
        self.endpoints.history_image(&entry.filename).to_string()
    }

    pub fn handle_push_event(&self, event: PushEvent) {
        if event != PushEvent::CompositeUpdated {
            return;
        }
        let asset = {
            let mut asset = self.asset.borrow_mut();
            asset.refresh((self.clock)());
            asset.clone()
        };
        let hook = self.hooks.borrow().on_asset.clone();
        hook(&asset);
        self.upload.on_composite_updated();
    }

    /// Returns `true` when this keystroke unlocked a fresh admin session; the
    /// caller should then run [`TreeClient::open_admin`].
    pub fn on_keystroke(&self, key: &str) -> bool {
        let fired = self.detector.borrow_mut().on_keystroke(key);
        fired && self.admin.activate()
    }

    /// Direct entry for surfaces without a keyboard, such as the CLI.
    pub fn unlock_admin(&self) -> bool {
        self.admin.activate()
    }

    pub fn select_file(&self, file: Option<A::Upload>) {
        match file {
            Some(file) => self.upload.select(file),
            None => self.upload.clear_selection(),
        }
    }

    pub async fn submit_upload(&self) -> SubmitOutcome {
        self.upload.submit(&self.api).await
    }

    /// A failed fetch leaves the panel open with its previous entries.
    pub async fn open_admin(&self) -> Result<(), ClientError> {
        self.admin.open(&self.api).await
    }

    pub fn close_admin(&self) {
        self.admin.close();
    }

    pub async fn restore(&self, filename: &str) -> Result<AdminAck, ClientError> {
        let result = self.admin.restore(&self.api, filename).await;
        if let Err(err) = &result {
            self.notice(format!("Restore failed: {err}"));
        }
        result
    }

    pub async fn rollback(&self, requested_steps: u32) -> Result<AdminAck, ClientError> {
        let result = self.admin.rollback(&self.api, requested_steps).await;
        if let Err(err) = &result {
            self.notice(format!("Rollback failed: {err}"));
        }
        result
    }

    fn notice(&self, message: String) {
        let hook = self.hooks.borrow().on_notice.clone();
        hook(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UploadFile;
    use crate::channel::{ConnectionState, PushChannel};
    use crate::test_support::RecordingApi;
    use crate::upload::UploadState;

    fn fixed_clock(now: u64) -> Clock {
        Rc::new(move || now)
    }

    fn client(api: RecordingApi) -> TreeClient<RecordingApi> {
        let endpoints = Endpoints::parse("http://localhost:8002").expect("origin");
        TreeClient::new(api, endpoints, fixed_clock(1_000))
    }

    fn type_keys(client: &TreeClient<RecordingApi>, text: &str) -> usize {
        text.chars()
            .filter(|ch| client.on_keystroke(&ch.to_string()))
            .count()
    }

    #[test]
    fn initial_uri_is_cache_busted_composite() {
        let client = client(RecordingApi::new());
        assert_eq!(
            client.asset_uri(),
            "http://localhost:8002/tree-assets/current_tree.png?t=1000"
        );
    }

    #[test]
    fn update_changes_only_the_asset_version() {
        let client = client(RecordingApi::new());
        let mut channel = PushChannel::new(client.endpoints().push());
        channel.start();
        channel.on_open();
        let upload_before = client.upload_view();
        let admin_before = client.admin_view();
        let uri_before = client.asset_uri();

        client.handle_push_event(channel.on_message("update_tree"));

        assert_ne!(client.asset_uri(), uri_before);
        assert!(client
            .asset_uri()
            .starts_with("http://localhost:8002/tree-assets/current_tree.png?t="));
        assert_eq!(client.upload_view(), upload_before);
        assert_eq!(client.admin_view(), admin_before);
        assert_eq!(channel.state(), ConnectionState::Open);
    }

    #[test]
    fn version_changes_iff_at_least_one_update() {
        for count in 0..5usize {
            let client = client(RecordingApi::new());
            let before = client.asset().version();
            for _ in 0..count {
                client.handle_push_event(PushEvent::CompositeUpdated);
            }
            client.handle_push_event(PushEvent::Ignored);
            assert_eq!(client.asset().version() != before, count >= 1, "count {count}");
        }
    }

    #[test]
    fn asset_hook_fires_per_notification() {
        let client = client(RecordingApi::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        client.set_hooks(ClientHooks {
            on_asset: Rc::new(move |asset: &AssetReference| {
                sink.borrow_mut().push(asset.current_uri());
            }),
            ..ClientHooks::empty()
        });
        client.handle_push_event(PushEvent::CompositeUpdated);
        client.handle_push_event(PushEvent::CompositeUpdated);
        client.handle_push_event(PushEvent::Ignored);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn secret_unlocks_and_open_fetches_history() {
        let api = RecordingApi::new();
        api.push_history_reply(Ok(RecordingApi::history_of(&["b.png", "a.png"])));
        let client = client(api);
        assert_eq!(type_keys(&client, "hello 96496"), 0);
        assert!(!client.admin_view().active);
        assert_eq!(type_keys(&client, "3!!"), 1);
        let _ = client.open_admin().await;

        let view = client.admin_view();
        assert!(view.active);
        assert_eq!(view.entries.len(), 2);
        assert_eq!(
            client.history_image_uri(&view.entries[1]),
            "http://localhost:8002/tree-assets/history/a.png"
        );
        // Typing the secret again while open does not start a second session.
        assert_eq!(type_keys(&client, "964963!!"), 0);
    }

    #[tokio::test]
    async fn restore_scenario_keeps_local_history_until_refetch() {
        let api = RecordingApi::new();
        api.push_history_reply(Ok(RecordingApi::history_of(&["b.png", "a.png"])));
        api.push_history_reply(Ok(RecordingApi::history_of(&["a.png", "b.png", "a.png"])));
        let client = client(api);
        type_keys(&client, "964963!!");
        let _ = client.open_admin().await;
        let entries_before = client.admin_view().entries;

        client.restore("a.png").await.expect("restore");

        assert_eq!(
            client.api().calls().last().map(|(_, body)| body.clone()),
            Some(r#"{"filename":"a.png"}"#.to_string())
        );
        assert_eq!(client.admin_view().entries, entries_before);

        let _ = client.open_admin().await;
        assert_eq!(client.admin_view().entries.len(), 3);
    }

    #[tokio::test]
    async fn failed_admin_actions_raise_blocking_notice() {
        let api = RecordingApi::new();
        api.push_admin_reply(Err(ClientError::Transport("offline".to_string())));
        api.push_admin_reply(Err(ClientError::Status(500)));
        let client = client(api);
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = notices.clone();
        client.set_hooks(ClientHooks {
            on_notice: Rc::new(move |message: String| sink.borrow_mut().push(message)),
            ..ClientHooks::empty()
        });
        type_keys(&client, "964963!!");

        assert!(client.restore("a.png").await.is_err());
        assert!(client.rollback(0).await.is_err());
        assert_eq!(
            *notices.borrow(),
            vec![
                "Restore failed: transport failure: offline".to_string(),
                "Rollback failed: server responded with status 500".to_string(),
            ]
        );
        assert_eq!(
            client.api().calls().last().map(|(_, body)| body.clone()),
            Some(r#"{"steps":1}"#.to_string())
        );
    }

    #[tokio::test]
    async fn upload_indicator_cleared_by_push_after_success() {
        let api = RecordingApi::new();
        let client = client(api);
        client.submit_upload().await;
        assert!(client.api().calls().is_empty());
        assert_eq!(client.upload_view().state, UploadState::Idle);

        client.select_file(Some(UploadFile::new("star.png", vec![1, 2, 3])));
        assert_eq!(client.submit_upload().await, SubmitOutcome::Succeeded);
        assert!(client.upload_view().loading);

        client.handle_push_event(PushEvent::CompositeUpdated);
        assert!(!client.upload_view().loading);
    }

    #[test]
    fn close_admin_discards_session() {
        let client = client(RecordingApi::new());
        type_keys(&client, "964963!!");
        assert!(client.admin_view().active);
        client.close_admin();
        assert_eq!(client.admin_view(), AdminView::default());
    }
}
