use std::rc::Rc;

use gloo::events::EventListener;
use mofutree_core::{
    AdminView, AssetReference, ClientHooks, HistoryEntry, PushEvent, TreeClient, UploadView,
    ROLLBACK_STEPS,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::PageTransitionEvent;

use crate::config;
use crate::dom_view::DomView;
use crate::http::BrowserApi;
use crate::keys;
use crate::logging;
use crate::push_runtime;

pub type App = TreeClient<BrowserApi>;

fn to_js(err: impl ToString) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub fn new_client() -> Result<Rc<App>, JsValue> {
    let endpoints = config::page_endpoints().map_err(to_js)?;
    let api = BrowserApi::new(endpoints.clone());
    Ok(Rc::new(TreeClient::new(api, endpoints, Rc::new(config::now_ms))))
}

/// Runs `on_teardown` when the page is discarded. A `pagehide` that parks the
/// page in the back/forward cache is ignored: the restored page resumes with
/// the same instance and its channel must still be live.
pub fn install_teardown(on_teardown: impl Fn() + 'static) -> Option<EventListener> {
    let window = web_sys::window()?;
    Some(EventListener::new(&window, "pagehide", move |event| {
        let persisted = event
            .dyn_ref::<PageTransitionEvent>()
            .is_some_and(|event| event.persisted());
        if !persisted {
            on_teardown();
        }
    }))
}

/// Wires the page. Everything created here lives until the page unloads.
pub fn boot() -> Result<(), JsValue> {
    logging::init();
    let window = web_sys::window().ok_or_else(|| to_js("no window"))?;
    let document = window.document().ok_or_else(|| to_js("no document"))?;
    let client = new_client()?;
    let view = Rc::new(DomView::bind(&document)?);

    let history_image = {
        let endpoints = client.endpoints().clone();
        move |entry: &HistoryEntry| endpoints.history_image(&entry.filename).to_string()
    };
    client.set_hooks(ClientHooks {
        on_asset: {
            let view = view.clone();
            Rc::new(move |asset: &AssetReference| view.render_asset(asset))
        },
        on_upload: {
            let view = view.clone();
            Rc::new(move |upload: &UploadView| view.render_upload(upload))
        },
        on_admin: {
            let view = view.clone();
            let history_image = history_image.clone();
            Rc::new(move |admin: &AdminView| view.render_admin(admin, &history_image))
        },
        on_notice: {
            let view = view.clone();
            Rc::new(move |message: String| view.alert(&message))
        },
    });

    {
        let weak = Rc::downgrade(&client);
        view.set_on_restore(Rc::new(move |filename: String| {
            let Some(client) = weak.upgrade() else {
                return;
            };
            spawn_local(async move {
                let _ = client.restore(&filename).await;
            });
        }));
    }

    view.render_asset(&client.asset());
    view.render_upload(&client.upload_view());
    view.render_admin(&client.admin_view(), &history_image);

    let file_change = {
        let client = client.clone();
        let view = view.clone();
        EventListener::new(&view.file_input.clone(), "change", move |_event| {
            let file = view.file_input.files().and_then(|files| files.get(0));
            view.show_preview(file.as_ref());
            client.select_file(file);
        })
    };
    let submit = {
        let client = client.clone();
        EventListener::new(&view.upload_form, "submit", move |event| {
            event.prevent_default();
            let client = client.clone();
            spawn_local(async move {
                client.submit_upload().await;
            });
        })
    };
    let undo = {
        let client = client.clone();
        EventListener::new(&view.undo_button, "click", move |_event| {
            let client = client.clone();
            spawn_local(async move {
                let _ = client.rollback(ROLLBACK_STEPS).await;
            });
        })
    };
    let close = {
        let client = client.clone();
        EventListener::new(&view.admin_close, "click", move |_event| client.close_admin())
    };

    for listener in [file_change, submit, undo, close] {
        listener.forget();
    }
    for listener in [install_teardown(push_runtime::stop), keys::install(client.clone())]
        .into_iter()
        .flatten()
    {
        listener.forget();
    }

    let push_client = client.clone();
    push_runtime::start(
        config::push_endpoint(client.endpoints()),
        Rc::new(move |event: PushEvent| push_client.handle_push_event(event)),
    );
    Ok(())
}
