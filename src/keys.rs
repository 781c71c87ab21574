use std::rc::Rc;

use gloo::events::EventListener;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::KeyboardEvent;

use crate::app::App;

/// Feeds every `keydown` on the window into the secret detector. No default
/// action is prevented, so typing into the page behaves as usual.
pub fn install(client: Rc<App>) -> Option<EventListener> {
    let window = web_sys::window()?;
    Some(EventListener::new(&window, "keydown", move |event| {
        let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        if !client.on_keystroke(&event.key()) {
            return;
        }
        let client = client.clone();
        spawn_local(async move {
            if let Err(err) = client.open_admin().await {
                gloo::console::warn!("failed to fetch history", err.to_string());
            }
        });
    }))
}
