use std::cell::RefCell;
use std::rc::Rc;

use gloo::timers::callback::Timeout;
use mofutree_core::{ChannelCommand, ConnectionState, PushChannel, PushEvent};
use url::Url;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

#[allow(dead_code)]
struct WsHandlers {
    onopen: Closure<dyn FnMut(Event)>,
    onmessage: Closure<dyn FnMut(MessageEvent)>,
    onerror: Closure<dyn FnMut(ErrorEvent)>,
    onclose: Closure<dyn FnMut(Event)>,
}

struct PushRuntimeState {
    channel: Option<PushChannel>,
    ws: Option<WebSocket>,
    handlers: Option<WsHandlers>,
    // Each socket's handlers carry the generation they were created for, so
    // events from a socket that was already replaced or closed are dropped.
    generation: u64,
    reconnect_timer: Option<Timeout>,
    on_event: Option<Rc<dyn Fn(PushEvent)>>,
}

impl PushRuntimeState {
    fn new() -> Self {
        Self {
            channel: None,
            ws: None,
            handlers: None,
            generation: 0,
            reconnect_timer: None,
            on_event: None,
        }
    }
}

thread_local! {
    static STATE: RefCell<PushRuntimeState> = RefCell::new(PushRuntimeState::new());
}

/// Starts the page-wide push channel. Only the first call has any effect.
pub fn start(endpoint: Url, on_event: Rc<dyn Fn(PushEvent)>) {
    let command = STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        if state.channel.is_some() {
            gloo::console::warn!("push channel already started");
            return None;
        }
        let mut channel = PushChannel::new(endpoint);
        let command = channel.start();
        state.channel = Some(channel);
        state.on_event = Some(on_event);
        command
    });
    if let Some(command) = command {
        execute(command);
    }
}

/// Page teardown: closes the socket and cancels a pending reconnect.
pub fn stop() {
    let commands = STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        state.on_event = None;
        state
            .channel
            .as_mut()
            .map(|channel| channel.stop())
            .unwrap_or_default()
    });
    for command in commands {
        execute(command);
    }
}

pub fn connection_state() -> Option<ConnectionState> {
    STATE.with(|slot| slot.borrow().channel.as_ref().map(|channel| channel.state()))
}

pub fn is_stopped() -> bool {
    STATE.with(|slot| {
        slot.borrow()
            .channel
            .as_ref()
            .map(|channel| channel.is_stopped())
            .unwrap_or(false)
    })
}

pub fn reconnect_pending() -> bool {
    STATE.with(|slot| {
        slot.borrow()
            .channel
            .as_ref()
            .map(|channel| channel.reconnect_pending())
            .unwrap_or(false)
    })
}

fn execute(command: ChannelCommand) {
    match command {
        ChannelCommand::Connect(url) => open_socket(&url),
        ChannelCommand::ScheduleReconnect(delay) => {
            let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
            let timer = Timeout::new(delay_ms, || {
                let next = STATE.with(|slot| {
                    slot.borrow_mut()
                        .channel
                        .as_mut()
                        .and_then(|channel| channel.on_reconnect_timer())
                });
                if let Some(command) = next {
                    execute(command);
                }
            });
            STATE.with(|slot| {
                slot.borrow_mut().reconnect_timer = Some(timer);
            });
        }
        ChannelCommand::Close => close_socket(),
        ChannelCommand::CancelReconnect => {
            let timer = STATE.with(|slot| slot.borrow_mut().reconnect_timer.take());
            if let Some(timer) = timer {
                timer.cancel();
            }
        }
    }
}

fn is_current(generation: u64) -> bool {
    STATE.with(|slot| slot.borrow().generation == generation)
}

fn open_socket(url: &Url) {
    let ws = match WebSocket::new(url.as_str()) {
        Ok(ws) => ws,
        Err(_) => {
            gloo::console::warn!("failed to open websocket", url.to_string());
            handle_closed();
            return;
        }
    };
    let generation = STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        state.generation = state.generation.wrapping_add(1);
        state.generation
    });

    let onopen = {
        let url = url.to_string();
        Closure::wrap(Box::new(move |_event: Event| {
            if !is_current(generation) {
                return;
            }
            gloo::console::log!("websocket connected", url.clone());
            STATE.with(|slot| {
                if let Some(channel) = slot.borrow_mut().channel.as_mut() {
                    channel.on_open();
                }
            });
        }) as Box<dyn FnMut(Event)>)
    };
    let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
        if !is_current(generation) {
            return;
        }
        // Binary frames are never meaningful here.
        let Some(text) = event.data().as_string() else {
            return;
        };
        let (pushed, hook) = STATE.with(|slot| {
            let mut state = slot.borrow_mut();
            let pushed = state
                .channel
                .as_mut()
                .map(|channel| channel.on_message(&text))
                .unwrap_or(PushEvent::Ignored);
            (pushed, state.on_event.clone())
        });
        if pushed == PushEvent::CompositeUpdated {
            if let Some(hook) = hook {
                hook(pushed);
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    let onerror = {
        let url = url.to_string();
        Closure::wrap(Box::new(move |_event: ErrorEvent| {
            if !is_current(generation) {
                return;
            }
            gloo::console::warn!("websocket error", url.clone());
            handle_closed();
        }) as Box<dyn FnMut(ErrorEvent)>)
    };
    let onclose = {
        let url = url.to_string();
        Closure::wrap(Box::new(move |event: Event| {
            if !is_current(generation) {
                return;
            }
            match event.dyn_ref::<CloseEvent>() {
                Some(close) => gloo::console::log!("websocket closed", url.clone(), close.code()),
                None => gloo::console::log!("websocket closed", url.clone()),
            }
            handle_closed();
        }) as Box<dyn FnMut(Event)>)
    };

    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        state.ws = Some(ws);
        state.handlers = Some(WsHandlers {
            onopen,
            onmessage,
            onerror,
            onclose,
        });
    });
}

/// Error and close both land here; the channel drops the second report.
fn handle_closed() {
    let command = STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        let command = state.channel.as_mut().and_then(|channel| channel.on_closed());
        if command.is_some() {
            detach(&mut state);
        }
        command
    });
    if let Some(command) = command {
        execute(command);
    }
}

fn close_socket() {
    STATE.with(|slot| {
        let mut state = slot.borrow_mut();
        state.generation = state.generation.wrapping_add(1);
        if let Some(ws) = detach(&mut state) {
            let _ = ws.close();
        }
    });
}

fn detach(state: &mut PushRuntimeState) -> Option<WebSocket> {
    let ws = state.ws.take();
    if let Some(ws) = ws.as_ref() {
        ws.set_onopen(None);
        ws.set_onmessage(None);
        ws.set_onerror(None);
        ws.set_onclose(None);
    }
    state.handlers.take();
    ws
}
