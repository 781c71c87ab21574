#![cfg(target_arch = "wasm32")]

pub mod app;
pub mod config;
pub mod dom_view;
pub mod http;
pub mod keys;
pub mod logging;
pub mod push_runtime;

pub use app::{boot, install_teardown, new_client, App};
