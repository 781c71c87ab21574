pub mod http;
pub mod logging;
pub mod push;
pub mod upload;

pub use http::HttpTreeApi;
pub use push::{next_update, wait_until_open, PushRunner, PushSignal};
pub use upload::{submit_and_wait, WaitedUpload, HANDSHAKE_TIMEOUT};
