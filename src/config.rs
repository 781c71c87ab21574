use mofutree_core::endpoints::normalize_ws_base;
use mofutree_core::{ClientError, Endpoints};
use url::Url;

/// Endpoints for the origin the page was served from.
pub fn page_endpoints() -> Result<Endpoints, ClientError> {
    let window =
        web_sys::window().ok_or_else(|| ClientError::Endpoint("no window".to_string()))?;
    let href = window
        .location()
        .origin()
        .map_err(|_| ClientError::Endpoint("page origin unavailable".to_string()))?;
    Endpoints::parse(&href)
}

/// Build-time override of the push endpoint, for a dev server that does not
/// proxy `/ws` itself.
pub fn ws_override() -> Option<String> {
    let raw = option_env!("MOFUTREE_WS_BASE").or(option_env!("TRUNK_PUBLIC_MOFUTREE_WS_BASE"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_ws_base(trimmed))
}

pub fn push_endpoint(endpoints: &Endpoints) -> Url {
    if let Some(raw) = ws_override() {
        match Url::parse(&raw) {
            Ok(url) => return url,
            Err(_) => gloo::console::warn!("ignoring invalid MOFUTREE_WS_BASE", raw),
        }
    }
    endpoints.push()
}

pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}
