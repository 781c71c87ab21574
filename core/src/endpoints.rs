use url::Url;

use crate::error::ClientError;

pub const UPLOAD_PATH: &str = "/upload";
pub const HISTORY_PATH: &str = "/admin/history";
pub const RESTORE_PATH: &str = "/admin/restore";
pub const ROLLBACK_PATH: &str = "/admin/rollback";
pub const PUSH_PATH: &str = "/ws";
pub const COMPOSITE_PATH: &str = "/tree-assets/current_tree.png";
pub const HISTORY_ASSET_PATH: &str = "/tree-assets/history";
pub const CACHE_BUST_PARAM: &str = "t";

/// Every URL the client talks to, resolved against one origin.
///
/// The origin may carry a path prefix (a reverse proxy mounting the app under
/// `/tree/`, say); all endpoints are placed below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    origin: Url,
}

impl Endpoints {
    pub fn new(origin: Url) -> Result<Self, ClientError> {
        match origin.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ClientError::Endpoint(format!(
                    "unsupported origin scheme {other}"
                )))
            }
        }
        if origin.cannot_be_a_base() || origin.host_str().is_none() {
            return Err(ClientError::Endpoint(format!("{origin} has no host")));
        }
        let mut origin = origin;
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(Self { origin })
    }

    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        Self::new(Url::parse(raw.trim())?)
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn upload(&self) -> Url {
        self.with_path(UPLOAD_PATH)
    }

    pub fn history(&self) -> Url {
        self.with_path(HISTORY_PATH)
    }

    pub fn restore(&self) -> Url {
        self.with_path(RESTORE_PATH)
    }

    pub fn rollback(&self) -> Url {
        self.with_path(ROLLBACK_PATH)
    }

    pub fn composite(&self) -> Url {
        self.with_path(COMPOSITE_PATH)
    }

    /// Prefix the asset version token is appended to.
    pub fn composite_base(&self) -> String {
        format!("{}?{CACHE_BUST_PARAM}=", self.composite())
    }

    pub fn history_image(&self, filename: &str) -> Url {
        let mut url = self.with_path(HISTORY_ASSET_PATH);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(filename);
        }
        url
    }

    /// Push endpoint on the page's own host; secure transport iff the page
    /// itself is served securely.
    pub fn push(&self) -> Url {
        let mut url = self.with_path(PUSH_PATH);
        let scheme = if self.origin.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        // http(s) -> ws(s) is a special-to-special switch and always allowed.
        let _ = url.set_scheme(scheme);
        url
    }

    fn with_path(&self, path: &str) -> Url {
        let mut url = self.origin.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}{path}"));
        url
    }
}

/// Accepts `ws(s)://` as is and rewrites `http(s)://` to its websocket form.
pub fn normalize_ws_base(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        trimmed.to_string()
    }
}
