/// Cache-busted reference to the current composite.
///
/// The version token is a millisecond timestamp forced strictly upward, so two
/// refreshes landing in the same millisecond (or a clock stepping backwards)
/// still yield distinct URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    base_uri: String,
    version: u64,
}

impl AssetReference {
    pub fn new(base_uri: impl Into<String>, now_ms: u64) -> Self {
        Self {
            base_uri: base_uri.into(),
            version: now_ms,
        }
    }

    pub fn current_uri(&self) -> String {
        format!("{}{}", self.base_uri, self.version)
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn refresh(&mut self, now_ms: u64) -> u64 {
        self.version = now_ms.max(self.version.saturating_add(1));
        self.version
    }

    pub fn download_filename(&self) -> String {
        format!("christmas_tree_{}.png", self.version)
    }
}
