use std::collections::VecDeque;

pub const ADMIN_SECRET: &str = "964963!!";
pub const KEY_BUFFER_CAPACITY: usize = 20;

/// Sliding window over the most recent qualifying keystrokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuffer {
    keys: VecDeque<char>,
}

impl KeyBuffer {
    pub fn new() -> Self {
        Self {
            keys: VecDeque::with_capacity(KEY_BUFFER_CAPACITY + 1),
        }
    }

    pub fn push(&mut self, key: char) {
        self.keys.push_back(key);
        while self.keys.len() > KEY_BUFFER_CAPACITY {
            self.keys.pop_front();
        }
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        let count = suffix.chars().count();
        if count > self.keys.len() {
            return false;
        }
        self.keys
            .iter()
            .skip(self.keys.len() - count)
            .copied()
            .eq(suffix.chars())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.keys.iter().collect()
    }
}

/// Obscurity gate for the admin panel. Not an access control mechanism.
#[derive(Debug, Clone, Default)]
pub struct SecretSequenceDetector {
    buffer: KeyBuffer,
}

impl SecretSequenceDetector {
    pub fn new() -> Self {
        Self {
            buffer: KeyBuffer::new(),
        }
    }

    /// Feeds one key identifier (`KeyboardEvent.key` style). Returns `true`
    /// when the secret was just completed.
    pub fn on_keystroke(&mut self, key: &str) -> bool {
        let Some(ch) = printable_char(key) else {
            return false;
        };
        self.buffer.push(ch);
        if !self.buffer.ends_with(ADMIN_SECRET) {
            return false;
        }
        self.buffer.clear();
        true
    }

    pub fn buffer(&self) -> &KeyBuffer {
        &self.buffer
    }
}

fn printable_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let ch = chars.next()?;
    if chars.next().is_some() || ch.is_control() {
        return None;
    }
    Some(ch)
}
