use std::time::Duration;

use url::Url;

use crate::protocol::PushMessage;

/// Fixed, no backoff and no jitter: the server is a single small instance.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Side effects a driver must carry out for the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Connect(Url),
    ScheduleReconnect(Duration),
    Close,
    CancelReconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
    CompositeUpdated,
    Ignored,
}

/// Sans-IO push channel lifecycle.
///
/// `Connecting -> Open -> Closed -> Connecting -> ...` until `stop()`. The
/// driver owns the socket and the single reconnect timer; this type decides
/// when either is created or torn down. Once stopped, no input produces a
/// command again.
#[derive(Debug, Clone)]
pub struct PushChannel {
    endpoint: Url,
    state: ConnectionState,
    started: bool,
    stopped: bool,
    reconnect_pending: bool,
    attempts: u64,
}

impl PushChannel {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            state: ConnectionState::Closed,
            started: false,
            stopped: false,
            reconnect_pending: false,
            attempts: 0,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Number of connection attempts made so far, the first one included.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn start(&mut self) -> Option<ChannelCommand> {
        if self.started || self.stopped {
            return None;
        }
        self.started = true;
        Some(self.begin_connect())
    }

    pub fn on_open(&mut self) {
        if self.stopped || self.state != ConnectionState::Connecting {
            return;
        }
        tracing::info!(endpoint = %self.endpoint, "push channel open");
        self.state = ConnectionState::Open;
    }

    pub fn on_message(&mut self, payload: &str) -> PushEvent {
        if self.stopped || self.state != ConnectionState::Open {
            return PushEvent::Ignored;
        }
        match PushMessage::parse(payload) {
            PushMessage::UpdateTree => PushEvent::CompositeUpdated,
            PushMessage::Unknown => {
                tracing::debug!(len = payload.len(), "ignoring push payload");
                PushEvent::Ignored
            }
        }
    }

    /// Error-close and clean close are treated alike. A second close report
    /// for the same connection (error followed by close) schedules nothing.
    pub fn on_closed(&mut self) -> Option<ChannelCommand> {
        if self.stopped || !self.started || self.state == ConnectionState::Closed {
            return None;
        }
        tracing::info!(
            endpoint = %self.endpoint,
            delay_ms = RECONNECT_DELAY.as_millis() as u64,
            "push channel closed, reconnect scheduled"
        );
        self.state = ConnectionState::Closed;
        self.reconnect_pending = true;
        Some(ChannelCommand::ScheduleReconnect(RECONNECT_DELAY))
    }

    pub fn on_reconnect_timer(&mut self) -> Option<ChannelCommand> {
        if self.stopped || !self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = false;
        Some(self.begin_connect())
    }

    pub fn stop(&mut self) -> Vec<ChannelCommand> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;
        let mut commands = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            commands.push(ChannelCommand::CancelReconnect);
        }
        if self.state != ConnectionState::Closed {
            commands.push(ChannelCommand::Close);
        }
        self.state = ConnectionState::Closed;
        commands
    }

    fn begin_connect(&mut self) -> ChannelCommand {
        self.state = ConnectionState::Connecting;
        self.attempts = self.attempts.saturating_add(1);
        ChannelCommand::Connect(self.endpoint.clone())
    }
}
