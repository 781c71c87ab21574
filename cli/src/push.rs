use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mofutree_core::{ChannelCommand, ConnectionState, PushChannel, PushEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// What the push driver reports back to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushSignal {
    State(ConnectionState),
    CompositeUpdated,
}

/// Background task that keeps one push connection alive until stopped.
pub struct PushRunner {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PushRunner {
    /// Spawns the driver. Signals arrive on the returned receiver in order.
    pub fn spawn(endpoint: Url) -> (Self, mpsc::UnboundedReceiver<PushSignal>) {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (signals, signals_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(PushChannel::new(endpoint), signals, shutdown_rx));
        (Self { shutdown, task }, signals_rx)
    }

    /// Closes the open connection or cancels the pending reconnect, then
    /// waits for the driver to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "push driver ended abnormally");
        }
    }
}

/// Drains `signals` until the connection reports open. False when the
/// channel stays closed for `limit` or the driver has exited.
pub async fn wait_until_open(
    signals: &mut mpsc::UnboundedReceiver<PushSignal>,
    limit: Duration,
) -> bool {
    let opened = tokio::time::timeout(limit, async {
        while let Some(signal) = signals.recv().await {
            if signal == PushSignal::State(ConnectionState::Open) {
                return true;
            }
        }
        false
    });
    opened.await.unwrap_or(false)
}

/// Waits up to `limit` for the next composite announcement.
pub async fn next_update(
    signals: &mut mpsc::UnboundedReceiver<PushSignal>,
    limit: Duration,
) -> bool {
    let updated = tokio::time::timeout(limit, async {
        while let Some(signal) = signals.recv().await {
            if signal == PushSignal::CompositeUpdated {
                return true;
            }
        }
        false
    });
    updated.await.unwrap_or(false)
}

async fn drive(
    mut channel: PushChannel,
    signals: mpsc::UnboundedSender<PushSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut next = channel.start();
    while let Some(command) = next.take() {
        if *shutdown.borrow() {
            channel.stop();
            break;
        }
        match command {
            ChannelCommand::Connect(url) => {
                let _ = signals.send(PushSignal::State(ConnectionState::Connecting));
                let connected = tokio::select! {
                    result = tokio_tungstenite::connect_async(url.as_str()) => result,
                    _ = shutdown.changed() => {
                        channel.stop();
                        break;
                    }
                };
                match connected {
                    Ok((ws, _response)) => {
                        channel.on_open();
                        let _ = signals.send(PushSignal::State(ConnectionState::Open));
                        let (mut write, mut read) = ws.split();
                        let stopped = loop {
                            tokio::select! {
                                message = read.next() => match message {
                                    Some(Ok(Message::Text(text))) => {
                                        if channel.on_message(text.as_str()) == PushEvent::CompositeUpdated {
                                            let _ = signals.send(PushSignal::CompositeUpdated);
                                        }
                                    }
                                    Some(Ok(Message::Close(frame))) => {
                                        tracing::debug!(?frame, "push channel closed by server");
                                        break false;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(err)) => {
                                        tracing::warn!(error = %err, "push channel error");
                                        break false;
                                    }
                                    None => break false,
                                },
                                _ = shutdown.changed() => {
                                    for command in channel.stop() {
                                        if command == ChannelCommand::Close {
                                            let _ = write.send(Message::Close(None)).await;
                                        }
                                    }
                                    break true;
                                }
                            }
                        };
                        if stopped {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(endpoint = %url, error = %err, "push connect failed");
                    }
                }
                next = channel.on_closed();
                let _ = signals.send(PushSignal::State(ConnectionState::Closed));
            }
            ChannelCommand::ScheduleReconnect(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        next = channel.on_reconnect_timer();
                    }
                    _ = shutdown.changed() => {
                        channel.stop();
                        break;
                    }
                }
            }
            ChannelCommand::Close | ChannelCommand::CancelReconnect => break,
        }
    }
    tracing::debug!(attempts = channel.attempts(), "push driver exiting");
}
