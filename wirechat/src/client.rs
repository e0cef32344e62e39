//! Connection lifecycle and the client event loop.
//!
//! [`Client::run`] owns the WebSocket and drives a single task that
//! serializes every source of work (inbound frames, the stale-connection
//! watchdog, the rate-limit cooldown timer, and user input lines) through
//! one `select!` loop. All session state is mutated from that task only, so
//! the non-preemptive handling discipline holds without locks.
//!
//! # Architecture
//!
//! ```text
//! stdin reader ── lines ──▶ ┌───────────┐ ── RenderEvent ──▶ printer
//!                           │ event loop │
//! server ◀── ws frames ──▶ └───────────┘
//! ```
//!
//! The loop reconnects after every close with a fixed delay and never
//! silently gives up; the only deliberate exit is a ban.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use wirechat_proto::codec;
use wirechat_proto::frame::Outbound;

use crate::commands::{self, Command};
use crate::dispatch::{self, Action};
use crate::render::{LinkNotice, RenderEvent};
use crate::session::{ConnState, Session};

/// Write half of the WebSocket connection.
type WsSink = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Channel capacity for input lines and render events.
const CHANNEL_CAPACITY: usize = 256;

/// Everything the connection loop needs, resolved and immutable.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket URL of the chat server.
    pub server_url: String,
    /// Prefix that marks an input line as a command.
    pub command_prefix: String,
    /// Fixed delay between reconnection attempts.
    pub reconnect: Duration,
    /// Stale-connection bound: reconnect when no inbound frame arrives
    /// within this window.
    pub watchdog: Duration,
    /// Authentication scheme attached to every outbound frame.
    pub auth_scheme: String,
    /// Credential token attached to every outbound frame.
    pub auth_token: String,
}

/// Why the client loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The server banned this client. The only deliberate exit.
    Banned,
    /// The render channel closed: whoever owns the output is gone.
    OutputClosed,
}

/// How one live transport ended.
enum LinkEnd {
    /// Closed or errored; reconnect after the configured delay.
    Closed,
    /// The watchdog fired; reconnect immediately.
    Stalled,
    /// Banned; stop.
    Banned,
    /// The render receiver was dropped; stop.
    OutputClosed,
}

/// What the event loop woke up for.
enum Tick {
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Line(String),
    Watchdog,
    Cooldown,
}

/// Whether action processing may continue on this transport.
enum Flow {
    Continue,
    End(LinkEnd),
}

/// Failure to put a frame on the wire.
#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error("encode failed: {0}")]
    Encode(#[from] codec::CodecError),
    #[error("transport write failed: {0}")]
    Write(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The protocol client: one session, one live transport at a time.
pub struct Client {
    options: ClientOptions,
    session: Session,
    lines: mpsc::Receiver<String>,
    render: mpsc::Sender<RenderEvent>,
    /// Rate-limit cooldown deadline. Lives here rather than in the per-
    /// transport loop: the cooldown is server-dictated wall-clock time and
    /// is not cancelled by a disconnect.
    cooldown_at: Option<Instant>,
}

impl Client {
    /// Create a client plus the channels wiring it to the outside world:
    /// a sender for input lines and a receiver for render events.
    #[must_use]
    pub fn new(
        options: ClientOptions,
    ) -> (Self, mpsc::Sender<String>, mpsc::Receiver<RenderEvent>) {
        let (line_tx, line_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (render_tx, render_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let client = Self {
            options,
            session: Session::new(),
            lines: line_rx,
            render: render_tx,
            cooldown_at: None,
        };
        (client, line_tx, render_rx)
    }

    /// Read-only view of the session, for tests and diagnostics.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drive the connection until a terminal condition.
    ///
    /// Maintains at most one live transport. Every close or stall leads to
    /// exactly one new attempt; connect failures retry after the configured
    /// delay.
    pub async fn run(mut self) -> Shutdown {
        loop {
            self.session.state = ConnState::Connecting;
            tracing::info!(url = %self.options.server_url, "connecting");

            let attempt = tokio::time::timeout(
                self.options.watchdog,
                connect_async(self.options.server_url.as_str()),
            );
            let ws = match attempt.await {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "connect failed");
                    if !self.emit(connect_failed(&self.options)).await {
                        return Shutdown::OutputClosed;
                    }
                    sleep(self.options.reconnect).await;
                    continue;
                }
                Err(_) => {
                    tracing::warn!("connect timed out");
                    if !self.emit(connect_failed(&self.options)).await {
                        return Shutdown::OutputClosed;
                    }
                    sleep(self.options.reconnect).await;
                    continue;
                }
            };

            match self.drive(ws).await {
                LinkEnd::Closed => {
                    self.session.state = ConnState::Disconnected;
                    let retry_secs = self.options.reconnect.as_secs();
                    if !self.emit(RenderEvent::Link(LinkNotice::Lost { retry_secs })).await {
                        return Shutdown::OutputClosed;
                    }
                    sleep(self.options.reconnect).await;
                }
                LinkEnd::Stalled => {
                    // The watchdog already waited a full window; go straight
                    // back to Connecting.
                    self.session.state = ConnState::Disconnected;
                    if !self.emit(RenderEvent::Link(LinkNotice::Stalled)).await {
                        return Shutdown::OutputClosed;
                    }
                }
                LinkEnd::Banned => return Shutdown::Banned,
                LinkEnd::OutputClosed => return Shutdown::OutputClosed,
            }
        }
    }

    /// Run one live transport to its end.
    async fn drive(&mut self, ws: WebSocketStream<MaybeTlsStream<TcpStream>>) -> LinkEnd {
        let (mut sink, mut stream) = ws.split();

        self.session.state = ConnState::AwaitingHandshake;
        self.session.pending_rename = false;

        // Handshake, in order: replay-all hello, status probe, profile fetch.
        let handshake = [
            Outbound::Hello { last_message: -1 },
            Outbound::Status,
            Outbound::GetUserConf,
        ];
        for packet in handshake {
            if let Err(err) = self.send(&mut sink, &packet).await {
                tracing::warn!(error = %err, "handshake send failed");
                return LinkEnd::Closed;
            }
        }

        let watchdog = sleep(self.options.watchdog);
        tokio::pin!(watchdog);

        loop {
            let tick = tokio::select! {
                frame = stream.next() => Tick::Frame(frame),
                Some(line) = self.lines.recv() => Tick::Line(line),
                () = &mut watchdog => Tick::Watchdog,
                () = cooldown_wait(self.cooldown_at), if self.cooldown_at.is_some() => Tick::Cooldown,
            };

            match tick {
                Tick::Frame(None) => {
                    tracing::info!("server closed the stream");
                    return LinkEnd::Closed;
                }
                Tick::Frame(Some(Err(err))) => {
                    tracing::warn!(error = %err, "transport error");
                    return LinkEnd::Closed;
                }
                Tick::Frame(Some(Ok(message))) => {
                    // Any inbound frame is evidence of liveness.
                    watchdog
                        .as_mut()
                        .reset(Instant::now() + self.options.watchdog);
                    match message {
                        Message::Text(text) => {
                            let actions = self.handle_frame(text.as_str());
                            match self.perform(&mut sink, actions).await {
                                Flow::Continue => {}
                                Flow::End(end) => return end,
                            }
                        }
                        Message::Ping(payload) => {
                            if sink.send(Message::Pong(payload)).await.is_err() {
                                return LinkEnd::Closed;
                            }
                        }
                        Message::Close(_) => return LinkEnd::Closed,
                        Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {}
                    }
                }
                Tick::Line(line) => {
                    // The rename sub-state accepts its answer even before
                    // Ready: the server can demand a name during the
                    // handshake, ahead of authentication.
                    if self.session.state == ConnState::Ready || self.session.pending_rename {
                        let actions = self.handle_line(&line);
                        match self.perform(&mut sink, actions).await {
                            Flow::Continue => {}
                            Flow::End(end) => return end,
                        }
                    } else {
                        // Input is not accepted until authentication; lines
                        // typed earlier are dropped, not buffered.
                        tracing::debug!("dropping input line before ready");
                    }
                }
                Tick::Watchdog => {
                    tracing::warn!(
                        window = ?self.options.watchdog,
                        "no inbound traffic within the watchdog window"
                    );
                    return LinkEnd::Stalled;
                }
                Tick::Cooldown => {
                    self.cooldown_at = None;
                    if let Some(batch) = self.session.queue.expire() {
                        let packet = Outbound::Message {
                            text: batch,
                            reply: None,
                        };
                        if let Err(err) = self.send(&mut sink, &packet).await {
                            tracing::warn!(error = %err, "queue flush failed");
                            return LinkEnd::Closed;
                        }
                    }
                }
            }
        }
    }

    /// Decode one inbound text frame and apply it to the session.
    fn handle_frame(&mut self, text: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.session.flags.dump {
            actions.push(Action::Render(RenderEvent::PacketDump(text.to_string())));
        }
        match codec::decode(text) {
            Ok(packet) => actions.extend(dispatch::dispatch(&mut self.session, packet)),
            Err(err) => {
                // Malformed frames are reported and skipped; the read loop
                // continues.
                tracing::warn!(error = %err, "undecodable frame");
                actions.push(Action::Render(RenderEvent::Error(err.to_string())));
            }
        }
        actions
    }

    /// Interpret one input line: rename answer, command, or chat message.
    fn handle_line(&mut self, line: &str) -> Vec<Action> {
        if self.session.pending_rename {
            return commands::submit_rename(&mut self.session, line);
        }
        if let Some(rest) = line.strip_prefix(self.options.command_prefix.as_str()) {
            return match Command::parse(rest) {
                Ok(command) => {
                    commands::run(&mut self.session, command, &self.options.command_prefix)
                }
                Err(err) => vec![Action::Render(RenderEvent::Error(err.to_string()))],
            };
        }
        if line.trim().is_empty() {
            return Vec::new();
        }
        commands::submit_chat(&mut self.session, line, None)
    }

    /// Carry out the side effects a dispatch produced.
    async fn perform(&mut self, sink: &mut WsSink, actions: Vec<Action>) -> Flow {
        for action in actions {
            match action {
                Action::Send(packet) => {
                    if let Err(err) = self.send(sink, &packet).await {
                        tracing::warn!(error = %err, "send failed");
                        return Flow::End(LinkEnd::Closed);
                    }
                }
                Action::Render(event) => {
                    if !self.emit(event).await {
                        return Flow::End(LinkEnd::OutputClosed);
                    }
                }
                Action::ArmCooldown(secs) => {
                    // Only produced when the queue was newly activated, so
                    // at most one deadline is ever outstanding.
                    self.cooldown_at = Some(Instant::now() + Duration::from_secs(secs));
                }
                Action::Terminate => return Flow::End(LinkEnd::Banned),
            }
        }
        Flow::Continue
    }

    /// Encode a packet, attach credentials, and write it to the transport.
    async fn send(&self, sink: &mut WsSink, packet: &Outbound) -> Result<(), SendError> {
        let text = codec::encode(
            packet,
            &self.options.auth_scheme,
            &self.options.auth_token,
        )?;
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Hand an event to the renderer. Returns `false` when the output side
    /// is gone.
    async fn emit(&self, event: RenderEvent) -> bool {
        self.render.send(event).await.is_ok()
    }
}

fn connect_failed(options: &ClientOptions) -> RenderEvent {
    RenderEvent::Link(LinkNotice::ConnectFailed {
        retry_secs: options.reconnect.as_secs(),
    })
}

/// Wait for the cooldown deadline, or forever when none is armed.
async fn cooldown_wait(at: Option<Instant>) {
    match at {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
