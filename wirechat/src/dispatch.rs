//! Inbound packet dispatch.
//!
//! [`dispatch`] applies exactly one state mutation and side-effect set per
//! packet type. Side effects are returned as [`Action`]s for the event loop
//! to interpret rather than performed here, which keeps every dispatch rule
//! synchronous and directly testable. Unknown packet types are reported,
//! never fatal.

use wirechat_proto::cooldown;
use wirechat_proto::frame::Outbound;
use wirechat_proto::packet::{ChatMessage, Packet, StatusKind};

use crate::render::{RenderEvent, StatusNotice};
use crate::session::{ConnState, Session};

/// A side effect requested by the dispatcher or a command handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write a frame to the transport.
    Send(Outbound),
    /// Hand a structured event to the renderer.
    Render(RenderEvent),
    /// Arm the one-shot rate-limit cooldown for this many seconds.
    ArmCooldown(u64),
    /// The server banned this client; stop processing entirely.
    Terminate,
}

/// Apply one inbound packet to the session, returning the side effects.
pub fn dispatch(session: &mut Session, packet: Packet) -> Vec<Action> {
    let mut actions = Vec::new();
    match packet {
        Packet::Status(kind) => on_status(session, kind, &mut actions),
        Packet::ServerMsg {
            message,
            name,
            color,
        } => on_server_msg(session, &message, name, color, &mut actions),
        Packet::Accepted { name, color } | Packet::UserConf { name, color } => {
            apply_profile_update(session, Some(name), Some(color));
        }
        Packet::AuthLevel { value } => session.identity.auth_level = value,
        Packet::Join { name } => {
            session.roster.join(&name);
            actions.push(Action::Render(RenderEvent::Joined(name)));
        }
        Packet::Part { name } => {
            session.roster.part(&name);
            actions.push(Action::Render(RenderEvent::Parted(name)));
        }
        Packet::Chat(message) => on_chat(session, message, &mut actions),
        Packet::Delete { messages } => {
            for id in messages {
                if !session.store.remove(id) {
                    tracing::debug!(id, "delete for unknown message id");
                }
                actions.push(Action::Render(RenderEvent::MessageDeleted(id)));
            }
        }
        Packet::Unknown { kind, data } => {
            tracing::debug!(%kind, "unsupported packet type");
            actions.push(Action::Render(RenderEvent::Unsupported { kind, data }));
        }
    }
    actions
}

fn on_chat(session: &mut Session, message: ChatMessage, actions: &mut Vec<Action>) {
    let reply = session.store.reply_context(&message);
    session.store.insert(message.clone());
    actions.push(Action::Render(RenderEvent::Chat { message, reply }));
}

fn on_server_msg(
    session: &mut Session,
    message: &str,
    name: Option<String>,
    color: Option<String>,
    actions: &mut Vec<Action>,
) {
    actions.push(Action::Render(RenderEvent::ServerMessage(
        message.to_string(),
    )));

    if let Some(secs) = cooldown::cooldown_secs(message) {
        // The send that triggered this notice failed server-side; requeue it
        // before arming so it is not lost, even when the batch is non-empty.
        session.queue.requeue_last();
        actions.push(Action::Render(RenderEvent::RequeuedLast));
        if session.queue.activate() {
            actions.push(Action::ArmCooldown(secs));
        }
    }

    // Shares the profile update with `accepted`: the server may piggyback
    // name/color on a notice, and the two updates are intentionally coupled.
    apply_profile_update(session, name, color);
}

/// Combined profile update used by `accepted`, `getuserconf`, and
/// `servermsg`. The server is authoritative; present fields overwrite.
fn apply_profile_update(session: &mut Session, name: Option<String>, color: Option<String>) {
    if let Some(name) = name {
        session.identity.name = Some(name);
    }
    if let Some(color) = color {
        session.identity.color = color;
    }
}

fn on_status(session: &mut Session, kind: StatusKind, actions: &mut Vec<Action>) {
    match kind {
        StatusKind::Unauthenticated => {
            actions.push(Action::Render(RenderEvent::Status(
                StatusNotice::Unauthenticated,
            )));
        }
        StatusKind::Authenticated => {
            session.state = ConnState::Ready;
            actions.push(Action::Render(RenderEvent::Status(
                StatusNotice::Authenticated,
            )));
        }
        StatusKind::Banned => {
            actions.push(Action::Render(RenderEvent::Status(StatusNotice::Banned)));
            actions.push(Action::Terminate);
        }
        StatusKind::Rename => {
            session.pending_rename = true;
            actions.push(Action::Render(RenderEvent::Status(
                StatusNotice::ForcedRename,
            )));
            actions.push(Action::Render(RenderEvent::NamePrompt));
        }
        StatusKind::NameExists => name_rejected(session, StatusNotice::NameExists, actions),
        StatusKind::NameInvalid => name_rejected(session, StatusNotice::NameInvalid, actions),
        StatusKind::NameLength => name_rejected(session, StatusNotice::NameLength, actions),
        StatusKind::NameTimeout => {
            actions.push(Action::Render(RenderEvent::Status(
                StatusNotice::NameTimeout,
            )));
        }
        StatusKind::SetUserConf => {
            actions.push(Action::Render(RenderEvent::Status(StatusNotice::Applied)));
        }
        StatusKind::Other(status) => {
            actions.push(Action::Render(RenderEvent::Status(StatusNotice::Unknown(
                status,
            ))));
        }
    }
}

/// The server rejected a name attempt. When no name was ever confirmed the
/// forced-rename flow re-prompts; otherwise the report alone suffices.
fn name_rejected(session: &mut Session, notice: StatusNotice, actions: &mut Vec<Action>) {
    actions.push(Action::Render(RenderEvent::Status(notice)));
    if session.identity.name.is_none() {
        session.pending_rename = true;
        actions.push(Action::Render(RenderEvent::NamePrompt));
    }
}
