//! Message loop for one open connection
//!
//! Feeds transport messages through the [`Session`] state machine and performs
//! the resulting actions in order. Frames are handled one at a time; the loop
//! only waits on the transport and the shutdown signal.

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::command_handler::CommandHandler;
use crate::wire::{decode, WsMessage, WsReader, WsWriter, ABNORMAL_CLOSE, NORMAL_CLOSE};

use super::retry::SessionEnd;
use super::state::{Action, ServerEvent, Session};

/// Drive a session until the connection ends
pub async fn run_message_loop(
    writer: &mut WsWriter,
    reader: &mut WsReader,
    mut session: Session,
    commands: &CommandHandler,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let opening = session.on_open();
    if let Some(end) = perform(writer, &session, commands, opening).await {
        return end;
    }

    loop {
        tokio::select! {
            message = reader.recv() => match message {
                Some(Ok(WsMessage::Text(raw))) => {
                    let event = ServerEvent::from_fields(&decode(&raw));
                    let actions = session.handle(event);
                    if let Some(end) = perform(writer, &session, commands, actions).await {
                        return end;
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Err(e) = writer.send_pong(data).await {
                        return SessionEnd::Failed(e.to_string());
                    }
                }
                Some(Ok(WsMessage::Close { code, reason })) => {
                    info!("[{}] Server closed the connection ({code})", session.node());
                    return SessionEnd::Closed { code, reason };
                }
                Some(Err(e)) => {
                    warn!("[{}] {e}", session.node());
                    return SessionEnd::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: e.to_string(),
                    };
                }
                None => {
                    return SessionEnd::Closed {
                        code: ABNORMAL_CLOSE,
                        reason: "stream ended without close frame".to_string(),
                    };
                }
            },

            // Shutdown - exit permanently, don't attempt reconnection
            _ = shutdown.changed() => {
                info!("[{}] Shutdown signal received, closing", session.node());
                if let Err(e) = writer.close(NORMAL_CLOSE, "shutting down").await {
                    debug!("[{}] Close during shutdown failed: {e}", session.node());
                }
                return SessionEnd::Shutdown;
            }
        }
    }
}

/// Perform actions in order, stopping at the first that ends the connection
async fn perform(
    writer: &mut WsWriter,
    session: &Session,
    commands: &CommandHandler,
    actions: Vec<Action>,
) -> Option<SessionEnd> {
    for action in actions {
        match action {
            Action::Send(fields) => {
                if let Err(e) = writer.send_frame(fields.as_slice()).await {
                    return Some(SessionEnd::Failed(e.to_string()));
                }
            }
            Action::Dispatch { sender, message } => {
                let replies =
                    commands.handle_message(session.node(), &sender, session.is_elevated(), &message);
                for reply in replies {
                    if let Err(e) = writer.send_frame(reply.into_fields().as_slice()).await {
                        return Some(SessionEnd::Failed(e.to_string()));
                    }
                }
            }
            Action::Close { reason } => {
                if let Err(e) = writer.close(NORMAL_CLOSE, &reason).await {
                    debug!("[{}] Close failed: {e}", session.node());
                }
                return Some(SessionEnd::Failed(reason));
            }
        }
    }
    None
}
