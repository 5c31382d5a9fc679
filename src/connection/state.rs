//! Per-connection protocol state
//!
//! `Session` is a pure state machine: it consumes decoded server frames and
//! returns the actions the I/O loop must perform. It never touches the
//! transport, so the whole handshake can be driven from tests.
//!
//! Handshake order with the password scheme:
//! `rename` → server `rename` → `connect` → server `connect` → `admin,2,<pw>`.
//! When the server demands authentication (`auth`), the attach is deferred until
//! the `login` succeeds.

use log::{debug, error, info, warn};

use crate::core::AuthConfig;
use crate::wire::opcode::{self, admin, rename_status};

/// Privilege held by the bot on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    None,
    Elevated,
}

/// Handshake phase of a connection
///
/// Phases only move forward; see [`Phase::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    AwaitingAuth,
    RenameConfirmed,
    Connected,
    Authenticated(Privilege),
    Closed,
}

impl Phase {
    /// Position in the handshake order
    ///
    /// `AwaitingAuth` and `RenameConfirmed` share a rank: either may come first
    /// and neither supersedes the other.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Connecting => 0,
            Phase::AwaitingAuth | Phase::RenameConfirmed => 1,
            Phase::Connected => 2,
            Phase::Authenticated(_) => 3,
            Phase::Closed => 4,
        }
    }
}

/// A decoded server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Nop,
    AuthRequired,
    /// Our own rename was answered
    Renamed { status: String, name: String },
    Attached,
    AttachRefused,
    LoginSucceeded,
    LoginFailed { reason: String },
    /// Result of a privilege login
    PrivilegeResult { status: String },
    MonitorReply { text: String },
    /// A single live chat message
    Chat { sender: String, message: String },
    /// Anything else: other users' renames, chat backlog, unknown opcodes
    Ignored,
}

impl ServerEvent {
    /// Classify decoded frame fields
    ///
    /// Chat text is HTML-unescaped here. Frames with missing arguments are
    /// treated as ignored.
    pub fn from_fields(fields: &[String]) -> ServerEvent {
        let Some((op, args)) = fields.split_first() else {
            return ServerEvent::Ignored;
        };
        let arg = |i: usize| args.get(i).map(String::as_str);

        match op.as_str() {
            opcode::NOP => ServerEvent::Nop,
            opcode::AUTH => ServerEvent::AuthRequired,
            opcode::RENAME => match (arg(0), arg(1), arg(2)) {
                (Some(opcode::RENAME_SELF), Some(status), Some(name)) => ServerEvent::Renamed {
                    status: status.to_string(),
                    name: name.to_string(),
                },
                _ => ServerEvent::Ignored,
            },
            opcode::CONNECT => match arg(0) {
                Some(opcode::OK) => ServerEvent::Attached,
                Some(_) => ServerEvent::AttachRefused,
                None => ServerEvent::Ignored,
            },
            opcode::LOGIN => match arg(0) {
                Some(opcode::OK) => ServerEvent::LoginSucceeded,
                Some(_) => ServerEvent::LoginFailed {
                    reason: arg(1).unwrap_or("no reason given").to_string(),
                },
                None => ServerEvent::Ignored,
            },
            opcode::ADMIN => match (arg(0), arg(1)) {
                (Some(admin::LOGIN), Some(status)) => ServerEvent::PrivilegeResult {
                    status: status.to_string(),
                },
                (Some(admin::MONITOR_REPLY), Some(text)) => ServerEvent::MonitorReply {
                    text: text.to_string(),
                },
                _ => ServerEvent::Ignored,
            },
            // Exactly one (sender, message) pair is live chat; more is backlog
            opcode::CHAT if args.len() == 2 => ServerEvent::Chat {
                sender: args[0].clone(),
                message: html_escape::decode_html_entities(&args[1]).into_owned(),
            },
            _ => ServerEvent::Ignored,
        }
    }
}

/// Work the I/O loop must perform for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a frame with these fields
    Send(Vec<String>),
    /// Hand a chat message to the command interpreter
    Dispatch { sender: String, message: String },
    /// End the connection; counted as an abnormal close
    Close { reason: String },
}

fn frame(fields: &[&str]) -> Action {
    Action::Send(fields.iter().map(|f| f.to_string()).collect())
}

/// Protocol state of one connection
#[derive(Debug, Clone)]
pub struct Session {
    node: String,
    requested_name: String,
    auth: AuthConfig,
    phase: Phase,
    display_name: Option<String>,
    /// Server demanded authentication on this connection
    awaiting_auth: bool,
    /// Rename came back while authentication was outstanding
    attach_deferred: bool,
    /// `connect` has been sent
    attach_sent: bool,
    logged_in: bool,
}

impl Session {
    pub fn new(node: impl Into<String>, username: impl Into<String>, auth: AuthConfig) -> Self {
        Session {
            node: node.into(),
            requested_name: username.into(),
            auth,
            phase: Phase::Connecting,
            display_name: None,
            awaiting_auth: false,
            attach_deferred: false,
            attach_sent: false,
            logged_in: false,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Name the server assigned us, once known
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn is_elevated(&self) -> bool {
        self.phase == Phase::Authenticated(Privilege::Elevated)
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Actions to run once the transport is open
    pub fn on_open(&mut self) -> Vec<Action> {
        info!("[{}] Transport open, requesting name {}", self.node, self.requested_name);
        vec![frame(&[opcode::RENAME, self.requested_name.as_str()])]
    }

    /// Apply one server event
    pub fn handle(&mut self, event: ServerEvent) -> Vec<Action> {
        if self.is_closed() {
            return Vec::new();
        }

        match event {
            ServerEvent::Nop => vec![frame(&[opcode::NOP])],
            ServerEvent::AuthRequired => self.on_auth_required(),
            ServerEvent::Renamed { status, name } => self.on_renamed(&status, name),
            ServerEvent::Attached => self.on_attached(),
            ServerEvent::AttachRefused => {
                error!("[{}] Server refused to attach to node", self.node);
                self.close("node refused attach")
            }
            ServerEvent::LoginSucceeded => self.on_login_succeeded(),
            ServerEvent::LoginFailed { reason } => {
                error!("[{}] Account login failed: {reason}", self.node);
                self.close(&format!("login failed: {reason}"))
            }
            ServerEvent::PrivilegeResult { status } => self.on_privilege_result(&status),
            ServerEvent::MonitorReply { text } => {
                debug!("[{}] Monitor: {text}", self.node);
                Vec::new()
            }
            ServerEvent::Chat { sender, message } => {
                if self.display_name.as_deref() == Some(sender.as_str()) {
                    return Vec::new();
                }
                vec![Action::Dispatch { sender, message }]
            }
            ServerEvent::Ignored => Vec::new(),
        }
    }

    fn on_auth_required(&mut self) -> Vec<Action> {
        self.awaiting_auth = true;
        self.advance(Phase::AwaitingAuth);

        if let AuthConfig::Token { token } = &self.auth {
            info!("[{}] Server requires authentication, logging in", self.node);
            return vec![frame(&[opcode::LOGIN, token.as_str()])];
        }

        error!(
            "[{}] Server requires account authentication but the password scheme is configured",
            self.node
        );
        self.close("account authentication required")
    }

    fn on_renamed(&mut self, status: &str, name: String) -> Vec<Action> {
        if status == rename_status::ACCEPTED {
            info!("[{}] Renamed to {name}", self.node);
        } else {
            warn!(
                "[{}] Rename {}, server assigned {name}",
                self.node,
                opcode::describe_rename_status(status)
            );
        }
        self.display_name = Some(name);

        if self.attach_sent || self.attach_deferred {
            return Vec::new();
        }
        if self.awaiting_auth && !self.logged_in {
            debug!("[{}] Deferring attach until login completes", self.node);
            self.attach_deferred = true;
            return Vec::new();
        }

        self.advance(Phase::RenameConfirmed);
        self.attach()
    }

    fn on_attached(&mut self) -> Vec<Action> {
        info!("[{}] Attached to node", self.node);
        self.advance(Phase::Connected);

        if self.awaiting_auth {
            // A successful login already carries the privilege
            return Vec::new();
        }
        match self.auth.elevation_password() {
            Some(password) => {
                debug!("[{}] Elevating privileges", self.node);
                vec![frame(&[opcode::ADMIN, admin::ELEVATE, password])]
            }
            None => Vec::new(),
        }
    }

    fn on_login_succeeded(&mut self) -> Vec<Action> {
        info!("[{}] Logged in", self.node);
        self.logged_in = true;
        self.advance(Phase::Authenticated(Privilege::Elevated));

        if self.attach_deferred {
            self.attach_deferred = false;
            return self.attach();
        }
        Vec::new()
    }

    fn on_privilege_result(&mut self, status: &str) -> Vec<Action> {
        match status {
            admin::status::PRIMARY | admin::status::SECONDARY => {
                info!("[{}] Privileges elevated", self.node);
                self.advance(Phase::Authenticated(Privilege::Elevated));
            }
            _ => {
                warn!("[{}] Privilege elevation failed (status {status})", self.node);
                self.advance(Phase::Authenticated(Privilege::None));
            }
        }
        Vec::new()
    }

    fn attach(&mut self) -> Vec<Action> {
        self.attach_sent = true;
        debug!("[{}] Attaching", self.node);
        vec![frame(&[opcode::CONNECT, self.node.as_str()])]
    }

    fn close(&mut self, reason: &str) -> Vec<Action> {
        self.phase = Phase::Closed;
        vec![Action::Close {
            reason: reason.to_string(),
        }]
    }

    fn advance(&mut self, to: Phase) {
        if to.rank() > self.phase.rank() {
            debug!("[{}] {:?} -> {:?}", self.node, self.phase, to);
            self.phase = to;
        }
    }
}
