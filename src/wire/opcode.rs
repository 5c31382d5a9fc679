//! Protocol opcodes and the numeric codes carried in their arguments

pub const NOP: &str = "nop";
pub const AUTH: &str = "auth";
pub const RENAME: &str = "rename";
pub const CONNECT: &str = "connect";
pub const LOGIN: &str = "login";
pub const ADMIN: &str = "admin";
pub const CHAT: &str = "chat";

/// `rename` first argument when the rename concerns this client
pub const RENAME_SELF: &str = "0";

/// `rename` status codes for our own rename
pub mod rename_status {
    pub const ACCEPTED: &str = "0";
    pub const TAKEN: &str = "1";
    pub const INVALID: &str = "2";
    pub const REJECTED: &str = "3";
}

/// Generic success flag used by `connect` and `login`
pub const OK: &str = "1";

/// `admin` sub-opcodes
pub mod admin {
    /// Server: privilege login result
    pub const LOGIN: &str = "0";
    /// Server: monitor reply
    pub const MONITOR_REPLY: &str = "2";
    /// Client: elevate privileges with a password
    pub const ELEVATE: &str = "2";
    /// Client: send a chat message rendered as markup
    pub const MARKUP_CHAT: &str = "21";

    /// Privilege login result codes
    pub mod status {
        pub const FAILED: &str = "0";
        pub const PRIMARY: &str = "1";
        pub const SECONDARY: &str = "3";
    }
}

/// Describe a rename status for logs
pub fn describe_rename_status(status: &str) -> &'static str {
    match status {
        rename_status::ACCEPTED => "accepted",
        rename_status::TAKEN => "name already taken",
        rename_status::INVALID => "invalid name",
        rename_status::REJECTED => "rejected by server",
        _ => "unknown status",
    }
}
