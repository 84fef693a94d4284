//! The typed configuration records.
//!
//! Every record kind lives in its own ordered list inside
//! [crate::conf::store::ConfigStore]; iteration order is insertion order, and
//! only the committer ever mutates them. Fields marked transient (listener
//! bound state, class client counters) are shared with the network subsystem
//! but only touched on the main loop.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AuthDescriptor;
use crate::conf::flags::{LinkFlags, ListenerFlags, LogFlags, OperFlags, TklFlags};

/// Index of a [ClassRecord] in the store's class list. Stable for the life of
/// the process: classes are only ever updated in place or appended.
pub type ClassId = usize;

/// The one `me {}` block: this server's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeRecord {
    /// Fully qualified server name; always contains a `.`.
    pub name: String,
    pub info: String,
    /// Server numeric, 0..=254.
    pub numeric: u8,
}

/// A connection class: rate and resource limits shared by the records that
/// reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
    pub name: String,
    /// Seconds between PINGs, at least 1.
    pub pingfreq: u32,
    pub maxclients: u32,
    /// Send queue limit in bytes.
    pub sendq: u64,
    /// Seconds between autoconnect attempts, at least 10 when present.
    pub connfreq: Option<u32>,
    /// Live count of clients attached to this class. Not configuration.
    #[serde(skip_serializing)]
    pub clients: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperRecord {
    pub name: String,
    pub auth: AuthDescriptor,
    pub class: ClassId,
    pub flags: OperFlags,
    pub swhois: Option<String>,
    pub snomask: Option<String>,
    /// user@host masks the oper may authenticate from.
    pub from: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerRecord {
    /// Literal address or a bare `*`.
    pub ip: String,
    pub port: u16,
    pub options: ListenerFlags,
    /// Whether the network subsystem has bound this listener.
    #[serde(skip_serializing)]
    pub bound: bool,
    /// Clients currently attached through this listener.
    #[serde(skip_serializing)]
    pub clients: u32,
    /// Set during rehash; cleared when the new configuration still names this
    /// listener. Survivors with no clients are unlinked afterwards.
    #[serde(skip_serializing)]
    pub temporary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowRecord {
    pub ip: String,
    pub hostname: String,
    pub auth: AuthDescriptor,
    pub class: ClassId,
    pub maxperip: Option<u32>,
    pub redirect_server: Option<String>,
    pub redirect_port: Option<u16>,
    pub noident: bool,
    pub useip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExceptKind {
    Ban,
    Scan,
    Tkl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptRecord {
    pub mask: String,
    pub kind: ExceptKind,
    /// Only present when `kind` is [ExceptKind::Tkl].
    pub tkl: Option<TklFlags>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TldRecord {
    /// user@host mask selecting which clients get this block.
    pub mask: String,
    pub motd_file: String,
    pub motd: Vec<String>,
    /// When the MOTD file was last read.
    pub motd_read: DateTime<Utc>,
    pub rules_file: String,
    pub rules: Vec<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UlineRecord {
    pub servername: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrpassRecord {
    pub restart: Option<AuthDescriptor>,
    pub die: Option<AuthDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VhostRecord {
    pub virtuser: Option<String>,
    pub virthost: String,
    /// Login name; the key under which the grant is looked up.
    pub login: String,
    pub auth: AuthDescriptor,
    pub from: Vec<String>,
    pub swhois: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub servername: String,
    pub username: String,
    pub hostname: String,
    pub bind_ip: String,
    /// Password sent when we initiate the connection.
    #[serde(skip_serializing)]
    pub connect_password: String,
    /// Verifier for the password the peer presents.
    pub recv_auth: AuthDescriptor,
    pub hub: Option<String>,
    pub leaf: Option<String>,
    pub port: u16,
    pub options: LinkFlags,
    pub class: ClassId,
    pub ciphers: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BanKind {
    Nick,
    Ip,
    Server,
    User,
    Realname,
}

impl BanKind {
    pub fn from_name(name: &str) -> Option<BanKind> {
        match name {
            "nick" => Some(BanKind::Nick),
            "ip" => Some(BanKind::Ip),
            "server" => Some(BanKind::Server),
            "user" => Some(BanKind::User),
            "realname" => Some(BanKind::Realname),
            _ => None,
        }
    }
}

/// Where a ban came from; configuration bans survive until the next rehash,
/// service- and oper-placed bans are managed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BanOrigin {
    Config,
    Service,
    Temporary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRecord {
    pub mask: String,
    pub reason: String,
    pub kind: BanKind,
    pub origin: BanOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyDccRecord {
    /// Filename mask, e.g. `*.exe`.
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyLinkKind {
    /// Never link.
    All,
    /// Only deny automatic connects.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyLinkRecord {
    pub mask: String,
    pub rule: String,
    pub kind: DenyLinkKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyChannelRecord {
    pub channel: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowChannelRecord {
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyVersionRecord {
    pub mask: String,
    pub version: String,
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub file: String,
    pub flags: LogFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AliasKind {
    Normal,
    Services,
    Stats,
}

impl AliasKind {
    pub fn from_name(name: &str) -> Option<AliasKind> {
        match name {
            "normal" => Some(AliasKind::Normal),
            "services" => Some(AliasKind::Services),
            "stats" => Some(AliasKind::Stats),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRecord {
    pub name: String,
    pub target: String,
    pub kind: AliasKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpRecord {
    pub name: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeRecord {
    pub file: String,
}
