use crate::conf::records::ClassRecord;

/// Auth descriptor construction from `password` sub-trees.
pub mod auth;
pub mod cli;
/// The configuration engine: parser, loader, validator, committer, record
/// store and the rehash orchestrator.
pub mod conf;
pub mod error;
/// The daemon's shared `*`/`?` mask matcher.
pub mod mask;
pub mod motd;
/// Resolver bootstrap: seeds DNS defaults from the environment and platform
/// sources.
pub mod resolver;
#[cfg(test)]
mod tests;

/// Maximum length of a hostname the daemon will carry around.
pub const HOSTLEN: usize = 63;
/// Maximum length of a username (ident reply).
pub const USERLEN: usize = 10;
/// Maximum length of a "real name" / server info line, including the NUL the
/// wire protocol reserves. `me::info` may be at most `REALLEN - 1` characters.
pub const REALLEN: usize = 50;

/// Fields of the built-in `default` class, used whenever a record names a
/// class that does not exist at commit time.
pub const DEFAULT_CLASS_PINGFREQ: u32 = 120;
pub const DEFAULT_CLASS_MAXCLIENTS: u32 = 100;
pub const DEFAULT_CLASS_SENDQ: u64 = 100_000;

pub(crate) fn default_class() -> ClassRecord {
    ClassRecord {
        name: "default".to_string(),
        pingfreq: DEFAULT_CLASS_PINGFREQ,
        maxclients: DEFAULT_CLASS_MAXCLIENTS,
        sendq: DEFAULT_CLASS_SENDQ,
        connfreq: None,
        clients: 0,
    }
}
