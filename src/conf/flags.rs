//! Flag sets and their name tables.
//!
//! Oper flags come in two spellings: the modern named form used inside a
//! `flags { ... }` block, and the legacy compact form where a scalar value
//! packs one character per flag. Both tables below must stay exhaustive over
//! [OperFlags]; unknown characters in the compact form are silently skipped,
//! unknown names are validation errors.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct OperFlags: u32 {
        const LOCAL = 1 << 0;
        const GLOBAL = 1 << 1;
        const REHASH = 1 << 2;
        const DIE = 1 << 3;
        const RESTART = 1 << 4;
        const HELPOP = 1 << 5;
        const GLOBOP = 1 << 6;
        const WALLOP = 1 << 7;
        const LOCOP = 1 << 8;
        const LOCAL_ROUTE = 1 << 9;
        const GLOBAL_ROUTE = 1 << 10;
        const LOCAL_KILL = 1 << 11;
        const GLOBAL_KILL = 1 << 12;
        const KLINE = 1 << 13;
        const UNKLINE = 1 << 14;
        const LOCAL_NOTICE = 1 << 15;
        const GLOBAL_NOTICE = 1 << 16;
        const ADMIN = 1 << 17;
        const SERVICES_ADMIN = 1 << 18;
        const NET_ADMIN = 1 << 19;
        const CO_ADMIN = 1 << 20;
        const ZLINE = 1 << 21;
        const UMODE_W = 1 << 22;
        const STEALTH = 1 << 23;
        const GET_HOST = 1 << 24;
        const GKLINE = 1 << 25;
        const GZLINE = 1 << 26;
    }
}

/// `oper::flags` block item names. Kept in the order the daemon has always
/// listed them.
pub const OPER_FLAG_NAMES: &[(&str, OperFlags)] = &[
    ("local", OperFlags::LOCAL),
    ("global", OperFlags::GLOBAL),
    ("can_rehash", OperFlags::REHASH),
    ("can_die", OperFlags::DIE),
    ("can_restart", OperFlags::RESTART),
    ("helpop", OperFlags::HELPOP),
    ("can_globops", OperFlags::GLOBOP),
    ("can_wallops", OperFlags::WALLOP),
    ("locop", OperFlags::LOCOP),
    ("can_localroute", OperFlags::LOCAL_ROUTE),
    ("can_globalroute", OperFlags::GLOBAL_ROUTE),
    ("can_localkill", OperFlags::LOCAL_KILL),
    ("can_globalkill", OperFlags::GLOBAL_KILL),
    ("can_kline", OperFlags::KLINE),
    ("can_unkline", OperFlags::UNKLINE),
    ("can_localnotice", OperFlags::LOCAL_NOTICE),
    ("can_globalnotice", OperFlags::GLOBAL_NOTICE),
    ("admin", OperFlags::ADMIN),
    ("services-admin", OperFlags::SERVICES_ADMIN),
    ("netadmin", OperFlags::NET_ADMIN),
    ("coadmin", OperFlags::CO_ADMIN),
    ("can_zline", OperFlags::ZLINE),
    ("get_umodew", OperFlags::UMODE_W),
    ("can_stealth", OperFlags::STEALTH),
    ("get_host", OperFlags::GET_HOST),
    ("can_gkline", OperFlags::GKLINE),
    ("can_gzline", OperFlags::GZLINE),
];

/// Legacy single-character oper flag table.
pub const OPER_FLAG_CHARS: &[(char, OperFlags)] = &[
    ('o', OperFlags::LOCAL),
    ('O', OperFlags::GLOBAL),
    ('r', OperFlags::REHASH),
    ('D', OperFlags::DIE),
    ('R', OperFlags::RESTART),
    ('h', OperFlags::HELPOP),
    ('g', OperFlags::GLOBOP),
    ('w', OperFlags::WALLOP),
    ('l', OperFlags::LOCOP),
    ('c', OperFlags::LOCAL_ROUTE),
    ('L', OperFlags::GLOBAL_ROUTE),
    ('k', OperFlags::LOCAL_KILL),
    ('K', OperFlags::GLOBAL_KILL),
    ('b', OperFlags::KLINE),
    ('B', OperFlags::UNKLINE),
    ('n', OperFlags::LOCAL_NOTICE),
    ('G', OperFlags::GLOBAL_NOTICE),
    ('A', OperFlags::ADMIN),
    ('a', OperFlags::SERVICES_ADMIN),
    ('N', OperFlags::NET_ADMIN),
    ('C', OperFlags::CO_ADMIN),
    ('z', OperFlags::ZLINE),
    ('W', OperFlags::UMODE_W),
    ('^', OperFlags::STEALTH),
    ('H', OperFlags::GET_HOST),
    ('t', OperFlags::GKLINE),
    ('Z', OperFlags::GZLINE),
];

pub fn oper_flag_by_name(name: &str) -> Option<OperFlags> {
    OPER_FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

/// Maps a compact flag string ("oOkK...") to a flag set, skipping characters
/// that mean nothing. An empty string means `*`, which also maps to nothing.
pub fn oper_flags_from_chars(value: &str) -> OperFlags {
    let mut flags = OperFlags::empty();
    for ch in value.chars() {
        if let Some((_, flag)) = OPER_FLAG_CHARS.iter().find(|(c, _)| *c == ch) {
            flags |= *flag;
        }
    }
    flags
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct ListenerFlags: u32 {
        const STANDARD = 1 << 0;
        const CLIENTS_ONLY = 1 << 1;
        const SERVERS_ONLY = 1 << 2;
        const REMOTE_ADMIN = 1 << 3;
        const JAVA_CLIENT = 1 << 4;
        const MASK = 1 << 5;
        const SSL = 1 << 6;
    }
}

pub const LISTENER_FLAG_NAMES: &[(&str, ListenerFlags)] = &[
    ("standard", ListenerFlags::STANDARD),
    ("clientsonly", ListenerFlags::CLIENTS_ONLY),
    ("serversonly", ListenerFlags::SERVERS_ONLY),
    ("remoteadmin", ListenerFlags::REMOTE_ADMIN),
    ("java", ListenerFlags::JAVA_CLIENT),
    ("mask", ListenerFlags::MASK),
    ("ssl", ListenerFlags::SSL),
];

pub fn listener_flag_by_name(name: &str) -> Option<ListenerFlags> {
    LISTENER_FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct LinkFlags: u32 {
        const AUTO_CONNECT = 1 << 0;
        const SSL = 1 << 1;
        const ZIP = 1 << 2;
        const QUARANTINE = 1 << 3;
    }
}

pub const LINK_FLAG_NAMES: &[(&str, LinkFlags)] = &[
    ("autoconnect", LinkFlags::AUTO_CONNECT),
    ("ssl", LinkFlags::SSL),
    ("zip", LinkFlags::ZIP),
    ("quarantine", LinkFlags::QUARANTINE),
];

pub fn link_flag_by_name(name: &str) -> Option<LinkFlags> {
    LINK_FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct LogFlags: u32 {
        const ERRORS = 1 << 0;
        const KILLS = 1 << 1;
        const TKL = 1 << 2;
        const CONNECTS = 1 << 3;
        const SERVER_CONNECTS = 1 << 4;
        const KLINE = 1 << 5;
        const OPER = 1 << 6;
    }
}

pub const LOG_FLAG_NAMES: &[(&str, LogFlags)] = &[
    ("errors", LogFlags::ERRORS),
    ("kills", LogFlags::KILLS),
    ("tkl", LogFlags::TKL),
    ("connects", LogFlags::CONNECTS),
    ("server-connects", LogFlags::SERVER_CONNECTS),
    ("kline", LogFlags::KLINE),
    ("oper", LogFlags::OPER),
];

pub fn log_flag_by_name(name: &str) -> Option<LogFlags> {
    LOG_FLAG_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

bitflags! {
    /// Sub-kind of a `tkl` exception: which TKL actions it shields a mask
    /// from, and whether the shield is network-wide.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct TklFlags: u32 {
        const KILL = 1 << 0;
        const ZAP = 1 << 1;
        const SHUN = 1 << 2;
        const GLOBAL = 1 << 3;
    }
}

/// Maps an `except tkl` type name to its flag set.
pub fn tkl_flags_by_name(name: &str) -> Option<TklFlags> {
    match name {
        "gline" => Some(TklFlags::KILL | TklFlags::GLOBAL),
        "gzline" => Some(TklFlags::ZAP | TklFlags::GLOBAL),
        "shun" => Some(TklFlags::SHUN | TklFlags::GLOBAL),
        "tkline" => Some(TklFlags::KILL),
        "tzline" => Some(TklFlags::ZAP),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_tables_are_exhaustive() {
        let mut from_names = OperFlags::empty();
        for (_, flag) in OPER_FLAG_NAMES {
            from_names |= *flag;
        }
        let mut from_chars = OperFlags::empty();
        for (_, flag) in OPER_FLAG_CHARS {
            from_chars |= *flag;
        }
        assert_eq!(from_names, OperFlags::all());
        assert_eq!(from_chars, OperFlags::all());
    }

    #[test]
    fn test_compact_oper_flags() {
        let flags = oper_flags_from_chars("oOr");
        assert!(flags.contains(OperFlags::LOCAL | OperFlags::GLOBAL | OperFlags::REHASH));
        assert!(!flags.contains(OperFlags::DIE));
        // unknown characters are skipped
        assert_eq!(oper_flags_from_chars("xyq7"), OperFlags::empty());
        assert_eq!(oper_flags_from_chars(""), OperFlags::empty());
    }

    #[test]
    fn test_tkl_names() {
        assert_eq!(
            tkl_flags_by_name("gline"),
            Some(TklFlags::KILL | TklFlags::GLOBAL)
        );
        assert_eq!(tkl_flags_by_name("tzline"), Some(TklFlags::ZAP));
        assert_eq!(tkl_flags_by_name("bogus"), None);
    }
}
