//! The process-wide configuration store.
//!
//! One value holds every record list plus the `me` and `drpass` singletons.
//! Only the committer mutates it; everything else goes through the lookup
//! methods, whose precedence and tie-break rules the rest of the daemon
//! depends on. All lookups are linear scans in insertion order, which is fine
//! for configuration-sized lists.

use serde::Serialize;

use crate::conf::records::*;
use crate::default_class;
use crate::mask::match_mask;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigStore {
    pub me: Option<MeRecord>,
    pub classes: Vec<ClassRecord>,
    pub admin: Vec<String>,
    pub drpass: Option<DrpassRecord>,
    pub ulines: Vec<UlineRecord>,
    pub tlds: Vec<TldRecord>,
    pub opers: Vec<OperRecord>,
    pub listeners: Vec<ListenerRecord>,
    pub allows: Vec<AllowRecord>,
    pub excepts: Vec<ExceptRecord>,
    pub vhosts: Vec<VhostRecord>,
    pub links: Vec<LinkRecord>,
    pub bans: Vec<BanRecord>,
    pub deny_dcc: Vec<DenyDccRecord>,
    pub deny_links: Vec<DenyLinkRecord>,
    pub deny_channels: Vec<DenyChannelRecord>,
    pub deny_versions: Vec<DenyVersionRecord>,
    pub allow_channels: Vec<AllowChannelRecord>,
    pub logs: Vec<LogRecord>,
    pub aliases: Vec<AliasRecord>,
    pub helps: Vec<HelpRecord>,
    pub includes: Vec<IncludeRecord>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// A fresh store. The built-in `default` class is always present at index
    /// zero so records naming a missing class have somewhere to land.
    pub fn new() -> Self {
        ConfigStore {
            me: None,
            classes: vec![default_class()],
            admin: Vec::new(),
            drpass: None,
            ulines: Vec::new(),
            tlds: Vec::new(),
            opers: Vec::new(),
            listeners: Vec::new(),
            allows: Vec::new(),
            excepts: Vec::new(),
            vhosts: Vec::new(),
            links: Vec::new(),
            bans: Vec::new(),
            deny_dcc: Vec::new(),
            deny_links: Vec::new(),
            deny_channels: Vec::new(),
            deny_versions: Vec::new(),
            allow_channels: Vec::new(),
            logs: Vec::new(),
            aliases: Vec::new(),
            helps: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// The class records naming a missing class fall back to.
    pub const DEFAULT_CLASS: ClassId = 0;

    /// JSONify the running configuration in a pretty way using serde.
    /// Credential material is skipped by the record definitions.
    pub fn as_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e:?}\"}}"))
    }

    // lookups

    /// Exact, case-sensitive class lookup.
    pub fn find_class(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub(crate) fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes.iter().position(|c| c.name == name)
    }

    /// Exact, case-sensitive oper lookup.
    pub fn find_oper(&self, name: &str) -> Option<&OperRecord> {
        self.opers.iter().find(|o| o.name == name)
    }

    /// First listener whose port matches and whose ip pattern-matches the
    /// argument in either direction.
    pub fn find_listen(&self, ipmask: &str, port: u16) -> Option<&ListenerRecord> {
        self.listeners
            .iter()
            .find(|l| l.port == port && (match_mask(&l.ip, ipmask) || match_mask(ipmask, &l.ip)))
    }

    pub(crate) fn listen_index(&self, ipmask: &str, port: u16) -> Option<usize> {
        self.listeners
            .iter()
            .position(|l| l.port == port && (match_mask(&l.ip, ipmask) || match_mask(ipmask, &l.ip)))
    }

    /// Case-insensitive exact server name lookup.
    pub fn find_uline(&self, servername: &str) -> Option<&UlineRecord> {
        self.ulines
            .iter()
            .find(|u| u.servername.eq_ignore_ascii_case(servername))
    }

    /// First exception of `kind` whose mask matches `host`.
    pub fn find_except(&self, host: &str, kind: ExceptKind) -> Option<&ExceptRecord> {
        self.excepts
            .iter()
            .find(|e| e.kind == kind && match_mask(&e.mask, host))
    }

    /// First tld block whose mask matches `host`.
    pub fn find_tld(&self, host: &str) -> Option<&TldRecord> {
        self.tlds.iter().find(|t| match_mask(&t.mask, host))
    }

    /// A link is usable when its server name and username both match, and
    /// either the hostname or the ip does.
    pub fn find_link(
        &self,
        username: &str,
        hostname: &str,
        ip: &str,
        servername: &str,
    ) -> Option<&LinkRecord> {
        self.links.iter().find(|l| {
            match_mask(&l.servername, servername)
                && match_mask(&l.username, username)
                && (match_mask(&l.hostname, hostname) || match_mask(&l.hostname, ip))
        })
    }

    /// First matching ban of `kind`. A user ban is suppressed when an
    /// `except ban` also matches the host; the except list is only consulted
    /// once a ban has actually matched.
    pub fn find_ban(&self, host: &str, kind: BanKind) -> Option<&BanRecord> {
        for ban in &self.bans {
            if ban.kind == kind && match_mask(&ban.mask, host) {
                if kind == BanKind::User && self.find_except(host, ExceptKind::Ban).is_some() {
                    return None;
                }
                return Some(ban);
            }
        }
        None
    }

    /// Like [Self::find_ban] but additionally filtered by origin, and the
    /// except check applies to every kind.
    pub fn find_ban_ex(&self, host: &str, kind: BanKind, origin: BanOrigin) -> Option<&BanRecord> {
        for ban in &self.bans {
            if ban.kind == kind && ban.origin == origin && match_mask(&ban.mask, host) {
                if self.find_except(host, ExceptKind::Ban).is_some() {
                    return None;
                }
                return Some(ban);
            }
        }
        None
    }

    /// Returns the deny record iff some deny pattern matches the channel and
    /// no allow pattern does.
    pub fn find_channel_allowed(&self, name: &str) -> Option<&DenyChannelRecord> {
        let denied = self
            .deny_channels
            .iter()
            .find(|d| match_mask(&d.channel, name))?;
        if self
            .allow_channels
            .iter()
            .any(|a| match_mask(&a.channel, name))
        {
            None
        } else {
            Some(denied)
        }
    }

    /// First DCC deny whose filename mask matches.
    pub fn find_deny_dcc(&self, filename: &str) -> Option<&DenyDccRecord> {
        self.deny_dcc
            .iter()
            .find(|d| match_mask(&d.filename, filename))
    }

    /// Case-insensitive alias lookup.
    pub fn find_alias(&self, name: &str) -> Option<&AliasRecord> {
        self.aliases
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Case-sensitive lookup by vhost login.
    pub fn find_vhost(&self, login: &str) -> Option<&VhostRecord> {
        self.vhosts.iter().find(|v| v.login == login)
    }

    pub fn find_help(&self, name: &str) -> Option<&HelpRecord> {
        self.helps.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }
}
