//! Resolver bootstrap.
//!
//! Seeds the daemon's DNS defaults — default domain, search list, nameserver
//! addresses, sortlist and options — from the first source that provides
//! them: the `LOCALDOMAIN` environment override, then the platform source
//! (`/etc/resolv.conf` on POSIX, the registry on Windows), then values
//! derived from the hostname. `RES_OPTIONS` is applied last. Initialization
//! happens once per process; later calls get the same state back.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::OnceLock;

use bitflags::bitflags;
use log::debug;
use serde::Serialize;

/// Maximum nameservers carried in the state.
pub const MAXNS: usize = 3;
/// Maximum entries in the search list.
pub const MAXDNSRCH: usize = 6;
/// Maximum *derived* search entries beyond the default domain itself.
pub const MAXDFLSRCH: usize = 3;
/// Maximum sortlist address/mask pairs.
pub const MAXRESOLVSORT: usize = 10;
/// Minimum number of dots a derived search suffix keeps.
pub const LOCALDOMAINPARTS: usize = 2;
/// Ceiling for the `ndots:` option.
pub const RES_MAXNDOTS: u32 = 15;
pub const NAMESERVER_PORT: u16 = 53;
/// Seconds between retransmits, and retransmit count.
pub const RES_TIMEOUT: u32 = 5;
pub const RES_RETRY: u32 = 4;

/// Default resolver configuration file on POSIX systems.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct ResOptions: u32 {
        /// State has been initialized.
        const INIT = 1 << 0;
        const DEBUG = 1 << 1;
        const USE_INET6 = 1 << 2;
    }
}

/// One sortlist entry. The mask defaults to the classful mask of the address
/// when the configuration doesn't name one. Both sides are kept in network
/// byte order by construction ([Ipv4Addr] is octet-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortPair {
    pub addr: Ipv4Addr,
    pub mask: Ipv4Addr,
}

/// The canonical resolver state record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverState {
    /// Default domain appended to unqualified names.
    pub defdname: String,
    /// Domains tried, in order, when resolving unqualified names.
    pub dnsrch: Vec<String>,
    /// Nameservers queried, in order.
    pub nameservers: Vec<SocketAddrV4>,
    pub sortlist: Vec<SortPair>,
    pub ndots: u32,
    pub options: ResOptions,
    /// Seed for DNS query ids.
    pub id: u16,
    pub retrans: u32,
    pub retry: u32,
}

impl Default for ResolverState {
    fn default() -> Self {
        ResolverState {
            defdname: String::new(),
            dnsrch: Vec::new(),
            // reachable the way a local static route makes 0.0.0.0 reachable;
            // a real server belongs in the configuration file
            nameservers: vec![SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, NAMESERVER_PORT)],
            sortlist: Vec::new(),
            ndots: 1,
            options: ResOptions::empty(),
            id: 0,
            retrans: RES_TIMEOUT,
            retry: RES_RETRY,
        }
    }
}

/// The inputs [build] works from, separated from the environment so tests
/// can drive every combination.
#[derive(Debug, Default, Clone)]
pub struct ResolverSources<'a> {
    /// Contents of `LOCALDOMAIN`, if set.
    pub localdomain: Option<&'a str>,
    /// Contents of the resolver configuration file, if readable.
    pub conf: Option<&'a str>,
    /// The machine's hostname, for the derived default domain.
    pub hostname: Option<&'a str>,
    /// Contents of `RES_OPTIONS`, if set.
    pub res_options: Option<&'a str>,
}

/// Builds a [ResolverState] from explicit sources. Field priority follows the
/// classic resolver: environment beats file beats hostname derivation.
pub fn build(sources: &ResolverSources) -> ResolverState {
    let mut state = ResolverState::default();
    let mut haveenv = false;
    let mut havesearch = false;

    if let Some(env) = sources.localdomain {
        let tokens: Vec<&str> = split_ws(env);
        if let Some(first) = tokens.first() {
            state.defdname = first.to_string();
            state.dnsrch = tokens
                .iter()
                .take(MAXDNSRCH)
                .map(|t| t.to_string())
                .collect();
            haveenv = true;
            // a lone domain still leaves the search list to be derived
            havesearch = tokens.len() > 1;
        }
    }

    if let Some(conf) = sources.conf {
        parse_conf_file(conf, &mut state, haveenv, &mut havesearch);
    }

    if state.defdname.is_empty() {
        if let Some(hostname) = sources.hostname {
            // strip the first label; what's left is the local domain
            if let Some((_, domain)) = hostname.split_once('.') {
                state.defdname = domain.to_string();
            }
        }
    }

    if !havesearch {
        derive_search_list(&mut state);
    }

    if let Some(opts) = sources.res_options {
        set_options(&mut state, opts, "env");
    }

    if state.id == 0 {
        state.id = random_id();
    }
    state.options |= ResOptions::INIT;

    debug!(
        "resolver init: domain \"{}\", {} nameserver(s), search {:?}",
        state.defdname,
        state.nameservers.len(),
        state.dnsrch
    );
    state
}

/// Parses the resolver configuration file. `domain` and `search` lines are
/// skipped entirely when the environment already provided them.
fn parse_conf_file(conf: &str, state: &mut ResolverState, haveenv: bool, havesearch: &mut bool) {
    let mut nameservers: Vec<SocketAddrV4> = Vec::new();

    for line in conf.lines() {
        if line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let Some((keyword, rest)) = split_keyword(line) else {
            continue;
        };
        match keyword {
            "domain" => {
                if haveenv {
                    continue;
                }
                if let Some(first) = split_ws(rest).first() {
                    state.defdname = first.to_string();
                    *havesearch = false;
                }
            }
            "search" => {
                if haveenv {
                    continue;
                }
                let tokens = split_ws(rest);
                if let Some(first) = tokens.first() {
                    state.defdname = first.to_string();
                    state.dnsrch = tokens
                        .iter()
                        .take(MAXDNSRCH)
                        .map(|t| t.to_string())
                        .collect();
                    *havesearch = true;
                }
            }
            "nameserver" => {
                if nameservers.len() >= MAXNS {
                    continue;
                }
                if let Some(first) = split_ws(rest).first() {
                    if let Ok(addr) = first.parse::<Ipv4Addr>() {
                        nameservers.push(SocketAddrV4::new(addr, NAMESERVER_PORT));
                    }
                }
            }
            "sortlist" => {
                for token in split_ws(rest) {
                    if state.sortlist.len() >= MAXRESOLVSORT {
                        break;
                    }
                    if token.starts_with(';') {
                        break;
                    }
                    if let Some(pair) = parse_sort_pair(token) {
                        state.sortlist.push(pair);
                    }
                }
            }
            "options" => {
                set_options(state, rest, "conf");
            }
            _ => {}
        }
    }

    if !nameservers.is_empty() {
        state.nameservers = nameservers;
    }
}

/// `addr`, `addr/mask` or `addr&mask`; a missing mask falls back to the
/// classful mask of the address.
fn parse_sort_pair(token: &str) -> Option<SortPair> {
    let (addr_part, mask_part) = match token.find(['/', '&']) {
        Some(idx) => (&token[..idx], Some(&token[idx + 1..])),
        None => (token, None),
    };
    let addr: Ipv4Addr = addr_part.parse().ok()?;
    let mask = mask_part
        .and_then(|m| m.parse::<Ipv4Addr>().ok())
        .unwrap_or_else(|| classful_mask(addr));
    Some(SortPair { addr, mask })
}

/// The pre-CIDR class A/B/C netmask of an address.
pub fn classful_mask(addr: Ipv4Addr) -> Ipv4Addr {
    let octet = addr.octets()[0];
    if octet < 128 {
        Ipv4Addr::new(255, 0, 0, 0)
    } else if octet < 192 {
        Ipv4Addr::new(255, 255, 0, 0)
    } else {
        Ipv4Addr::new(255, 255, 255, 0)
    }
}

/// With no explicit search list, successive parent domains of the default
/// domain are searched, stopping before they get too short.
fn derive_search_list(state: &mut ResolverState) {
    state.dnsrch = vec![state.defdname.clone()];
    let mut dots = state.defdname.matches('.').count();
    let mut rest = state.defdname.as_str();
    while state.dnsrch.len() < 1 + MAXDFLSRCH && dots >= LOCALDOMAINPARTS {
        match rest.split_once('.') {
            Some((_, suffix)) => {
                state.dnsrch.push(suffix.to_string());
                rest = suffix;
                dots -= 1;
            }
            None => break,
        }
    }
}

/// Applies a whitespace-separated list of option tokens: `ndots:N` (clamped),
/// `debug`, `inet6`. Unknown tokens are ignored.
fn set_options(state: &mut ResolverState, options: &str, source: &str) {
    debug!("resolver options from {source}: {options}");
    for token in split_ws(options) {
        if let Some(value) = token.strip_prefix("ndots:") {
            if let Ok(n) = value.parse::<u32>() {
                state.ndots = n.min(RES_MAXNDOTS);
            }
        } else if token == "debug" {
            state.options |= ResOptions::DEBUG;
        } else if token == "inet6" {
            state.options |= ResOptions::USE_INET6;
        }
    }
}

fn split_ws(input: &str) -> Vec<&str> {
    // the environment value may carry a trailing newline; nothing past it
    // counts
    let input = input.split('\n').next().unwrap_or("");
    input
        .split([' ', '\t'])
        .filter(|t| !t.is_empty())
        .collect()
}

/// Splits `keyword rest-of-line`, requiring real whitespace after the
/// keyword.
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let idx = line.find([' ', '\t'])?;
    Some((&line[..idx], &line[idx + 1..]))
}

/// 16-bit query-id seed: time-of-day microseconds mixed with the pid.
fn random_id() -> u16 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let micros = now.subsec_micros() as u64;
    let secs = now.as_secs();
    (0xffff & (secs ^ micros ^ std::process::id() as u64)) as u16
}

static RESOLVER: OnceLock<ResolverState> = OnceLock::new();

/// Initializes the process-wide resolver state from the real environment and
/// platform sources. Safe to call more than once; only the first call does
/// any work.
pub fn init() -> &'static ResolverState {
    RESOLVER.get_or_init(|| {
        let localdomain = std::env::var("LOCALDOMAIN").ok();
        let res_options = std::env::var("RES_OPTIONS").ok();
        let conf = platform_conf();
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        build(&ResolverSources {
            localdomain: localdomain.as_deref(),
            conf: conf.as_deref(),
            hostname: Some(&hostname),
            res_options: res_options.as_deref(),
        })
    })
}

#[cfg(not(windows))]
fn platform_conf() -> Option<String> {
    std::fs::read_to_string(RESOLV_CONF).ok()
}

/// On Windows the resolver settings live in the registry. The values are
/// rendered into resolv.conf syntax so the rest of the bootstrap is shared
/// with POSIX; domain, search list and nameservers each get their own buffer.
#[cfg(windows)]
fn platform_conf() -> Option<String> {
    use winreg::RegKey;
    use winreg::enums::HKEY_LOCAL_MACHINE;

    const NT_PARAMS: &str = "System\\CurrentControlSet\\Services\\Tcpip\\Parameters";
    const KEY_9X: &str = "System\\CurrentControlSet\\Services\\VxD\\MSTCP";

    fn get_value(key: &RegKey, name: &str) -> Option<String> {
        key.get_value::<String, _>(name)
            .ok()
            .filter(|v| !v.is_empty())
    }

    /// Tries `name`, then `Dhcp<name>`, then both again under each
    /// Interfaces sub-key.
    fn nt_value(params: &RegKey, name: &str) -> Option<String> {
        let dhcp = format!("Dhcp{name}");
        if let Some(v) = get_value(params, name).or_else(|| get_value(params, &dhcp)) {
            return Some(v);
        }
        let interfaces = params.open_subkey("Interfaces").ok()?;
        for sub in interfaces.enum_keys().flatten() {
            if let Ok(iface) = interfaces.open_subkey(&sub) {
                if let Some(v) = get_value(&iface, name).or_else(|| get_value(&iface, &dhcp)) {
                    return Some(v);
                }
            }
        }
        None
    }

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let mut domain = None;
    let mut search = None;
    let mut nameserver = None;

    if let Ok(params) = hklm.open_subkey(NT_PARAMS) {
        domain = nt_value(&params, "Domain");
        // NT separates lists with spaces
        search = nt_value(&params, "SearchList");
        nameserver = nt_value(&params, "NameServer");
    } else if let Ok(mstcp) = hklm.open_subkey(KEY_9X) {
        domain = get_value(&mstcp, "Domain");
        // 9x separates lists with commas
        search = get_value(&mstcp, "SearchList").map(|v| v.replace(',', " "));
        nameserver = get_value(&mstcp, "NameServer").map(|v| v.replace(',', " "));
    }

    if domain.is_none() && search.is_none() && nameserver.is_none() {
        return None;
    }
    let mut out = String::new();
    if let Some(domain) = domain {
        out.push_str(&format!("domain {domain}\n"));
    }
    if let Some(search) = search {
        out.push_str(&format!("search {search}\n"));
    }
    if let Some(servers) = nameserver {
        for server in servers.split([' ', ',']).filter(|s| !s.is_empty()) {
            out.push_str(&format!("nameserver {server}\n"));
        }
    }
    Some(out)
}
