//! The commit phase.
//!
//! [config_run] walks the parse tree a second time and builds typed records
//! in the store. This is the only place global configuration state is
//! mutated, and it only runs after validation reported zero errors — so a
//! missing required entry here is a program bug, surfaced as
//! [RookdError::Internal], not a user error.
//!
//! Records keyed by identity (class by name, oper by name, listener by
//! ip+port, vhost by login) are updated in place so references held by live
//! connections stay valid; everything else is appended.

use crate::auth;
use crate::conf::diag::Diag;
use crate::conf::flags::{self, LinkFlags, ListenerFlags, LogFlags, OperFlags};
use crate::conf::loader::LoadedConf;
use crate::conf::parser::{ConfigFile, EntryId};
use crate::conf::records::*;
use crate::conf::registry::find_command;
use crate::conf::store::ConfigStore;
use crate::conf::validate::split_ip_port;
use crate::error::RookdError;
use crate::motd;

/// Runs every committer over every parsed file, in parse order.
pub fn config_run(
    store: &mut ConfigStore,
    loaded: &LoadedConf,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    for cf in &loaded.files {
        for &id in &cf.roots {
            if let Some(cmd) = find_command(&cf.entry(id).name) {
                if let Some(apply) = cmd.apply {
                    apply(store, cf, id, diag)?;
                }
            }
        }
    }
    store.includes = loaded.includes.clone();
    Ok(())
}

fn internal(cf: &ConfigFile, ce: EntryId, what: &str) -> RookdError {
    RookdError::Internal(format!("{}: {} vanished after validation", cf.loc(ce), what))
}

/// The entry's own scalar value; validation guaranteed it.
fn own_value<'a>(cf: &'a ConfigFile, ce: EntryId) -> Result<&'a str, RookdError> {
    cf.entry(ce)
        .value
        .as_deref()
        .ok_or_else(|| internal(cf, ce, "value"))
}

fn required(cf: &ConfigFile, ce: EntryId, name: &str) -> Result<EntryId, RookdError> {
    cf.find_child(ce, name).ok_or_else(|| internal(cf, ce, name))
}

fn required_value<'a>(
    cf: &'a ConfigFile,
    ce: EntryId,
    name: &str,
) -> Result<&'a str, RookdError> {
    let cep = required(cf, ce, name)?;
    cf.entry(cep)
        .value
        .as_deref()
        .ok_or_else(|| internal(cf, ce, name))
}

fn number<T: std::str::FromStr>(
    cf: &ConfigFile,
    ce: EntryId,
    what: &str,
    value: &str,
) -> Result<T, RookdError> {
    value
        .parse()
        .map_err(|_| RookdError::Internal(format!("{}: bad {} '{}'", cf.loc(ce), what, value)))
}

/// Resolves a class reference, falling back to `default` with a status line
/// when the named class was never defined.
fn resolve_class(
    store: &ConfigStore,
    cf: &ConfigFile,
    cep: EntryId,
    dir: &str,
    name: &str,
    diag: &mut Diag,
) -> ClassId {
    match store.class_id(name) {
        Some(id) => id,
        None => {
            diag.status(format!(
                "{}: illegal {}::class, unknown class '{}' using default of class 'default'",
                cf.loc(cep),
                dir,
                name
            ));
            ConfigStore::DEFAULT_CLASS
        }
    }
}

fn auth_convert(cf: &ConfigFile, cep: EntryId) -> Result<crate::auth::AuthDescriptor, RookdError> {
    auth::convert(cf, cep).map_err(|e| RookdError::Internal(format!("{}: {}", cf.loc(cep), e)))
}

pub(crate) fn conf_me(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let name = required_value(cf, ce, "name")?;
    let info = required_value(cf, ce, "info")?;
    let numeric_entry = required(cf, ce, "numeric")?;
    let numeric_value = required_value(cf, ce, "numeric")?;
    let numeric: u8 = number(cf, numeric_entry, "me::numeric", numeric_value)?;

    match &mut store.me {
        Some(me) => {
            me.name = name.to_string();
            me.info = info.to_string();
            me.numeric = numeric;
        }
        None => {
            store.me = Some(MeRecord {
                name: name.to_string(),
                info: info.to_string(),
                numeric,
            });
        }
    }
    Ok(())
}

pub(crate) fn conf_class(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let name = own_value(cf, ce)?;
    let pingfreq: u32 = number(cf, ce, "class::pingfreq", required_value(cf, ce, "pingfreq")?)?;
    let maxclients: u32 =
        number(cf, ce, "class::maxclients", required_value(cf, ce, "maxclients")?)?;
    let sendq: u64 = number(cf, ce, "class::sendq", required_value(cf, ce, "sendq")?)?;
    let connfreq = match cf.child_value(ce, "connfreq") {
        Some(value) => Some(number(cf, ce, "class::connfreq", value)?),
        None => None,
    };

    match store.classes.iter_mut().find(|c| c.name == name) {
        Some(class) => {
            class.pingfreq = pingfreq;
            class.maxclients = maxclients;
            class.sendq = sendq;
            class.connfreq = connfreq;
        }
        None => store.classes.push(ClassRecord {
            name: name.to_string(),
            pingfreq,
            maxclients,
            sendq,
            connfreq,
            clients: 0,
        }),
    }
    Ok(())
}

pub(crate) fn conf_oper(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let name = own_value(cf, ce)?;
    let password = required(cf, ce, "password")?;
    let auth = auth_convert(cf, password)?;
    let class_entry = required(cf, ce, "class")?;
    let class_name = required_value(cf, ce, "class")?;
    let class = resolve_class(store, cf, class_entry, "oper", class_name, diag);

    let oflags = match cf.find_child(ce, "flags") {
        None => OperFlags::empty(),
        Some(fe) if cf.children(fe).is_empty() => {
            // legacy compact form; unknown characters are skipped
            flags::oper_flags_from_chars(cf.entry(fe).value.as_deref().unwrap_or(""))
        }
        Some(fe) => {
            let mut oflags = OperFlags::empty();
            for &cepp in cf.children(fe) {
                if let Some(flag) = flags::oper_flag_by_name(&cf.entry(cepp).name) {
                    oflags |= flag;
                }
            }
            oflags
        }
    };

    let swhois = cf.child_value(ce, "swhois").map(str::to_string);
    let snomask = cf.child_value(ce, "snomask").map(str::to_string);

    let from_entry = required(cf, ce, "from")?;
    let from: Vec<String> = cf
        .children(from_entry)
        .iter()
        .filter(|&&c| cf.entry(c).name == "userhost")
        .filter_map(|&c| cf.entry(c).value.clone())
        .collect();

    match store.opers.iter_mut().find(|o| o.name == name) {
        Some(oper) => {
            // the old auth descriptor is released by the assignment
            oper.auth = auth;
            oper.class = class;
            oper.flags = oflags;
            oper.swhois = swhois;
            oper.snomask = snomask;
            oper.from = from;
        }
        None => store.opers.push(OperRecord {
            name: name.to_string(),
            auth,
            class,
            flags: oflags,
            swhois,
            snomask,
            from,
        }),
    }
    Ok(())
}

#[cfg_attr(feature = "ssl", allow(unused_variables))]
fn listen_options(cf: &ConfigFile, cep: EntryId, diag: &mut Diag) -> ListenerFlags {
    let mut opts = ListenerFlags::empty();
    for &cepp in cf.children(cep) {
        if let Some(flag) = flags::listener_flag_by_name(&cf.entry(cepp).name) {
            opts |= flag;
        }
    }
    #[cfg(not(feature = "ssl"))]
    if opts.contains(ListenerFlags::SSL) {
        diag.status(format!(
            "{}: listen with SSL flag enabled on a non SSL compile",
            cf.loc(cep)
        ));
        opts.remove(ListenerFlags::SSL);
    }
    opts
}

pub(crate) fn conf_listen(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let value = own_value(cf, ce)?;
    let (ip, port) = split_ip_port(value);
    let ip = ip
        .filter(|ip| !ip.is_empty())
        .ok_or_else(|| internal(cf, ce, "listen ip"))?;
    let port: u16 = number(
        cf,
        ce,
        "listen port",
        port.ok_or_else(|| internal(cf, ce, "listen port"))?,
    )?;

    // options are rebuilt from zero whenever an options block is present;
    // an update without one keeps the old flags
    let mut new_options: Option<ListenerFlags> = None;
    for &cep in cf.children(ce) {
        if cf.entry(cep).name == "options" {
            new_options = Some(listen_options(cf, cep, diag));
        }
    }

    match store.listen_index(ip, port) {
        Some(idx) => {
            let listener = &mut store.listeners[idx];
            if let Some(options) = new_options {
                listener.options = options;
            }
            // bound state and attached clients survive the rehash
            listener.temporary = false;
        }
        None => store.listeners.push(ListenerRecord {
            ip: ip.to_string(),
            port,
            options: new_options.unwrap_or(ListenerFlags::empty()),
            bound: false,
            clients: 0,
            temporary: false,
        }),
    }
    Ok(())
}

pub(crate) fn conf_allow(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    if let Some(value) = cf.entry(ce).value.as_deref() {
        if value == "channel" {
            return conf_allow_channel(store, cf, ce, diag);
        }
        return Err(internal(cf, ce, "allow type"));
    }

    let ip = required_value(cf, ce, "ip")?;
    let hostname = required_value(cf, ce, "hostname")?;
    let auth = auth_convert(cf, required(cf, ce, "password")?)?;
    let class_entry = required(cf, ce, "class")?;
    let class_name = required_value(cf, ce, "class")?;
    let class = resolve_class(store, cf, class_entry, "allow", class_name, diag);

    let maxperip = match cf.child_value(ce, "maxperip") {
        Some(value) => Some(number(cf, ce, "allow::maxperip", value)?),
        None => None,
    };
    let redirect_server = cf.child_value(ce, "redirect-server").map(str::to_string);
    let redirect_port = match cf.child_value(ce, "redirect-port") {
        Some(value) => Some(number(cf, ce, "allow::redirect-port", value)?),
        None => None,
    };

    let mut noident = false;
    let mut useip = false;
    if let Some(options) = cf.find_child(ce, "options") {
        for &cepp in cf.children(options) {
            match cf.entry(cepp).name.as_str() {
                "noident" => noident = true,
                "useip" => useip = true,
                _ => {}
            }
        }
    }

    store.allows.push(AllowRecord {
        ip: ip.to_string(),
        hostname: hostname.to_string(),
        auth,
        class,
        maxperip,
        redirect_server,
        redirect_port,
        noident,
        useip,
    });
    Ok(())
}

pub(crate) fn conf_allow_channel(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name == "channel" {
            if let Some(channel) = &entry.value {
                store.allow_channels.push(AllowChannelRecord {
                    channel: channel.clone(),
                });
            }
        }
    }
    Ok(())
}

pub(crate) fn conf_except(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let value = own_value(cf, ce)?;
    match value {
        "ban" | "scan" => {
            let kind = if value == "ban" {
                ExceptKind::Ban
            } else {
                ExceptKind::Scan
            };
            for &cep in cf.children(ce) {
                let entry = cf.entry(cep);
                if entry.name == "mask" {
                    if let Some(mask) = &entry.value {
                        store.excepts.push(ExceptRecord {
                            mask: mask.clone(),
                            kind,
                            tkl: None,
                        });
                    }
                }
            }
        }
        "tkl" => {
            let mask = required_value(cf, ce, "mask")?;
            let typename = required_value(cf, ce, "type")?;
            let tkl = flags::tkl_flags_by_name(typename)
                .ok_or_else(|| internal(cf, ce, "except tkl type"))?;
            store.excepts.push(ExceptRecord {
                mask: mask.to_string(),
                kind: ExceptKind::Tkl,
                tkl: Some(tkl),
            });
        }
        _ => return Err(internal(cf, ce, "except type")),
    }
    Ok(())
}

pub(crate) fn conf_vhost(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let vhost_value = required_value(cf, ce, "vhost")?;
    let (virtuser, virthost) = match vhost_value.split_once('@') {
        Some((user, host)) => (Some(user.to_string()), host.to_string()),
        None => (None, vhost_value.to_string()),
    };
    let login = required_value(cf, ce, "login")?;
    let auth = auth_convert(cf, required(cf, ce, "password")?)?;
    let from_entry = required(cf, ce, "from")?;
    let from: Vec<String> = cf
        .children(from_entry)
        .iter()
        .filter(|&&c| cf.entry(c).name == "userhost")
        .filter_map(|&c| cf.entry(c).value.clone())
        .collect();
    let swhois = cf.child_value(ce, "swhois").map(str::to_string);

    match store.vhosts.iter_mut().find(|v| v.login == login) {
        Some(vhost) => {
            vhost.virtuser = virtuser;
            vhost.virthost = virthost;
            vhost.auth = auth;
            vhost.from = from;
            vhost.swhois = swhois;
        }
        None => store.vhosts.push(VhostRecord {
            virtuser,
            virthost,
            login: login.to_string(),
            auth,
            from,
            swhois,
        }),
    }
    Ok(())
}

pub(crate) fn conf_tld(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let mask = required_value(cf, ce, "mask")?;
    let motd_file = required_value(cf, ce, "motd")?;
    let rules_file = required_value(cf, ce, "rules")?;

    // the files passed an open check at validation, but may have vanished
    // since; an empty cache is better than taking the daemon down
    let (motd, motd_read) = match motd::read_text_file(motd_file) {
        Ok(read) => read,
        Err(err) => {
            diag.status(format!("{}: tld::motd: {}: {}", cf.loc(ce), motd_file, err));
            (Vec::new(), chrono::Utc::now())
        }
    };
    let (rules, _) = match motd::read_text_file(rules_file) {
        Ok(read) => read,
        Err(err) => {
            diag.status(format!(
                "{}: tld::rules: {}: {}",
                cf.loc(ce),
                rules_file,
                err
            ));
            (Vec::new(), chrono::Utc::now())
        }
    };

    store.tlds.push(TldRecord {
        mask: mask.to_string(),
        motd_file: motd_file.to_string(),
        motd,
        motd_read,
        rules_file: rules_file.to_string(),
        rules,
        channel: cf.child_value(ce, "channel").map(str::to_string),
    });
    Ok(())
}

pub(crate) fn conf_ulines(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if !entry.name.is_empty() {
            store.ulines.push(UlineRecord {
                servername: entry.name.clone(),
            });
        }
    }
    Ok(())
}

pub(crate) fn conf_admin(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if !entry.name.is_empty() {
            store.admin.push(entry.name.clone());
        }
    }
    Ok(())
}

pub(crate) fn conf_drpass(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let drpass = store.drpass.get_or_insert(DrpassRecord {
        restart: None,
        die: None,
    });
    for &cep in cf.children(ce) {
        match cf.entry(cep).name.as_str() {
            // the previous descriptor is dropped by the assignment
            "restart" => drpass.restart = Some(auth_convert(cf, cep)?),
            "die" => drpass.die = Some(auth_convert(cf, cep)?),
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn conf_ban(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let kind = BanKind::from_name(own_value(cf, ce)?)
        .ok_or_else(|| internal(cf, ce, "ban type"))?;
    store.bans.push(BanRecord {
        mask: required_value(cf, ce, "mask")?.to_string(),
        reason: required_value(cf, ce, "reason")?.to_string(),
        kind,
        origin: BanOrigin::Config,
    });
    Ok(())
}

pub(crate) fn conf_link(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let servername = own_value(cf, ce)?;
    let class_entry = required(cf, ce, "class")?;
    let class_name = required_value(cf, ce, "class")?;
    let class = resolve_class(store, cf, class_entry, "link", class_name, diag);

    let mut options = LinkFlags::empty();
    if let Some(opts) = cf.find_child(ce, "options") {
        for &cepp in cf.children(opts) {
            if let Some(flag) = flags::link_flag_by_name(&cf.entry(cepp).name) {
                options |= flag;
            }
        }
    }

    store.links.push(LinkRecord {
        servername: servername.to_string(),
        username: required_value(cf, ce, "username")?.to_string(),
        hostname: required_value(cf, ce, "hostname")?.to_string(),
        bind_ip: required_value(cf, ce, "bind-ip")?.to_string(),
        connect_password: required_value(cf, ce, "password-connect")?.to_string(),
        recv_auth: auth_convert(cf, required(cf, ce, "password-receive")?)?,
        hub: cf.child_value(ce, "hub").map(str::to_string),
        leaf: cf.child_value(ce, "leaf").map(str::to_string),
        port: number(cf, ce, "link::port", required_value(cf, ce, "port")?)?,
        options,
        class,
        ciphers: cf.child_value(ce, "ciphers").map(str::to_string),
    });
    Ok(())
}

pub(crate) fn conf_log(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let file = own_value(cf, ce)?;
    let mut logflags = LogFlags::empty();
    if let Some(fe) = cf.find_child(ce, "flags") {
        for &cepp in cf.children(fe) {
            if let Some(flag) = flags::log_flag_by_name(&cf.entry(cepp).name) {
                logflags |= flag;
            }
        }
    }
    store.logs.push(LogRecord {
        file: file.to_string(),
        flags: logflags,
    });
    Ok(())
}

pub(crate) fn conf_alias(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let name = own_value(cf, ce)?;
    let target = cf
        .child_value(ce, "target")
        .unwrap_or(name)
        .to_string();
    let kind = match cf.child_value(ce, "type") {
        Some(kind) => {
            AliasKind::from_name(kind).ok_or_else(|| internal(cf, ce, "alias type"))?
        }
        None => AliasKind::Normal,
    };
    store.aliases.push(AliasRecord {
        name: name.to_string(),
        target,
        kind,
    });
    Ok(())
}

pub(crate) fn conf_help(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    let name = own_value(cf, ce)?;
    let lines: Vec<String> = cf
        .children(ce)
        .iter()
        .map(|&c| cf.entry(c).name.clone())
        .filter(|l| !l.is_empty())
        .collect();
    store.helps.push(HelpRecord {
        name: name.to_string(),
        lines,
    });
    Ok(())
}

pub(crate) fn conf_deny(
    store: &mut ConfigStore,
    cf: &ConfigFile,
    ce: EntryId,
    _diag: &mut Diag,
) -> Result<(), RookdError> {
    match own_value(cf, ce)? {
        "dcc" => store.deny_dcc.push(DenyDccRecord {
            filename: required_value(cf, ce, "filename")?.to_string(),
            reason: required_value(cf, ce, "reason")?.to_string(),
        }),
        "link" => {
            let kind = match required_value(cf, ce, "type")? {
                "all" => DenyLinkKind::All,
                "auto" => DenyLinkKind::Auto,
                _ => return Err(internal(cf, ce, "deny link type")),
            };
            store.deny_links.push(DenyLinkRecord {
                mask: required_value(cf, ce, "mask")?.to_string(),
                rule: required_value(cf, ce, "rule")?.to_string(),
                kind,
            });
        }
        "channel" => store.deny_channels.push(DenyChannelRecord {
            channel: required_value(cf, ce, "channel")?.to_string(),
            reason: required_value(cf, ce, "reason")?.to_string(),
        }),
        "version" => store.deny_versions.push(DenyVersionRecord {
            mask: required_value(cf, ce, "mask")?.to_string(),
            version: required_value(cf, ce, "version")?.to_string(),
            flags: required_value(cf, ce, "flags")?.to_string(),
        }),
        _ => return Err(internal(cf, ce, "deny type")),
    }
    Ok(())
}
