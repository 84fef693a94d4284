//! Per-directive semantic validation.
//!
//! Validators are pure: they read the parse tree and report problems through
//! the diagnostic sink, and nothing else. [config_test] walks every parsed
//! file's top-level entries in parse order and succeeds only when the error
//! count stays at zero — which is the committer's licence to run.

use crate::REALLEN;
use crate::auth;
use crate::conf::diag::Diag;
use crate::conf::flags;
use crate::conf::loader::LoadedConf;
use crate::conf::parser::{ConfigFile, EntryId};
use crate::conf::records::{AliasKind, BanKind};
use crate::conf::registry::find_command;
use crate::error::RookdError;

/// Walks every file and runs the registered validator for each top-level
/// entry. Returns `Err` when any error was reported, after emitting the
/// `N errors encountered` summary.
pub fn config_test(loaded: &LoadedConf, diag: &mut Diag) -> Result<(), RookdError> {
    let before = diag.error_count();
    for cf in &loaded.files {
        diag.status(format!("Testing {}", cf.filename));
        for &id in &cf.roots {
            let entry = cf.entry(id);
            if entry.name.is_empty() {
                diag.error(format!("{}: blank directive name", cf.loc(id)));
                continue;
            }
            match find_command(&entry.name) {
                Some(cmd) => (cmd.test)(cf, id, diag),
                None => diag.error(format!(
                    "{}: unknown directive {}",
                    cf.loc(id),
                    entry.name
                )),
            }
        }
    }
    let errors = diag.error_count() - before;
    if errors > 0 {
        diag.summary(format!("{errors} errors encountered"));
        Err(RookdError::Validation(errors))
    } else {
        Ok(())
    }
}

/// Splits a `listen` value into ip and port parts. Accepted shapes are
/// `ip:port`, `[ipv6]:port` and a bare port (which implies ip `*`). A
/// bracketed value with no closing `]` yields the whole value as the ip and
/// no port, which validation then rejects.
pub(crate) fn split_ip_port(value: &str) -> (Option<&str>, Option<&str>) {
    if let Some(rest) = value.strip_prefix('[') {
        match rest.find(']') {
            Some(close) => {
                let after = &rest[close + 1..];
                (Some(&rest[..close]), after.strip_prefix(':'))
            }
            None => (Some(value), None),
        }
    } else if let Some(colon) = value.find(':') {
        (Some(&value[..colon]), Some(&value[colon + 1..]))
    } else if value
        .parse::<i64>()
        .map(|n| n.to_string() == value)
        .unwrap_or(false)
    {
        (Some("*"), Some(value))
    } else {
        (None, None)
    }
}

/// Requires `dir::name` to exist with a value; reports otherwise.
fn require_child_value(
    cf: &ConfigFile,
    ce: EntryId,
    dir: &str,
    name: &str,
    diag: &mut Diag,
) -> bool {
    match cf.find_child(ce, name) {
        None => {
            diag.error(format!("{}: {}::{} missing", cf.loc(ce), dir, name));
            false
        }
        Some(cep) => {
            if cf.entry(cep).value.is_none() {
                diag.error(format!(
                    "{}: {}::{} without contents",
                    cf.loc(cep),
                    dir,
                    name
                ));
                false
            } else {
                true
            }
        }
    }
}

/// Walks the children of `ce` rejecting blank names, scalars without a
/// parameter, and anything not in the whitelists. `auth_items` are validated
/// as password sub-trees and may therefore carry a block.
fn check_items(
    cf: &ConfigFile,
    ce: EntryId,
    dir: &str,
    scalars: &[&str],
    blocks: &[&str],
    auth_items: &[&str],
    diag: &mut Diag,
) {
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: {} item without variable name", cf.loc(cep), dir));
            continue;
        }
        if auth_items.contains(&entry.name.as_str()) {
            auth::validate(cf, cep, &format!("{}::{}", dir, entry.name), diag);
            continue;
        }
        if blocks.contains(&entry.name.as_str()) {
            continue;
        }
        if scalars.contains(&entry.name.as_str()) {
            if entry.value.is_none() {
                diag.error(format!(
                    "{}: {}::{} without parameter",
                    cf.loc(cep),
                    dir,
                    entry.name
                ));
            }
            continue;
        }
        diag.error(format!(
            "{}: unknown directive {}::{}",
            cf.loc(cep),
            dir,
            entry.name
        ));
    }
}

pub(crate) fn test_me(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    match cf.find_child(ce, "name") {
        None => diag.error(format!("{}: me::name missing", cf.loc(ce))),
        Some(cep) => match cf.entry(cep).value.as_deref() {
            None => diag.error(format!("{}: me::name without contents", cf.loc(cep))),
            Some(name) if !name.contains('.') => diag.error(format!(
                "{}: illegal me::name, must be fully qualified hostname",
                cf.loc(cep)
            )),
            Some(_) => {}
        },
    }
    match cf.find_child(ce, "info") {
        None => diag.error(format!("{}: me::info missing", cf.loc(ce))),
        Some(cep) => match cf.entry(cep).value.as_deref() {
            None => diag.error(format!("{}: me::info without contents", cf.loc(cep))),
            Some(info) if info.len() > REALLEN - 1 => diag.error(format!(
                "{}: too long me::info, must be max. {} characters",
                cf.loc(cep),
                REALLEN - 1
            )),
            Some(_) => {}
        },
    }
    match cf.find_child(ce, "numeric") {
        None => diag.error(format!("{}: me::numeric missing", cf.loc(ce))),
        Some(cep) => match cf.entry(cep).value.as_deref() {
            None => diag.error(format!("{}: me::numeric without contents", cf.loc(cep))),
            Some(value) => match value.parse::<i64>() {
                Ok(0..=254) => {}
                _ => diag.error(format!(
                    "{}: illegal me::numeric error (must be between 0 and 254)",
                    cf.loc(cep)
                )),
            },
        },
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: blank me line", cf.loc(cep)));
            continue;
        }
        if entry.value.is_none() {
            diag.error(format!(
                "{}: me::{} without parameter",
                cf.loc(cep),
                entry.name
            ));
            continue;
        }
        match entry.name.as_str() {
            "name" | "info" | "numeric" => {}
            other => diag.error(format!(
                "{}: unknown directive me::{}",
                cf.loc(cep),
                other
            )),
        }
    }
}

pub(crate) fn test_class(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: class without name", cf.loc(ce)));
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: class item without variable name", cf.loc(cep)));
            continue;
        }
        if entry.value.is_none() {
            diag.error(format!("{}: class item without parameter", cf.loc(cep)));
            continue;
        }
        match entry.name.as_str() {
            "pingfreq" | "maxclients" | "connfreq" | "sendq" => {}
            other => diag.error(format!(
                "{}: unknown directive class::{}",
                cf.loc(cep),
                other
            )),
        }
    }
    match cf.find_child(ce, "pingfreq") {
        None => diag.error(format!("{}: class::pingfreq missing", cf.loc(ce))),
        Some(cep) => {
            let ok = cf
                .entry(cep)
                .value
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok())
                .map(|l| l >= 1)
                .unwrap_or(false);
            if !ok {
                diag.error(format!(
                    "{}: class::pingfreq with illegal value",
                    cf.loc(cep)
                ));
            }
        }
    }
    match cf.find_child(ce, "maxclients") {
        None => diag.error(format!("{}: class::maxclients missing", cf.loc(ce))),
        Some(cep) => {
            let ok = cf
                .entry(cep)
                .value
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok())
                .map(|l| l > 0)
                .unwrap_or(false);
            if !ok {
                diag.error(format!(
                    "{}: class::maxclients with illegal value",
                    cf.loc(cep)
                ));
            }
        }
    }
    match cf.find_child(ce, "sendq") {
        None => diag.error(format!("{}: class::sendq missing", cf.loc(ce))),
        Some(cep) => {
            let ok = cf
                .entry(cep)
                .value
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok())
                .map(|l| l > 0)
                .unwrap_or(false);
            if !ok {
                diag.error(format!("{}: class::sendq with illegal value", cf.loc(cep)));
            }
        }
    }
    if let Some(cep) = cf.find_child(ce, "connfreq") {
        let ok = cf
            .entry(cep)
            .value
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .map(|l| l >= 10)
            .unwrap_or(false);
        if !ok {
            diag.error(format!(
                "{}: class::connfreq with illegal value (<10)",
                cf.loc(cep)
            ));
        }
    }
}

pub(crate) fn test_oper(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: oper without name", cf.loc(ce)));
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: oper item without variable name", cf.loc(cep)));
            continue;
        }
        if entry.name == "password" {
            auth::validate(cf, cep, "oper::password", diag);
            continue;
        }
        if cf.children(cep).is_empty() {
            // standard variable
            if entry.value.is_none() {
                diag.error(format!(
                    "{}: oper::{} without parameter",
                    cf.loc(cep),
                    entry.name
                ));
                continue;
            }
            match entry.name.as_str() {
                "class" | "swhois" | "snomask" | "flags" => {}
                other => diag.error(format!(
                    "{}: unknown directive oper::{}",
                    cf.loc(cep),
                    other
                )),
            }
        } else {
            // section
            match entry.name.as_str() {
                "flags" => {
                    for &cepp in cf.children(cep) {
                        let flag = cf.entry(cepp);
                        if flag.name.is_empty() {
                            diag.error(format!(
                                "{}: oper::flags item without variable name",
                                cf.loc(cepp)
                            ));
                            continue;
                        }
                        if flags::oper_flag_by_name(&flag.name).is_none() {
                            diag.error(format!(
                                "{}: unknown oper flag '{}'",
                                cf.loc(cepp),
                                flag.name
                            ));
                        }
                    }
                }
                "from" => {
                    for &cepp in cf.children(cep) {
                        let from = cf.entry(cepp);
                        if from.name.is_empty() {
                            diag.error(format!(
                                "{}: oper::from item without variable name",
                                cf.loc(cepp)
                            ));
                            continue;
                        }
                        if from.value.is_none() {
                            diag.error(format!(
                                "{}: oper::from::{} without parameter",
                                cf.loc(cepp),
                                from.name
                            ));
                            continue;
                        }
                        if from.name != "userhost" {
                            diag.error(format!(
                                "{}: unknown directive oper::from::{}",
                                cf.loc(cepp),
                                from.name
                            ));
                        }
                    }
                }
                other => diag.error(format!(
                    "{}: unknown directive oper::{} (section)",
                    cf.loc(cep),
                    other
                )),
            }
        }
    }
    if cf.find_child(ce, "password").is_none() {
        diag.error(format!("{}: oper::password missing", cf.loc(ce)));
    }
    match cf.find_child(ce, "from") {
        None => diag.error(format!("{}: oper::from missing", cf.loc(ce))),
        Some(from) => {
            let userhosts = cf
                .children(from)
                .iter()
                .filter(|&&c| cf.entry(c).name == "userhost" && cf.entry(c).value.is_some())
                .count();
            if userhosts == 0 {
                diag.error(format!(
                    "{}: oper::from without at least one userhost",
                    cf.loc(from)
                ));
            }
        }
    }
    if cf.find_child(ce, "class").is_none() {
        diag.error(format!("{}: oper::class missing", cf.loc(ce)));
    }
}

pub(crate) fn test_listen(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let Some(value) = cf.entry(ce).value.as_deref() else {
        diag.error(format!("{}: listen without ip:port", cf.loc(ce)));
        return;
    };
    let (ip, port) = split_ip_port(value);
    let Some(ip) = ip.filter(|ip| !ip.is_empty()) else {
        diag.error(format!("{}: listen: illegal ip:port mask", cf.loc(ce)));
        return;
    };
    if ip.contains('*') && ip != "*" {
        diag.error(format!(
            "{}: listen: illegal ip, (mask, and not '*')",
            cf.loc(ce)
        ));
        return;
    }
    let Some(port) = port.filter(|p| !p.is_empty()) else {
        diag.error(format!("{}: listen: missing port in mask", cf.loc(ce)));
        return;
    };
    match port.parse::<i64>() {
        Ok(0..=65535) => {}
        _ => {
            diag.error(format!(
                "{}: listen: illegal port (must be 0..65535)",
                cf.loc(ce)
            ));
            return;
        }
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!(
                "{}: listen item without variable name",
                cf.loc(cep)
            ));
            continue;
        }
        if entry.value.is_none() && cf.children(cep).is_empty() {
            diag.error(format!(
                "{}: listen::{} without parameter",
                cf.loc(cep),
                entry.name
            ));
            continue;
        }
        if entry.name == "options" {
            for &cepp in cf.children(cep) {
                let opt = cf.entry(cepp);
                if opt.name.is_empty() {
                    diag.error(format!(
                        "{}: listen::options item without variable name",
                        cf.loc(cepp)
                    ));
                    continue;
                }
                if flags::listener_flag_by_name(&opt.name).is_none() {
                    diag.error(format!(
                        "{}: unknown listen option '{}'",
                        cf.loc(cepp),
                        opt.name
                    ));
                }
            }
        } else {
            diag.error(format!(
                "{}: unknown directive listen::{}",
                cf.loc(cep),
                entry.name
            ));
        }
    }
}

pub(crate) fn test_allow(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if let Some(value) = cf.entry(ce).value.as_deref() {
        if value == "channel" {
            test_allow_channel(cf, ce, diag);
        } else {
            diag.error(format!("{}: allow item with unknown type", cf.loc(ce)));
        }
        return;
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: allow item without variable name", cf.loc(cep)));
            continue;
        }
        match entry.name.as_str() {
            "password" => {
                auth::validate(cf, cep, "allow::password", diag);
            }
            "options" => {
                for &cepp in cf.children(cep) {
                    let opt = cf.entry(cepp);
                    match opt.name.as_str() {
                        "noident" | "useip" => {}
                        other => diag.error(format!(
                            "{}: unknown directive allow::options::{}",
                            cf.loc(cepp),
                            other
                        )),
                    }
                }
            }
            "ip" | "hostname" | "class" | "redirect-server" => {
                if entry.value.is_none() {
                    diag.error(format!(
                        "{}: allow::{} without parameter",
                        cf.loc(cep),
                        entry.name
                    ));
                }
            }
            "maxperip" => {
                let ok = entry
                    .value
                    .as_deref()
                    .and_then(|v| v.parse::<i64>().ok())
                    .map(|l| l >= 1)
                    .unwrap_or(false);
                if !ok {
                    diag.error(format!(
                        "{}: allow::maxperip with illegal value",
                        cf.loc(cep)
                    ));
                }
            }
            "redirect-port" => {
                let ok = entry
                    .value
                    .as_deref()
                    .and_then(|v| v.parse::<i64>().ok())
                    .map(|l| (1..=65535).contains(&l))
                    .unwrap_or(false);
                if !ok {
                    diag.error(format!(
                        "{}: allow::redirect-port with illegal value (must be 1..65535)",
                        cf.loc(cep)
                    ));
                }
            }
            other => diag.error(format!(
                "{}: unknown directive allow::{}",
                cf.loc(cep),
                other
            )),
        }
    }
    for required in ["ip", "hostname", "password", "class"] {
        if cf.find_child(ce, required).is_none() {
            diag.error(format!("{}: allow::{} missing", cf.loc(ce), required));
        }
    }
}

pub(crate) fn test_allow_channel(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let mut channels = 0;
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() || entry.value.is_none() {
            diag.error(format!(
                "{}: allow channel item without contents",
                cf.loc(cep)
            ));
            continue;
        }
        if entry.name == "channel" {
            channels += 1;
        } else {
            diag.error(format!(
                "{}: allow channel item with unknown type '{}'",
                cf.loc(cep),
                entry.name
            ));
        }
    }
    if channels == 0 {
        diag.error(format!("{}: allow channel without channel item", cf.loc(ce)));
    }
}

pub(crate) fn test_except(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let Some(value) = cf.entry(ce).value.as_deref() else {
        diag.error(format!("{}: except without type", cf.loc(ce)));
        return;
    };
    match value {
        "ban" | "scan" => {
            if cf.find_child(ce, "mask").is_none() {
                diag.error(format!(
                    "{}: except {} without mask item",
                    cf.loc(ce),
                    value
                ));
                return;
            }
            for &cep in cf.children(ce) {
                let entry = cf.entry(cep);
                if entry.value.is_none() {
                    diag.error(format!(
                        "{}: except {} item without contents",
                        cf.loc(cep),
                        value
                    ));
                    continue;
                }
                if entry.name != "mask" {
                    diag.error(format!(
                        "{}: unknown except {} item {}",
                        cf.loc(cep),
                        value,
                        entry.name
                    ));
                }
            }
        }
        "tkl" => {
            let Some(mask) = cf.find_child(ce, "mask") else {
                diag.error(format!("{}: except tkl without mask item", cf.loc(ce)));
                return;
            };
            let Some(tkltype) = cf.find_child(ce, "type") else {
                diag.error(format!("{}: except tkl without type item", cf.loc(ce)));
                return;
            };
            if cf.entry(mask).value.is_none() {
                diag.error(format!("{}: except tkl::mask without contents", cf.loc(ce)));
                return;
            }
            let Some(typename) = cf.entry(tkltype).value.as_deref() else {
                diag.error(format!("{}: except tkl::type without contents", cf.loc(ce)));
                return;
            };
            if flags::tkl_flags_by_name(typename).is_none() {
                diag.error(format!(
                    "{}: unknown except tkl type {}",
                    cf.loc(tkltype),
                    typename
                ));
                return;
            }
            for &cep in cf.children(ce) {
                let entry = cf.entry(cep);
                match entry.name.as_str() {
                    "mask" | "type" => {}
                    other => diag.error(format!(
                        "{}: unknown except tkl item {}",
                        cf.loc(cep),
                        other
                    )),
                }
            }
        }
        other => {
            diag.error(format!("{}: unknown except type {}", cf.loc(ce), other));
        }
    }
}

pub(crate) fn test_vhost(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.children(ce).is_empty() {
        diag.error(format!("{}: empty vhost block", cf.loc(ce)));
        return;
    }
    require_child_value(cf, ce, "vhost", "vhost", diag);
    require_child_value(cf, ce, "vhost", "login", diag);
    match cf.find_child(ce, "password") {
        None => diag.error(format!("{}: vhost::password missing", cf.loc(ce))),
        Some(cep) => {
            auth::validate(cf, cep, "vhost::password", diag);
        }
    }
    match cf.find_child(ce, "from") {
        None => diag.error(format!("{}: vhost::from missing", cf.loc(ce))),
        Some(from) => {
            if cf.children(from).is_empty() {
                diag.error(format!(
                    "{}: vhost::from block without contents",
                    cf.loc(from)
                ));
            } else {
                for &cep in cf.children(from) {
                    let entry = cf.entry(cep);
                    if entry.name.is_empty() {
                        diag.error(format!(
                            "{}: vhost::from block item without variable name",
                            cf.loc(cep)
                        ));
                        continue;
                    }
                    if entry.name == "userhost" {
                        if entry.value.is_none() {
                            diag.error(format!(
                                "{}: vhost::from::userhost item without contents",
                                cf.loc(cep)
                            ));
                        }
                    } else {
                        diag.error(format!(
                            "{}: vhost::from unknown block item '{}'",
                            cf.loc(cep),
                            entry.name
                        ));
                    }
                }
            }
        }
    }
    if let Some(swhois) = cf.find_child(ce, "swhois") {
        if cf.entry(swhois).value.is_none() {
            diag.error(format!(
                "{}: vhost::swhois without contents",
                cf.loc(swhois)
            ));
        }
    }
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        match entry.name.as_str() {
            "" | "vhost" | "login" | "password" | "from" | "swhois" => {}
            other => diag.error(format!(
                "{}: unknown directive vhost::{}",
                cf.loc(cep),
                other
            )),
        }
    }
}

pub(crate) fn test_tld(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let before = diag.error_count();
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!("{}: blank tld item", cf.loc(cep)));
            continue;
        }
        if entry.value.is_none() {
            diag.error(format!(
                "{}: missing parameter in tld::{}",
                cf.loc(cep),
                entry.name
            ));
            continue;
        }
        match entry.name.as_str() {
            "mask" | "motd" | "rules" | "channel" => {}
            other => diag.error(format!(
                "{}: unknown directive tld::{}",
                cf.loc(cep),
                other
            )),
        }
    }
    if diag.error_count() > before {
        return;
    }
    if cf.find_child(ce, "mask").is_none() {
        diag.error(format!("{}: tld::mask missing", cf.loc(ce)));
    }
    for filekind in ["motd", "rules"] {
        match cf.find_child(ce, filekind) {
            None => diag.error(format!("{}: tld::{} missing", cf.loc(ce), filekind)),
            Some(cep) => {
                if let Some(path) = cf.entry(cep).value.as_deref() {
                    if let Err(err) = std::fs::File::open(path) {
                        diag.error(format!(
                            "{}: tld::{}: {}: {}",
                            cf.loc(cep),
                            filekind,
                            path,
                            err
                        ));
                    }
                }
            }
        }
    }
}

pub(crate) fn test_ulines(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    for &cep in cf.children(ce) {
        if cf.entry(cep).name.is_empty() {
            diag.error(format!("{}: blank uline item", cf.loc(cep)));
        }
    }
}

pub(crate) fn test_admin(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    for &cep in cf.children(ce) {
        if cf.entry(cep).name.is_empty() {
            diag.error(format!("{}: blank admin item", cf.loc(cep)));
        }
    }
}

pub(crate) fn test_drpass(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    for &cep in cf.children(ce) {
        let entry = cf.entry(cep);
        if entry.name.is_empty() {
            diag.error(format!(
                "{}: drpass item without variable name",
                cf.loc(cep)
            ));
            continue;
        }
        match entry.name.as_str() {
            "restart" => {
                auth::validate(cf, cep, "drpass::restart", diag);
            }
            "die" => {
                auth::validate(cf, cep, "drpass::die", diag);
            }
            other => diag.error(format!(
                "{}: unknown drpass directive '{}'",
                cf.loc(cep),
                other
            )),
        }
    }
}

pub(crate) fn test_include(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    // file existence is checked when the loader actually expands it
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: include: no filename given", cf.loc(ce)));
    }
}

pub(crate) fn test_ban(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let Some(value) = cf.entry(ce).value.as_deref() else {
        diag.error(format!("{}: ban without type", cf.loc(ce)));
        return;
    };
    if BanKind::from_name(value).is_none() {
        diag.error(format!("{}: unknown ban type {}", cf.loc(ce), value));
        return;
    }
    check_items(cf, ce, "ban", &["mask", "reason"], &[], &[], diag);
    require_child_value(cf, ce, "ban", "mask", diag);
    require_child_value(cf, ce, "ban", "reason", diag);
}

pub(crate) fn test_link(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: link without servername", cf.loc(ce)));
    }
    check_items(
        cf,
        ce,
        "link",
        &[
            "username",
            "hostname",
            "bind-ip",
            "port",
            "hub",
            "leaf",
            "password-connect",
            "class",
            "ciphers",
        ],
        &["options"],
        &["password-receive"],
        diag,
    );
    if let Some(options) = cf.find_child(ce, "options") {
        for &cepp in cf.children(options) {
            let opt = cf.entry(cepp);
            if flags::link_flag_by_name(&opt.name).is_none() {
                diag.error(format!(
                    "{}: unknown link option '{}'",
                    cf.loc(cepp),
                    opt.name
                ));
            }
        }
    }
    for required in [
        "username",
        "hostname",
        "bind-ip",
        "password-connect",
        "class",
    ] {
        require_child_value(cf, ce, "link", required, diag);
    }
    if cf.find_child(ce, "password-receive").is_none() {
        diag.error(format!("{}: link::password-receive missing", cf.loc(ce)));
    }
    match cf.child_value(ce, "port") {
        None => diag.error(format!("{}: link::port missing", cf.loc(ce))),
        Some(port) => match port.parse::<i64>() {
            Ok(1..=65535) => {}
            _ => diag.error(format!(
                "{}: link::port with illegal value (must be 1..65535)",
                cf.loc(ce)
            )),
        },
    }
    if cf.find_child(ce, "hub").is_none() && cf.find_child(ce, "leaf").is_none() {
        diag.error(format!("{}: link::hub or link::leaf missing", cf.loc(ce)));
    }
}

pub(crate) fn test_log(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: log without filename", cf.loc(ce)));
    }
    check_items(cf, ce, "log", &[], &["flags"], &[], diag);
    if let Some(logflags) = cf.find_child(ce, "flags") {
        for &cepp in cf.children(logflags) {
            let flag = cf.entry(cepp);
            if flags::log_flag_by_name(&flag.name).is_none() {
                diag.error(format!(
                    "{}: unknown log flag '{}'",
                    cf.loc(cepp),
                    flag.name
                ));
            }
        }
    }
}

pub(crate) fn test_alias(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: alias without name", cf.loc(ce)));
    }
    check_items(cf, ce, "alias", &["target", "type"], &[], &[], diag);
    if let Some(kind) = cf.child_value(ce, "type") {
        if AliasKind::from_name(kind).is_none() {
            diag.error(format!("{}: unknown alias type {}", cf.loc(ce), kind));
        }
    }
}

pub(crate) fn test_help(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    if cf.entry(ce).value.is_none() {
        diag.error(format!("{}: help without name", cf.loc(ce)));
    }
    for &cep in cf.children(ce) {
        if cf.entry(cep).name.is_empty() {
            diag.error(format!("{}: blank help item", cf.loc(cep)));
        }
    }
}

pub(crate) fn test_deny(cf: &ConfigFile, ce: EntryId, diag: &mut Diag) {
    let Some(value) = cf.entry(ce).value.as_deref() else {
        diag.error(format!("{}: deny without type", cf.loc(ce)));
        return;
    };
    match value {
        "dcc" => {
            check_items(cf, ce, "deny dcc", &["filename", "reason"], &[], &[], diag);
            require_child_value(cf, ce, "deny dcc", "filename", diag);
            require_child_value(cf, ce, "deny dcc", "reason", diag);
        }
        "link" => {
            check_items(cf, ce, "deny link", &["mask", "rule", "type"], &[], &[], diag);
            require_child_value(cf, ce, "deny link", "mask", diag);
            require_child_value(cf, ce, "deny link", "rule", diag);
            if require_child_value(cf, ce, "deny link", "type", diag) {
                match cf.child_value(ce, "type") {
                    Some("all") | Some("auto") => {}
                    Some(other) => diag.error(format!(
                        "{}: unknown deny link type {}",
                        cf.loc(ce),
                        other
                    )),
                    None => {}
                }
            }
        }
        "channel" => {
            check_items(cf, ce, "deny channel", &["channel", "reason"], &[], &[], diag);
            require_child_value(cf, ce, "deny channel", "channel", diag);
            require_child_value(cf, ce, "deny channel", "reason", diag);
        }
        "version" => {
            check_items(
                cf,
                ce,
                "deny version",
                &["mask", "version", "flags"],
                &[],
                &[],
                diag,
            );
            require_child_value(cf, ce, "deny version", "mask", diag);
            require_child_value(cf, ce, "deny version", "version", diag);
            require_child_value(cf, ce, "deny version", "flags", diag);
        }
        other => {
            diag.error(format!("{}: unknown deny type {}", cf.loc(ce), other));
        }
    }
}
