use std::io::Write;

use concread::cowcell::CowCell;

use crate::auth::AuthKind;
use crate::conf::commit::config_run;
use crate::conf::diag::Diag;
use crate::conf::flags::{LinkFlags, ListenerFlags, LogFlags, OperFlags, TklFlags};
use crate::conf::records::{AliasKind, BanKind, DenyLinkKind, ExceptKind};
use crate::conf::rehash::{config_rehash, init_conf, listen_cleanup, rehash, run_configuration};
use crate::conf::store::ConfigStore;
use crate::conf::validate::config_test;
use crate::tests::{MINIMAL_CONF, boot, loaded_from, test_and_run, validate_errors};

#[test]
fn test_minimal_me_block() {
    let store = boot(MINIMAL_CONF);
    let me = store.me.expect("me record should exist");
    assert_eq!(me.name, "irc.example.org");
    assert_eq!(me.info, "Example");
    assert_eq!(me.numeric, 1);
}

#[test]
fn test_invalid_numeric_blocks_commit() {
    let mut store = ConfigStore::new();
    let before = store.clone();
    let (result, diag) = test_and_run(
        "me { name \"a.b\"; info \"x\"; numeric 999; };",
        &mut store,
    );
    assert!(result.is_err());
    assert_eq!(diag.error_count(), 1);
    assert!(diag.errors()[0].contains("me::numeric"));
    // validation failed, so the store is untouched
    assert_eq!(store, before);
    assert!(store.me.is_none());
}

#[test]
fn test_validator_accumulates_errors() {
    let errors = validate_errors(
        "me { info \"way too long for an info line, definitely over the maximum\"; numeric -4; };\nbogus { x; };",
    );
    // name missing, info too long, numeric missing and illegal, unknown directive
    assert!(errors.iter().any(|e| e.contains("me::name missing")));
    assert!(errors.iter().any(|e| e.contains("too long me::info")));
    assert!(errors.iter().any(|e| e.contains("me::numeric")));
    assert!(errors.iter().any(|e| e.contains("unknown directive bogus")));
}

const FULL_CONF: &str = r##"
me { name "irc.example.org"; info "Example"; numeric 1; };
admin { "Rook Admin"; "admin@example.org"; };
class clients { pingfreq 90; maxclients 500; sendq 100000; };
class servers { pingfreq 120; maxclients 10; sendq 1000000; connfreq 100; };
ulines { services.example.org; stats.example.org; };
drpass { restart "r3start"; die "d13"; };
oper rook {
    class clients;
    from { userhost "*@staff.example.org"; };
    password "hunter2" { md5; };
    flags { global; can_rehash; can_die; };
    swhois "is a rook";
    snomask "cFk";
};
oper crow {
    class clients;
    from { userhost "crow@*"; };
    password "caw";
    flags "oOr";
};
listen 6667;
listen "[::1]:6697" { options { ssl; clientsonly; }; };
allow {
    ip "*@*";
    hostname "*@*.example.org";
    class clients;
    password "";
    maxperip 4;
    redirect-server "irc2.example.org";
    redirect-port 6667;
    options { noident; useip; };
};
allow channel { channel "#warez-ok"; };
except ban { mask "*@shell.example.org"; };
except scan { mask "*@trusted.example.org"; };
except tkl { mask "*@*.example.org"; type gline; };
vhost {
    vhost "staff@rook.example.org";
    login "rooky";
    password "vh0st";
    from { userhost "*@*.example.org"; };
    swhois "flies high";
};
link hub.example.org {
    username "*";
    hostname "hub.example.org";
    bind-ip "*";
    port 7029;
    hub "*";
    password-connect "linkpass";
    password-receive "linkpass";
    class servers;
    options { autoconnect; zip; };
};
ban user { mask "*@*.evil.net"; reason "Spambots"; };
ban server { mask "rogue.*"; reason "Unauthorized"; };
deny dcc { filename "*.exe"; reason "Executables are evil"; };
deny channel { channel "#warez*"; reason "No warez"; };
deny link { mask "leaf.*"; rule "connected(*.example.org)"; type auto; };
deny version { mask "*.old.net"; version "2.8*"; flags "h"; };
log "ircd.log" { flags { errors; kills; oper; }; };
alias ns { target "nickserv"; type services; };
help opguide { "Read the oper guide"; "Then read it again"; };
"##;

#[test]
fn test_full_config_commits() {
    let store = boot(FULL_CONF);

    assert_eq!(store.admin, vec!["Rook Admin", "admin@example.org"]);
    // default class plus the two configured ones
    assert_eq!(store.classes.len(), 3);
    let clients = store.find_class("clients").expect("clients class");
    assert_eq!(clients.pingfreq, 90);
    assert_eq!(clients.maxclients, 500);
    assert_eq!(clients.sendq, 100000);
    assert_eq!(clients.connfreq, None);
    let servers = store.find_class("servers").expect("servers class");
    assert_eq!(servers.connfreq, Some(100));

    assert_eq!(store.ulines.len(), 2);
    let drpass = store.drpass.as_ref().expect("drpass");
    assert_eq!(drpass.restart.as_ref().map(|a| a.kind), Some(AuthKind::Plain));
    assert!(drpass.die.is_some());

    let rook = store.find_oper("rook").expect("oper rook");
    assert_eq!(rook.auth.kind, AuthKind::Md5);
    assert!(
        rook.flags
            .contains(OperFlags::GLOBAL | OperFlags::REHASH | OperFlags::DIE)
    );
    assert_eq!(rook.swhois.as_deref(), Some("is a rook"));
    assert_eq!(rook.from, vec!["*@staff.example.org"]);
    let crow = store.find_oper("crow").expect("oper crow");
    // compact flag string: o O r
    assert!(
        crow.flags
            .contains(OperFlags::LOCAL | OperFlags::GLOBAL | OperFlags::REHASH)
    );
    assert!(!crow.flags.contains(OperFlags::DIE));

    assert_eq!(store.listeners.len(), 2);
    assert_eq!(store.listeners[0].ip, "*");
    assert_eq!(store.listeners[0].port, 6667);

    let allow = &store.allows[0];
    assert_eq!(allow.maxperip, Some(4));
    assert_eq!(allow.redirect_port, Some(6667));
    assert!(allow.noident && allow.useip);

    assert_eq!(store.excepts.len(), 3);
    assert_eq!(store.excepts[0].kind, ExceptKind::Ban);
    assert_eq!(store.excepts[1].kind, ExceptKind::Scan);
    assert_eq!(
        store.excepts[2].tkl,
        Some(TklFlags::KILL | TklFlags::GLOBAL)
    );

    let vhost = store.find_vhost("rooky").expect("vhost rooky");
    assert_eq!(vhost.virtuser.as_deref(), Some("staff"));
    assert_eq!(vhost.virthost, "rook.example.org");

    let link = &store.links[0];
    assert_eq!(link.servername, "hub.example.org");
    assert_eq!(link.port, 7029);
    assert!(link.options.contains(LinkFlags::AUTO_CONNECT | LinkFlags::ZIP));
    assert!(!link.options.contains(LinkFlags::SSL));
    assert_eq!(link.hub.as_deref(), Some("*"));
    assert_eq!(link.leaf, None);

    assert_eq!(store.bans.len(), 2);
    assert_eq!(store.bans[0].kind, BanKind::User);
    assert_eq!(store.deny_dcc[0].filename, "*.exe");
    assert_eq!(store.deny_links[0].kind, DenyLinkKind::Auto);
    assert_eq!(store.deny_versions[0].version, "2.8*");

    assert_eq!(store.logs[0].file, "ircd.log");
    assert!(
        store.logs[0]
            .flags
            .contains(LogFlags::ERRORS | LogFlags::KILLS | LogFlags::OPER)
    );

    let alias = store.find_alias("NS").expect("alias ns, case-insensitive");
    assert_eq!(alias.target, "nickserv");
    assert_eq!(alias.kind, AliasKind::Services);

    let help = store.find_help("opguide").expect("help block");
    assert_eq!(help.lines.len(), 2);
}

#[cfg(feature = "ssl")]
#[test]
fn test_ipv6_listener_with_ssl() {
    let store = boot("listen \"[::1]:6697\" { options { ssl; }; };");
    let listener = store.find_listen("::1", 6697).expect("ipv6 listener");
    assert_eq!(listener.ip, "::1");
    assert_eq!(listener.port, 6697);
    assert!(listener.options.contains(ListenerFlags::SSL));
}

#[test]
fn test_unknown_class_falls_back_to_default() {
    let store = boot(
        r#"
oper lost {
    class nosuch;
    from { userhost "*@*"; };
    password "x";
    flags { local; };
};
"#,
    );
    let oper = store.find_oper("lost").expect("oper");
    assert_eq!(oper.class, ConfigStore::DEFAULT_CLASS);
}

#[test]
fn test_keyed_commit_idempotence() {
    let loaded = loaded_from(FULL_CONF);
    let mut store = ConfigStore::new();
    let mut diag = Diag::new(false);
    config_test(&loaded, &mut diag).expect("valid");
    config_run(&mut store, &loaded, &mut diag).expect("first commit");
    let first = store.clone();
    config_run(&mut store, &loaded, &mut diag).expect("second commit");

    // keyed lists stay exactly the same
    assert_eq!(store.classes, first.classes);
    assert_eq!(store.opers, first.opers);
    assert_eq!(store.listeners, first.listeners);
    assert_eq!(store.vhosts, first.vhosts);
    assert_eq!(store.me, first.me);

    // appended lists doubled, but contain no new values
    assert_eq!(store.allows.len(), first.allows.len() * 2);
    for allow in &store.allows {
        assert!(first.allows.contains(allow));
    }
}

#[test]
fn test_rehash_keeps_oper_identity() {
    let c1 = r#"
me { name "irc.example.org"; info "Example"; numeric 1; };
class clients { pingfreq 90; maxclients 500; sendq 100000; };
oper alpha { class clients; from { userhost "*@a"; }; password "one"; flags { local; }; };
oper beta { class clients; from { userhost "*@b"; }; password "two"; flags { local; }; };
"#;
    let c2 = r#"
me { name "irc.example.org"; info "Example"; numeric 1; };
class clients { pingfreq 90; maxclients 500; sendq 100000; };
oper alpha { class clients; from { userhost "*@a2"; }; password "one"; flags { global; }; };
oper gamma { class clients; from { userhost "*@c"; }; password "three"; flags { local; }; };
"#;
    let mut store = boot(c1);
    assert_eq!(store.opers.len(), 2);

    let loaded = loaded_from(c2);
    let mut diag = Diag::new(false);
    config_test(&loaded, &mut diag).expect("valid");
    config_rehash(&mut store);
    config_run(&mut store, &loaded, &mut diag).expect("rehash commit");

    // alpha updated in place, still first
    assert_eq!(store.opers[0].name, "alpha");
    assert_eq!(store.opers[0].from, vec!["*@a2"]);
    assert!(store.opers[0].flags.contains(OperFlags::GLOBAL));
    // beta not removed; live connections may still reference it
    assert_eq!(store.opers[1].name, "beta");
    // gamma appended
    assert_eq!(store.opers[2].name, "gamma");
    assert!(store.find_oper("gamma").is_some());
}

#[test]
fn test_rehash_rebuilds_unkeyed_lists() {
    let c1 = r#"
ulines { one.example.org; };
ban user { mask "*@old"; reason "old"; };
"#;
    let c2 = r#"
ulines { two.example.org; };
"#;
    let mut store = boot(c1);
    assert_eq!(store.ulines.len(), 1);
    assert_eq!(store.bans.len(), 1);

    let loaded = loaded_from(c2);
    let mut diag = Diag::new(false);
    config_test(&loaded, &mut diag).expect("valid");
    config_rehash(&mut store);
    config_run(&mut store, &loaded, &mut diag).expect("commit");

    assert_eq!(store.ulines.len(), 1);
    assert_eq!(store.ulines[0].servername, "two.example.org");
    assert!(store.bans.is_empty());
}

#[test]
fn test_failed_rehash_leaves_store_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.conf");
    let bad = dir.path().join("bad.conf");
    std::fs::write(&good, MINIMAL_CONF).expect("write good");
    // numeric out of range: validation must fail
    std::fs::write(&bad, "me { name \"a.b\"; info \"x\"; numeric 999; };").expect("write bad");

    let cell = CowCell::new(ConfigStore::new());
    let mut diag = Diag::new(false);
    {
        let mut txn = cell.write();
        init_conf(&mut txn, good.to_str().expect("path"), false, &mut diag)
            .expect("boot should succeed");
        txn.commit();
    }
    let before = (*cell.read()).clone();
    assert!(before.me.is_some());

    let ok = rehash(&cell, bad.to_str().expect("path"), &mut diag, || {
        panic!("close hook must not run on a failed rehash")
    });
    assert!(!ok);
    assert_eq!(*cell.read(), before);
    assert_eq!(
        cell.read().me.as_ref().map(|m| m.name.clone()),
        Some("irc.example.org".to_string())
    );
}

#[test]
fn test_listener_cleanup_after_rehash() {
    let mut store = boot("listen 6667;\nlisten 6668;\nlisten 6669;");
    assert_eq!(store.listeners.len(), 3);
    // 6668 has a client attached and must survive until it drains
    store.listeners[1].clients = 1;

    let loaded = loaded_from("listen 6667;");
    let mut diag = Diag::new(false);
    config_test(&loaded, &mut diag).expect("valid");
    config_rehash(&mut store);
    config_run(&mut store, &loaded, &mut diag).expect("commit");

    let removed = listen_cleanup(&mut store);
    assert_eq!(removed, 1);
    assert!(store.find_listen("*", 6667).is_some());
    assert!(store.find_listen("*", 6668).is_some());
    assert!(store.find_listen("*", 6669).is_none());

    // once the client drains, the next sweep takes 6668 too
    store.listeners.iter_mut().for_each(|l| {
        if l.port == 6668 {
            l.clients = 0;
        }
    });
    assert_eq!(listen_cleanup(&mut store), 1);
    assert!(store.find_listen("*", 6668).is_none());
}

#[test]
fn test_listener_keeps_transient_state_across_rehash() {
    let mut store = boot("listen 6667;");
    store.listeners[0].bound = true;
    store.listeners[0].clients = 7;

    let loaded = loaded_from("listen 6667;");
    let mut diag = Diag::new(false);
    config_test(&loaded, &mut diag).expect("valid");
    config_rehash(&mut store);
    config_run(&mut store, &loaded, &mut diag).expect("commit");

    assert!(store.listeners[0].bound);
    assert_eq!(store.listeners[0].clients, 7);
    assert!(!store.listeners[0].temporary);
}

#[test]
fn test_run_configuration_binds_unbound() {
    let mut store = boot("listen 6667;\nlisten 6668;");
    store.listeners[0].bound = true;

    let mut asked = Vec::new();
    run_configuration(&mut store, |l| {
        asked.push(l.port);
        true
    });
    assert_eq!(asked, vec![6668]);
    assert!(store.listeners.iter().all(|l| l.bound));
}

#[test]
fn test_tld_block_reads_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let motd = dir.path().join("motd.txt");
    let rules = dir.path().join("rules.txt");
    let mut f = std::fs::File::create(&motd).expect("motd");
    writeln!(f, "Welcome to example!").expect("write");
    writeln!(f, "Enjoy your stay.").expect("write");
    std::fs::write(&rules, "No spamming.\n").expect("rules");

    let text = format!(
        "tld {{ mask \"*@*.example.de\"; motd \"{}\"; rules \"{}\"; channel \"#deutsch\"; }};",
        motd.display(),
        rules.display()
    );
    let store = boot(&text);
    let tld = store.find_tld("user@box.example.de").expect("tld match");
    assert_eq!(tld.motd.len(), 2);
    assert_eq!(tld.motd[0], "Welcome to example!");
    assert_eq!(tld.rules, vec!["No spamming."]);
    assert_eq!(tld.channel.as_deref(), Some("#deutsch"));
}

#[test]
fn test_tld_validation_requires_readable_files() {
    let errors = validate_errors(
        "tld { mask \"*\"; motd \"/nonexistent/motd\"; rules \"/nonexistent/rules\"; };",
    );
    assert!(errors.iter().any(|e| e.contains("tld::motd")));
    assert!(errors.iter().any(|e| e.contains("tld::rules")));
}

#[test]
fn test_vhost_keyed_update() {
    let mut store = boot(
        "vhost { vhost \"a.example.org\"; login \"key\"; password \"x\"; from { userhost \"*@*\"; }; };",
    );
    assert_eq!(store.vhosts.len(), 1);
    let (result, _) = test_and_run(
        "vhost { vhost \"b.example.org\"; login \"key\"; password \"y\"; from { userhost \"*@*\"; }; };",
        &mut store,
    );
    result.expect("second vhost commit");
    assert_eq!(store.vhosts.len(), 1);
    assert_eq!(store.vhosts[0].virthost, "b.example.org");
}

#[test]
fn test_validate_rejects_bad_blocks() {
    assert!(
        validate_errors("class c { pingfreq 0; maxclients 5; sendq 100; };")
            .iter()
            .any(|e| e.contains("pingfreq"))
    );
    assert!(
        validate_errors("class c { pingfreq 90; maxclients 5; sendq 100; connfreq 5; };")
            .iter()
            .any(|e| e.contains("connfreq"))
    );
    assert!(
        validate_errors("listen 123456;")
            .iter()
            .any(|e| e.contains("illegal port"))
    );
    assert!(
        validate_errors("listen \"1.2.*:6667\";")
            .iter()
            .any(|e| e.contains("illegal ip"))
    );
    // bracketed ipv6 with no closing bracket: the whole value is the ip
    assert!(
        validate_errors("listen \"[::1:6667\";")
            .iter()
            .any(|e| e.contains("missing port") || e.contains("illegal ip"))
    );
    assert!(
        validate_errors(
            "oper o { class c; from { userhost \"*@*\"; }; password \"x\"; flags { can_fly; }; };"
        )
        .iter()
        .any(|e| e.contains("unknown oper flag 'can_fly'"))
    );
    assert!(
        validate_errors("oper o { class c; from { }; password \"x\"; };")
            .iter()
            .any(|e| e.contains("userhost"))
    );
    assert!(
        validate_errors(
            "allow { ip \"*\"; hostname \"*\"; class c; password \"x\"; redirect-port 0; };"
        )
        .iter()
        .any(|e| e.contains("redirect-port"))
    );
    assert!(
        validate_errors("except tkl { mask \"*\"; type wibble; };")
            .iter()
            .any(|e| e.contains("unknown except tkl type"))
    );
    assert!(
        validate_errors("except frobnicate { mask \"*\"; };")
            .iter()
            .any(|e| e.contains("unknown except type"))
    );
    assert!(
        validate_errors("ban wibble { mask \"*\"; reason \"x\"; };")
            .iter()
            .any(|e| e.contains("unknown ban type"))
    );
    assert!(
        validate_errors(
            "link h { username \"*\"; hostname \"h\"; bind-ip \"*\"; port 7000; password-connect \"x\"; password-receive \"x\"; class c; };"
        )
        .iter()
        .any(|e| e.contains("hub or link::leaf")),
    );
    assert!(
        validate_errors("log \"f.log\" { flags { dancing; }; };")
            .iter()
            .any(|e| e.contains("unknown log flag"))
    );
    assert!(
        validate_errors("deny dcc { filename \"*.exe\"; };")
            .iter()
            .any(|e| e.contains("deny dcc::reason missing"))
    );
    assert!(
        validate_errors("vhost { };")
            .iter()
            .any(|e| e.contains("empty vhost block"))
    );
    assert!(
        validate_errors("drpass { sing \"x\"; };")
            .iter()
            .any(|e| e.contains("unknown drpass directive"))
    );
    assert!(
        validate_errors("include;")
            .iter()
            .any(|e| e.contains("no filename given"))
    );
    assert!(
        validate_errors("oper o { class c; password \"h\" { bcrypt; }; from { userhost \"a@b\"; }; };")
            .iter()
            .any(|e| e.contains("unknown auth type"))
    );
}

#[test]
fn test_boot_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let conf = dir.path().join("rookd.conf");
    std::fs::write(&conf, MINIMAL_CONF).expect("write conf");

    let mut store = ConfigStore::new();
    let mut diag = Diag::new(false);
    init_conf(&mut store, conf.to_str().expect("path"), false, &mut diag).expect("boot");
    assert!(store.me.is_some());
}

#[test]
fn test_missing_root_config_fails() {
    let mut store = ConfigStore::new();
    let mut diag = Diag::new(false);
    assert!(init_conf(&mut store, "/nonexistent/rookd.conf", false, &mut diag).is_err());
    assert!(diag.errors().iter().any(|e| e.contains("Couldn't open")));
}
