use crate::conf::commit::config_run;
use crate::conf::diag::Diag;
use crate::conf::loader::{LoadedConf, load_conf};
use crate::conf::store::ConfigStore;
use crate::conf::validate::config_test;

const OPER_TEMPLATE: &str = r#"
class clients { pingfreq 90; maxclients 10; sendq 4000; };
oper NAME { class clients; from { userhost "*@*"; }; password "x"; flags { local; }; };
"#;

fn oper_conf(name: &str) -> String {
    OPER_TEMPLATE.replace("NAME", name)
}

#[test]
fn test_include_expansion_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sub = dir.path().join("conf.d");
    std::fs::create_dir(&sub).expect("mkdir");
    // written out of order on purpose; expansion must come back sorted
    std::fs::write(sub.join("20-beta.conf"), oper_conf("beta")).expect("write");
    std::fs::write(sub.join("10-alpha.conf"), oper_conf("alpha")).expect("write");
    let root = dir.path().join("root.conf");
    std::fs::write(
        &root,
        format!("include \"{}/*.conf\";\n", sub.display()),
    )
    .expect("write root");

    let run = || {
        let mut loaded = LoadedConf::default();
        let mut diag = Diag::new(false);
        load_conf(&mut loaded, root.to_str().expect("path"), &mut diag).expect("load");
        let mut store = ConfigStore::new();
        config_test(&loaded, &mut diag).expect("valid");
        config_run(&mut store, &loaded, &mut diag).expect("commit");
        (loaded, store)
    };

    let (loaded, store) = run();
    assert_eq!(loaded.files.len(), 3);
    assert!(loaded.files[0].filename.ends_with("root.conf"));
    assert!(loaded.files[1].filename.ends_with("10-alpha.conf"));
    assert!(loaded.files[2].filename.ends_with("20-beta.conf"));
    assert_eq!(loaded.includes.len(), 1);

    // opers land in lexicographic include order
    let names: Vec<&str> = store.opers.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);

    // and the order is stable across repeated loads
    let (_, store2) = run();
    assert_eq!(store.opers, store2.opers);
}

#[test]
fn test_include_matching_nothing_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root.conf");
    std::fs::write(
        &root,
        format!("include \"{}/missing/*.conf\";\n", dir.path().display()),
    )
    .expect("write root");

    let mut loaded = LoadedConf::default();
    let mut diag = Diag::new(false);
    assert!(load_conf(&mut loaded, root.to_str().expect("path"), &mut diag).is_err());
    assert!(
        diag.errors().iter().any(|e| e.contains("invalid file given")),
        "got: {:#?}",
        diag.errors()
    );
}

#[test]
fn test_empty_file_produces_no_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root.conf");
    let empty = dir.path().join("empty.conf");
    std::fs::write(&root, format!("include \"{}\";\n", empty.display())).expect("write root");
    std::fs::write(&empty, "").expect("write empty");

    let mut loaded = LoadedConf::default();
    let mut diag = Diag::new(false);
    load_conf(&mut loaded, root.to_str().expect("path"), &mut diag).expect("load");
    // only the root file lands in the list
    assert_eq!(loaded.files.len(), 1);
    assert_eq!(diag.error_count(), 0);
}

#[test]
fn test_nested_includes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root.conf");
    let mid = dir.path().join("mid.conf");
    let leaf = dir.path().join("leaf.conf");
    std::fs::write(&root, format!("include \"{}\";\n", mid.display())).expect("write");
    std::fs::write(
        &mid,
        format!("listen 6667;\ninclude \"{}\";\n", leaf.display()),
    )
    .expect("write");
    std::fs::write(&leaf, "listen 6668;\n").expect("write");

    let mut loaded = LoadedConf::default();
    let mut diag = Diag::new(false);
    load_conf(&mut loaded, root.to_str().expect("path"), &mut diag).expect("load");
    assert_eq!(loaded.files.len(), 3);
    assert!(loaded.files[1].filename.ends_with("mid.conf"));
    assert!(loaded.files[2].filename.ends_with("leaf.conf"));
    assert_eq!(loaded.includes.len(), 2);
}

#[test]
fn test_unreadable_include_target_fails_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("root.conf");
    std::fs::write(
        &root,
        format!("include \"{}/gone.conf\";\n", dir.path().display()),
    )
    .expect("write root");

    let mut loaded = LoadedConf::default();
    let mut diag = Diag::new(false);
    assert!(load_conf(&mut loaded, root.to_str().expect("path"), &mut diag).is_err());
}
