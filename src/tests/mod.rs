mod conf;
mod loader;

use crate::conf::commit::config_run;
use crate::conf::diag::Diag;
use crate::conf::loader::LoadedConf;
use crate::conf::parser::{ConfigFile, EntryId, parse};
use crate::conf::store::ConfigStore;
use crate::conf::validate::config_test;
use crate::error::RookdError;

/// Parses a buffer as `test.conf`, panicking on syntax errors.
pub(crate) fn parse_ok(text: &str) -> ConfigFile {
    let mut diag = Diag::new(false);
    parse("test.conf", text, &mut diag).expect("expected the buffer to parse")
}

/// Wraps a single parsed buffer the way the loader would.
pub(crate) fn loaded_from(text: &str) -> LoadedConf {
    LoadedConf {
        files: vec![parse_ok(text)],
        includes: vec![],
    }
}

/// Runs validate-then-commit over a buffer against `store`, returning the
/// diag so callers can poke at the error lines.
pub(crate) fn test_and_run(
    text: &str,
    store: &mut ConfigStore,
) -> (Result<(), RookdError>, Diag) {
    let loaded = loaded_from(text);
    let mut diag = Diag::new(false);
    let result = match config_test(&loaded, &mut diag) {
        Ok(()) => config_run(store, &loaded, &mut diag),
        Err(err) => Err(err),
    };
    (result, diag)
}

/// Boots a fresh store from a buffer, panicking if anything fails.
pub(crate) fn boot(text: &str) -> ConfigStore {
    let mut store = ConfigStore::new();
    let (result, diag) = test_and_run(text, &mut store);
    if let Err(err) = result {
        panic!("boot failed: {err}\nerrors: {:#?}", diag.errors());
    }
    store
}

/// Validates a buffer without committing, returning the collected errors.
pub(crate) fn validate_errors(text: &str) -> Vec<String> {
    let loaded = loaded_from(text);
    let mut diag = Diag::new(false);
    let _ = config_test(&loaded, &mut diag);
    diag.errors().to_vec()
}

/// Position-independent view of an entry, for comparing parses of buffers
/// that differ only in whitespace or comments.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Shape {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<Shape>,
}

pub(crate) fn shape_of(cf: &ConfigFile, id: EntryId) -> Shape {
    let entry = cf.entry(id);
    Shape {
        name: entry.name.clone(),
        value: entry.value.clone(),
        children: cf.children(id).iter().map(|&c| shape_of(cf, c)).collect(),
    }
}

pub(crate) fn shapes(cf: &ConfigFile) -> Vec<Shape> {
    cf.roots.iter().map(|&id| shape_of(cf, id)).collect()
}

/// A minimal valid configuration several tests build on.
pub(crate) const MINIMAL_CONF: &str = r#"
me {
    name "irc.example.org";
    info "Example";
    numeric 1;
};
"#;
