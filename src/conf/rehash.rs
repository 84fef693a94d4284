//! Load/test/run orchestration, for boot and for live rehash.
//!
//! The pipeline is the same either way: load everything, validate everything,
//! and only then mutate the store. On a rehash the store is first swept —
//! unkeyed record lists are cleared and listeners are flagged temporary — so
//! the committer rebuilds them while keyed records update in place. A rehash
//! runs against a write transaction on the [CowCell] holding the store;
//! failure drops the transaction and readers never see a half-applied
//! configuration.

use concread::cowcell::CowCell;
use log::debug;

use crate::conf::commit::config_run;
use crate::conf::diag::Diag;
use crate::conf::loader::{LoadedConf, load_conf};
use crate::conf::records::ListenerRecord;
use crate::conf::store::ConfigStore;
use crate::conf::validate::config_test;
use crate::error::RookdError;

/// Loads, validates and commits `rootconf` into `store`. With `rehash` set
/// the store is swept first so stale unkeyed records don't survive.
///
/// The parse tree only lives inside this call; it is dropped before control
/// returns to the main loop.
pub fn init_conf(
    store: &mut ConfigStore,
    rootconf: &str,
    rehash: bool,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let mut loaded = LoadedConf::default();
    if let Err(err) = load_conf(&mut loaded, rootconf, diag) {
        diag.error("IRCd configuration failed to load");
        return Err(err);
    }
    if let Err(err) = config_test(&loaded, diag) {
        diag.error("IRCd configuration failed to pass testing");
        return Err(err);
    }
    if rehash {
        config_rehash(store);
    }
    config_run(store, &loaded, diag).map_err(|err| {
        diag.error(format!(
            "Bad case of config errors. Server will now die. This really shouldn't happen: {err}"
        ));
        err
    })
}

/// Sweeps the store ahead of a rehash commit.
///
/// Keyed records (classes, opers, listeners, vhosts) stay: live connections
/// may hold references to them, and the committer updates them in place.
/// Unkeyed lists are rebuilt from scratch. Listeners get flagged temporary;
/// the committer clears the flag on every listener the new configuration
/// still names, and [listen_cleanup] unlinks the drained leftovers.
pub fn config_rehash(store: &mut ConfigStore) {
    store.admin.clear();
    store.ulines.clear();
    store.tlds.clear();
    store.allows.clear();
    store.excepts.clear();
    store.links.clear();
    store.bans.clear();
    store.deny_dcc.clear();
    store.deny_links.clear();
    store.deny_channels.clear();
    store.deny_versions.clear();
    store.allow_channels.clear();
    store.logs.clear();
    store.aliases.clear();
    store.helps.clear();
    store.includes.clear();
    for listener in &mut store.listeners {
        listener.temporary = true;
    }
}

/// Unlinks listeners the last rehash orphaned, once their clients are gone.
/// Returns how many were removed; the caller invokes the close-listeners
/// hook when the count is nonzero.
pub fn listen_cleanup(store: &mut ConfigStore) -> usize {
    let before = store.listeners.len();
    store
        .listeners
        .retain(|l| !(l.temporary && l.clients == 0));
    before - store.listeners.len()
}

/// Reports every listener still waiting to be bound, asking `bind` to do the
/// actual work. The network subsystem owns binding; this just walks the
/// records on its behalf.
pub fn run_configuration(
    store: &mut ConfigStore,
    mut bind: impl FnMut(&ListenerRecord) -> bool,
) {
    for listener in &mut store.listeners {
        if !listener.bound {
            if bind(listener) {
                listener.bound = true;
            } else {
                log::error!("Failed to bind to {}:{}", listener.ip, listener.port);
            }
        }
    }
}

/// A live reload. Runs the whole pipeline against a write transaction; if
/// anything fails the transaction is dropped and every lookup keeps answering
/// exactly as before. On success drained temporary listeners are unlinked and
/// `close_hook` is invoked for them before the new store is published.
pub fn rehash(
    cell: &CowCell<ConfigStore>,
    rootconf: &str,
    diag: &mut Diag,
    close_hook: impl FnOnce(),
) -> bool {
    let mut txn = cell.write();
    match init_conf(&mut txn, rootconf, true, diag) {
        Ok(()) => {
            let removed = listen_cleanup(&mut txn);
            debug!("rehash of {rootconf} succeeded, {removed} listeners unlinked");
            txn.commit();
            if removed > 0 {
                close_hook();
            }
            true
        }
        Err(err) => {
            debug!("rehash of {rootconf} failed: {err}");
            // dropping the transaction leaves the running config untouched
            false
        }
    }
}
