use clap::Parser;
use concread::cowcell::CowCell;
use log::{error, info};

use rookd::cli::{Cli, setup_logging};
use rookd::conf::diag::Diag;
use rookd::conf::rehash::{init_conf, rehash};
use rookd::conf::store::ConfigStore;
use rookd::error::RookdError;
use rookd::resolver;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let cli = Cli::parse();
    let _logger = setup_logging(&cli)?;
    let rootconf = cli.config();

    let store = CowCell::new(ConfigStore::new());
    let mut diag = Diag::new(false);

    {
        let mut txn = store.write();
        match init_conf(&mut txn, &rootconf, false, &mut diag) {
            Ok(()) => txn.commit(),
            Err(RookdError::Internal(msg)) => {
                // committing a validated tree failed; that's a bug, not a
                // config problem, and there is no sane state to carry on with
                error!("commit failed after clean validation: {msg}");
                std::process::abort();
            }
            Err(err) => {
                error!("could not boot with {rootconf}: {err}");
                std::process::exit(1);
            }
        }
    }

    if cli.config_check() {
        println!("{}", store.read().as_json_pretty());
        println!("Configuration test of {rootconf} passed OK");
        return Ok(());
    }

    let res = resolver::init();
    info!(
        "resolver ready: domain \"{}\", {} nameserver(s)",
        res.defdname,
        res.nameservers.len()
    );

    diag.set_booted(true);
    if let Some(me) = &store.read().me {
        info!("{} ({}) configured, numeric {}", me.name, me.info, me.numeric);
    }

    run_until_shutdown(&store, &rootconf, &mut diag).await
}

#[cfg(unix)]
async fn run_until_shutdown(
    store: &CowCell<ConfigStore>,
    rootconf: &str,
    diag: &mut Diag,
) -> Result<(), std::io::Error> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hup = signal(SignalKind::hangup())?;
    let mut term = signal(SignalKind::terminate())?;
    loop {
        tokio::select! {
            _ = hup.recv() => {
                info!("SIGHUP received, rehashing {rootconf}");
                if rehash(store, rootconf, diag, || info!("closing orphaned listeners")) {
                    info!("rehash complete");
                } else {
                    error!("rehash failed, running configuration unchanged");
                }
            }
            _ = term.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn run_until_shutdown(
    _store: &CowCell<ConfigStore>,
    _rootconf: &str,
    _diag: &mut Diag,
) -> Result<(), std::io::Error> {
    tokio::signal::ctrl_c().await?;
    info!("interrupted, shutting down");
    Ok(())
}
