use std::{thread, time::Instant};

use clap::Parser;
use tracing::{error, info, warn};

use flatdex_client::{ClientConfig, FsStore, KojiClient, PyxisClient};
use flatdex_config::Config;
use flatdex_core::{update_registries, BuildResolver, CoreError, Indexer};
use flatdex_utils::fs::ensure_dir_exists;

use cli::{Args, Command};
use logging::setup_logging;

mod cli;
mod logging;

struct Backends {
    catalog: PyxisClient,
    tracker: KojiClient,
    store: FsStore,
}

fn build_backends(config: &Config) -> Option<Backends> {
    let pyxis_url = config.pyxis_url.as_deref()?;
    let client_config = ClientConfig::default();

    Some(Backends {
        catalog: PyxisClient::new(pyxis_url, &client_config, config.page_size),
        tracker: KojiClient::new(&config.koji_url, &client_config),
        store: FsStore::new(&config.store_path),
    })
}

fn run_cycle(config: &Config, backends: &Backends, indexer: &mut Indexer) {
    let resolver = BuildResolver::new(&backends.tracker, &backends.store);
    let data = update_registries(config, &backends.catalog, &backends.tracker, &resolver);

    if let Err(err) = indexer.index(&data) {
        error!("Failed to create index: {err}");
    }
}

fn run(args: &Args) -> miette::Result<()> {
    let config = Config::load(&args.config)?;
    ensure_dir_exists(&config.work_dir).map_err(CoreError::from)?;

    let Some(backends) = build_backends(&config) else {
        warn!("No registries configured, nothing to do");
        return Ok(());
    };

    let mut indexer = Indexer::new(&config);

    match args.command {
        Command::Index => {
            run_cycle(&config, &backends, &mut indexer);
        }
        Command::Daemon => {
            let interval = config.daemon.interval()?;
            info!("Updating indexes every {}", config.daemon.update_interval);

            loop {
                let started = Instant::now();
                run_cycle(&config, &backends, &mut indexer);

                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let args = Args::parse();
    setup_logging(&args);

    if let Err(err) = run(&args) {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
