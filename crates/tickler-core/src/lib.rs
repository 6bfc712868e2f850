pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod engine;
pub mod error;
pub mod notify;
pub mod render;
pub mod stats;
pub mod store;
pub mod task;
pub mod timer;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use crate::engine::{AutoComplete, Engine, KeepPending, ReminderHandler};
use crate::notify::{DesktopNotifier, Notifier, NullNotifier};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting tickler CLI");
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.rcfile.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let store = store::FileStore::open(&data_dir)
        .with_context(|| format!("failed to open store at {}", data_dir.display()))?;

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    let notifier: Box<dyn Notifier> = if cfg.get_bool("notify").unwrap_or(true) {
        Box::new(DesktopNotifier)
    } else {
        Box::new(NullNotifier)
    };

    // One-shot commands must not finalize tasks behind the user's back, so
    // past-due fires during their reconciliation keep the task pending.
    // The watch loop applies the configured post-fire policy.
    let handler: Box<dyn ReminderHandler> = if inv.command == "watch" {
        match cfg.get("on_fire").as_deref() {
            Some("keep") => Box::new(KeepPending),
            _ => Box::new(AutoComplete),
        }
    } else {
        Box::new(KeepPending)
    };

    let mut engine = Engine::new(Box::new(store), notifier, handler);

    commands::dispatch(&mut engine, &cfg, &mut renderer, inv)?;

    info!("done");
    Ok(())
}
