pub mod capabilities;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::{
  StoreError,
  ValidationError
};
pub use session::Session;
pub use store::TaskStore;
pub use task::{
  NewTask,
  Priority,
  Task
};
pub use view::{
  DashboardCounts,
  FilterStatus,
  SortBy
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskmate CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    storage::FileStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at \
         {}",
        data_dir.display()
      )
    })?;

  let timezone =
    datetime::resolve_timezone(&cfg);
  let near_window =
    cfg.near_deadline_window()?;
  let filter = cfg.default_filter()?;
  let sort = cfg.default_sort()?;
  debug!(
    timezone = %timezone.name(),
    %filter,
    %sort,
    "resolved view settings"
  );

  let store = store::TaskStore::new(
    storage,
    capabilities::SystemClock,
    capabilities::UuidGenerator,
    cfg.storage_key()
  );
  let mut session =
    session::Session::open(
      store, timezone
    )
    .with_near_window(near_window)
    .with_view(filter, sort);

  let renderer =
    render::Renderer::new(
      &cfg, timezone
    )?;

  commands::dispatch(
    &mut session,
    &renderer,
    cli.command.unwrap_or_default(),
    &mut commands::prompt_yes_no
  )?;

  info!("done");
  Ok(())
}
