pub mod backend;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod dialog;
pub mod error;
pub mod filter;
pub mod render;
pub mod server;
pub mod session;
pub mod tasks;
pub mod validate;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::error::{
  ClientError,
  exit_codes
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
    "starting taskflow"
  );
  debug!(?cli.rc_overrides, "rc overrides");

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

  let runtime =
    tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  runtime.block_on(commands::dispatch(
    &cfg,
    &data_dir,
    cli.command.unwrap_or_default()
  ))?;

  info!("done");
  Ok(())
}

/// Process exit status for a failed run:
/// rejected input or credentials are the
/// user's to fix, everything else is a
/// failure.
pub fn exit_code(
  err: &anyhow::Error
) -> i32 {
  match err.downcast_ref::<ClientError>()
  {
    | Some(client_err)
      if client_err.is_user_error() =>
    {
      exit_codes::USER_ERROR
    }
    | _ => exit_codes::FAILURE
  }
}
