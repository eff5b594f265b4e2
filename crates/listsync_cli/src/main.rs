//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `listsync_core` linkage and database bootstrap from a shell.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `listsync_cli [DB_PATH]`. Without a path an in-memory database is
//! used.

use listsync_core::db::migrations::current_user_version;
use listsync_core::db::{open_db, open_db_in_memory};
use listsync_core::{allowed_targets, SyncStatus};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("listsync_core ping={}", listsync_core::ping());
    println!("listsync_core version={}", listsync_core::core_version());

    let opened = match std::env::args().nth(1) {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("listsync_core db=error error={err}");
            return ExitCode::FAILURE;
        }
    };
    match current_user_version(&conn) {
        Ok(version) => println!("listsync_core schema_version={version}"),
        Err(err) => {
            eprintln!("listsync_core schema_version=error error={err}");
            return ExitCode::FAILURE;
        }
    }

    for from in SyncStatus::ALL {
        let targets = allowed_targets(from)
            .into_iter()
            .map(SyncStatus::as_str)
            .collect::<Vec<_>>()
            .join(",");
        println!("listsync_core transitions from={from} to={targets}");
    }

    ExitCode::SUCCESS
}
