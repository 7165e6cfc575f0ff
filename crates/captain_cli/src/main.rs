//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `captain_core` linkage and database bootstrap outside any UI.
//! - Optionally load a record feed into the `stuecks` table.
//!
//! Usage: `captain_cli [DB_PATH [FEED_PATH]]`. Without arguments an
//! in-memory database is used. Set `CAPTAIN_LOG_DIR` to an absolute
//! directory to enable file logging.

use captain_core::db::{open_db, open_db_in_memory};
use captain_core::repo::record_repo::count_records;
use captain_core::{
    core_version, default_log_level, import_feed, init_logging, ActionWorkflow, RecordStore,
    Stueck,
};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::Arc;

const LOG_DIR_ENV: &str = "CAPTAIN_LOG_DIR";

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("captain_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    println!("captain_core version={}", core_version());
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        init_logging(default_log_level(), &log_dir)?;
    }

    let open = |path: Option<&String>| match path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let db_path = args.first();

    if let Some(feed_path) = args.get(1) {
        let store = RecordStore::<Stueck>::spawn(open(db_path).map_err(|err| err.to_string())?)
            .map_err(|err| err.to_string())?;
        let mut workflow = ActionWorkflow::new(Arc::new(store));
        // Seed the uniqueness check with what is already stored.
        let existing = workflow
            .store()
            .list_all()
            .map_err(|err| err.to_string())?;
        workflow.observe(Arc::new(existing));

        let feed = File::open(feed_path).map_err(|err| format!("{feed_path}: {err}"))?;
        let report =
            import_feed(&mut workflow, BufReader::new(feed)).map_err(|err| err.to_string())?;
        println!(
            "import inserted={} skipped={} rejected={}",
            report.inserted, report.skipped, report.rejected
        );
    }

    let conn = open(db_path).map_err(|err| err.to_string())?;
    let count = count_records::<Stueck>(&conn).map_err(|err| err.to_string())?;
    println!("stuecks count={count}");
    info!("event=cli_run module=cli status=ok feed={} records={count}", args.len() > 1);
    Ok(())
}
