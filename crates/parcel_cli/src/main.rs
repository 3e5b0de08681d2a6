//! `parcel` command-line front end.
//!
//! # Responsibility
//! - Expose parcel lifecycle operations over a SQLite file.
//! - Print one JSON document per result line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use parcel_core::db::{open_db, open_db_in_memory};
use parcel_core::{
    default_log_level, init_logging, ClientId, ParcelNumber, ParcelService, RepoResult,
    SqliteParcelRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "parcel", version, about = "Track parcels in a SQLite database")]
struct Cli {
    /// Database file; an in-memory database is used when omitted.
    #[arg(long, env = "PARCEL_DB", global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for log files; logging is off when omitted.
    #[arg(long, env = "PARCEL_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[arg(long, default_value_t = default_log_level().to_string(), global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new parcel for a client.
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Show one parcel.
    Get {
        #[arg(long)]
        number: ParcelNumber,
    },
    /// List all parcels of a client.
    List {
        #[arg(long)]
        client: ClientId,
    },
    /// Overwrite a parcel status.
    SetStatus {
        #[arg(long)]
        number: ParcelNumber,
        #[arg(long)]
        status: String,
    },
    /// Move a parcel to its next lifecycle status.
    Advance {
        #[arg(long)]
        number: ParcelNumber,
    },
    /// Change the address of a registered parcel.
    SetAddress {
        #[arg(long)]
        number: ParcelNumber,
        #[arg(long)]
        address: String,
    },
    /// Delete a registered parcel.
    Delete {
        #[arg(long)]
        number: ParcelNumber,
    },
    /// Walk a throwaway parcel through its whole lifecycle.
    Demo {
        #[arg(long, default_value_t = 1)]
        client: ClientId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let conn = open_connection(cli.db.as_ref())?;
    let repo = SqliteParcelRepository::try_new(&conn).context("parcel database is not ready")?;
    let service = ParcelService::new(repo);

    info!("event=cli_command module=cli status=start command={:?}", cli.command);
    run(&service, cli.command)
}

fn open_connection(path: Option<&PathBuf>) -> Result<Connection> {
    match path {
        Some(path) => open_db(path)
            .with_context(|| format!("failed to open parcel database `{}`", path.display())),
        None => open_db_in_memory().context("failed to open in-memory parcel database"),
    }
}

fn run(service: &ParcelService<SqliteParcelRepository<'_>>, command: Command) -> Result<()> {
    match command {
        Command::Register { client, address } => {
            let parcel = service.register(client, address)?;
            println!("{}", serde_json::to_string(&parcel)?);
        }
        Command::Get { number } => {
            println!("{}", serde_json::to_string(&service.get(number)?)?);
        }
        Command::List { client } => {
            for parcel in service.client_parcels(client)? {
                println!("{}", serde_json::to_string(&parcel)?);
            }
        }
        Command::SetStatus { number, status } => {
            service.set_status(number, &status)?;
            println!("{}", json!({ "number": number, "status": status }));
        }
        Command::Advance { number } => {
            let status = service.next_status(number)?;
            println!("{}", json!({ "number": number, "status": status }));
        }
        Command::SetAddress { number, address } => {
            service.change_address(number, &address)?;
            println!("{}", json!({ "number": number, "address": address }));
        }
        Command::Delete { number } => {
            println!("{}", delete_and_report(service, number)?);
        }
        Command::Demo { client } => run_demo(service, client)?,
    }
    Ok(())
}

/// Deletes and re-reads the parcel; non-registered parcels survive the call.
fn delete_and_report(
    service: &ParcelService<SqliteParcelRepository<'_>>,
    number: ParcelNumber,
) -> RepoResult<Value> {
    service.delete(number)?;
    match service.get(number) {
        Ok(kept) => Ok(json!({ "number": number, "deleted": false, "status": kept.status })),
        Err(err) if err.is_not_found() => Ok(json!({ "number": number, "deleted": true })),
        Err(err) => Err(err),
    }
}

fn run_demo(service: &ParcelService<SqliteParcelRepository<'_>>, client: ClientId) -> Result<()> {
    let parcel = service.register(client, "Pskov, Voennaya st. 15")?;
    println!("{}", json!({ "step": "register", "parcel": parcel }));

    service.change_address(parcel.number, "Saratov, Verkhnyaya st. 3")?;
    println!("{}", json!({ "step": "change_address", "parcel": service.get(parcel.number)? }));

    let status = service.next_status(parcel.number)?;
    println!("{}", json!({ "step": "next_status", "number": parcel.number, "status": status }));

    match service.change_address(parcel.number, "Moscow") {
        Ok(()) => anyhow::bail!("address change after dispatch was accepted"),
        Err(err) => println!(
            "{}",
            json!({ "step": "change_address_rejected", "error": err.to_string() })
        ),
    }

    service.delete(parcel.number)?;
    println!(
        "{}",
        json!({ "step": "delete_ignored", "parcel": service.get(parcel.number)? })
    );

    let status = service.next_status(parcel.number)?;
    println!("{}", json!({ "step": "next_status", "number": parcel.number, "status": status }));

    let fresh = service.register(client, "Kazan, Bolshaya st. 8")?;
    service.delete(fresh.number)?;
    println!(
        "{}",
        json!({
            "step": "delete",
            "number": fresh.number,
            "remaining": service.client_parcels(client)?,
        })
    );

    Ok(())
}
