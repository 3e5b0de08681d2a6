//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the six parcel data-access operations over the `parcel` table.
//! - Enforce the registered-only rule for address edits and deletion.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Rows are mapped positionally from `SELECT *`: the table's physical
//!   column order must be `number, client, status, address, created_at`.
//! - Guarded writes re-check `status = 'registered'` in their WHERE clause,
//!   so a status change between the read and the write cannot be overwritten.
//! - The repository never logs. Store failures are returned annotated with
//!   the operation and the parcel number or client id.
//! - A guarded address update that changes no row while the parcel still
//!   reads `registered` is retried once, then reported as `NotApplied`.

use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, STATUS_REGISTERED};
use rusqlite::{named_params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const INSERT_SQL: &str = "INSERT INTO parcel (client, status, address, created_at) \
     VALUES (:client, :status, :address, :created_at)";
const SELECT_BY_NUMBER_SQL: &str = "SELECT * FROM parcel WHERE number = :number";
const SELECT_BY_CLIENT_SQL: &str = "SELECT * FROM parcel WHERE client = :client";
const UPDATE_STATUS_SQL: &str = "UPDATE parcel SET status = :status WHERE number = :number";
const UPDATE_ADDRESS_SQL: &str =
    "UPDATE parcel SET address = :address WHERE number = :number AND status = :registered";
const DELETE_SQL: &str = "DELETE FROM parcel WHERE number = :number AND status = :registered";

pub type RepoResult<T> = Result<T, RepoError>;

/// Subject a failed write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Parcel(ParcelNumber),
    Client(ClientId),
}

impl Display for WriteTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parcel(number) => write!(f, "parcel {number}"),
            Self::Client(client) => write!(f, "parcel of client {client}"),
        }
    }
}

/// Errors from parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Insert, update or delete statement failed.
    Persistence {
        operation: &'static str,
        target: WriteTarget,
        source: rusqlite::Error,
    },
    /// Insert ran but the generated number could not be obtained.
    ///
    /// The row may already exist.
    IdentifierRetrieval { client: ClientId, reason: String },
    /// Point read failed, including the no-matching-row case.
    NotFoundOrRead {
        number: ParcelNumber,
        source: rusqlite::Error,
    },
    /// Client listing failed; `partial` holds rows read before the failure.
    Query {
        client: ClientId,
        partial: Vec<Parcel>,
        source: rusqlite::Error,
    },
    /// Address edit attempted on a parcel that left `registered`.
    InvalidState { number: ParcelNumber, status: String },
    /// Guarded write changed no row although the parcel still reads as
    /// `registered`, even after one retry.
    NotApplied {
        operation: &'static str,
        number: ParcelNumber,
    },
    /// Underlying SQLite error outside the data operations.
    Db(DbError),
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is absent or not at its expected position.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether this is a point read that matched no row.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFoundOrRead {
                source: rusqlite::Error::QueryReturnedNoRows,
                ..
            }
        )
    }

    /// Parcels materialized before a listing failed, if any.
    pub fn partial(&self) -> Option<&[Parcel]> {
        match self {
            Self::Query { partial, .. } => Some(partial.as_slice()),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence {
                operation,
                target,
                source,
            } => write!(f, "{operation}: failed to write {target}: {source}"),
            Self::IdentifierRetrieval { client, reason } => write!(
                f,
                "add: parcel of client {client} was inserted but its number is unavailable: {reason}"
            ),
            Self::NotFoundOrRead { number, source } => {
                write!(f, "get: failed to read parcel {number}: {source}")
            }
            Self::Query {
                client,
                partial,
                source,
            } => write!(
                f,
                "get_by_client: failed to read parcels of client {client} after {} rows: {source}",
                partial.len()
            ),
            Self::InvalidState { number, status } => write!(
                f,
                "parcel {number} has status `{status}`; only `{STATUS_REGISTERED}` parcels can be changed"
            ),
            Self::NotApplied { operation, number } => write!(
                f,
                "{operation}: write to parcel {number} was not applied; the store kept the row unchanged"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "parcel repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "parcel repository requires column `{column}` at its position in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence { source, .. } => Some(source),
            Self::NotFoundOrRead { source, .. } => Some(source),
            Self::Query { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::IdentifierRetrieval { .. } => None,
            Self::InvalidState { .. } => None,
            Self::NotApplied { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for parcel records.
pub trait ParcelRepository {
    /// Inserts a parcel and returns its store-generated number.
    ///
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;

    /// Reads one parcel by number.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;

    /// Reads every parcel of `client` in store order (not guaranteed to be
    /// creation order). No rows is an empty vec, not an error.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;

    /// Overwrites the status. Any status, any current state; an unknown
    /// number is not an error.
    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()>;

    /// Changes the address of a `registered` parcel.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;

    /// Deletes a `registered` parcel. Any other status is a silent no-op.
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
}

/// SQLite-backed parcel repository over an injected connection.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Wraps a connection without checking its schema.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Wraps a connection after verifying the `parcel` table and its column
    /// layout.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        let inserted = self
            .conn
            .execute(
                INSERT_SQL,
                named_params! {
                    ":client": parcel.client,
                    ":status": parcel.status,
                    ":address": parcel.address,
                    ":created_at": parcel.created_at
                },
            )
            .map_err(|source| RepoError::Persistence {
                operation: "add",
                target: WriteTarget::Client(parcel.client),
                source,
            })?;

        if inserted != 1 {
            return Err(RepoError::IdentifierRetrieval {
                client: parcel.client,
                reason: format!("expected 1 inserted row, store reported {inserted}"),
            });
        }

        let number = self.conn.last_insert_rowid();
        if number <= 0 {
            return Err(RepoError::IdentifierRetrieval {
                client: parcel.client,
                reason: format!("store returned rowid {number}"),
            });
        }

        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        self.conn
            .query_row(
                SELECT_BY_NUMBER_SQL,
                named_params! { ":number": number },
                parse_parcel_row,
            )
            .map_err(|source| RepoError::NotFoundOrRead { number, source })
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let query_failed = |partial: Vec<Parcel>, source: rusqlite::Error| RepoError::Query {
            client,
            partial,
            source,
        };

        let mut stmt = self
            .conn
            .prepare(SELECT_BY_CLIENT_SQL)
            .map_err(|source| query_failed(Vec::new(), source))?;
        let mut rows = stmt
            .query(named_params! { ":client": client })
            .map_err(|source| query_failed(Vec::new(), source))?;

        let mut parcels = Vec::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(source) => return Err(query_failed(parcels, source)),
            };
            match parse_parcel_row(row) {
                Ok(parcel) => parcels.push(parcel),
                Err(source) => return Err(query_failed(parcels, source)),
            }
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: &str) -> RepoResult<()> {
        self.conn
            .execute(
                UPDATE_STATUS_SQL,
                named_params! { ":status": status, ":number": number },
            )
            .map_err(|source| RepoError::Persistence {
                operation: "set_status",
                target: WriteTarget::Parcel(number),
                source,
            })?;
        Ok(())
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        let current = self.get(number)?;
        if !current.is_registered() {
            return Err(RepoError::InvalidState {
                number,
                status: current.status,
            });
        }

        if self.update_registered_address(number, address)? > 0 {
            return Ok(());
        }

        // Status moved (or the row vanished) after the read above.
        let current = self.get(number)?;
        if !current.is_registered() {
            return Err(RepoError::InvalidState {
                number,
                status: current.status,
            });
        }

        if self.update_registered_address(number, address)? > 0 {
            return Ok(());
        }
        Err(RepoError::NotApplied {
            operation: "set_address",
            number,
        })
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        let current = self.get(number)?;
        if !current.is_registered() {
            return Ok(());
        }

        // Zero rows here means the status moved after the read: same no-op.
        self.conn
            .execute(
                DELETE_SQL,
                named_params! { ":number": number, ":registered": STATUS_REGISTERED },
            )
            .map_err(|source| RepoError::Persistence {
                operation: "delete",
                target: WriteTarget::Parcel(number),
                source,
            })?;

        Ok(())
    }
}

impl SqliteParcelRepository<'_> {
    /// Runs the guarded address update and returns the changed row count.
    fn update_registered_address(
        &self,
        number: ParcelNumber,
        address: &str,
    ) -> RepoResult<usize> {
        self.conn
            .execute(
                UPDATE_ADDRESS_SQL,
                named_params! {
                    ":address": address,
                    ":number": number,
                    ":registered": STATUS_REGISTERED
                },
            )
            .map_err(|source| RepoError::Persistence {
                operation: "set_address",
                target: WriteTarget::Parcel(number),
                source,
            })
    }
}

fn parse_parcel_row(row: &Row<'_>) -> rusqlite::Result<Parcel> {
    Ok(Parcel {
        number: row.get(0)?,
        client: row.get(1)?,
        status: row.get(2)?,
        address: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    let columns = table_columns(conn, PARCEL_TABLE)?;
    for (position, column) in PARCEL_COLUMNS.into_iter().enumerate() {
        if columns.get(position).map(String::as_str) != Some(column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Column names in physical (`cid`) order.
fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
