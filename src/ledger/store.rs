//! SQLite-backed fill log and position ledger
//!
//! Two tables, both owned exclusively by [`Ledger`]:
//!
//! - `fills` — append-only log of executed trades, unique on
//!   `(trade_id, network)`. Redelivered fills hit the unique key and are
//!   absorbed without a position update.
//! - `positions` — one mutable aggregate row per `(coin, network)`,
//!   maintained by [`crate::ledger::accounting`].
//!
//! `record_fill` commits the fill insert and the position upsert in a single
//! transaction; the fill insert runs first, so the transaction holds the
//! write lock for the whole read-modify-write. SQLite serializes writers
//! across connections and processes, which makes concurrent updates to the
//! same `(coin, network)` row safe without any in-process locking.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::common::errors::Result;
use crate::common::types::{Fill, FillFilter, Network, Position, RecordOutcome, Side};
use crate::config::types::DatabaseConfig;
use crate::ledger::accounting::PositionState;

/// The position ledger: append-only fill log plus per-coin aggregates
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Connect with explicit pool settings and bootstrap the schema
    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    /// Connect to a database URL with default pool settings
    pub async fn connect(url: &str) -> Result<Self> {
        let config = DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        };
        Self::connect_with(&config).await
    }

    /// Create tables and indexes if they don't exist yet
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trade_id INTEGER NOT NULL,
                order_id INTEGER NOT NULL,
                coin TEXT NOT NULL,
                side TEXT NOT NULL,
                price REAL NOT NULL,
                size REAL NOT NULL,
                fee REAL NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL,
                closed_pnl REAL NOT NULL DEFAULT 0,
                hash TEXT,
                crossed INTEGER,
                dir TEXT,
                start_position TEXT,
                fee_token TEXT,
                builder_fee REAL,
                network TEXT NOT NULL,
                received_at TEXT NOT NULL,
                UNIQUE(trade_id, network)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                coin TEXT NOT NULL,
                network TEXT NOT NULL,
                net_size REAL NOT NULL DEFAULT 0,
                average_entry_price REAL NOT NULL DEFAULT 0,
                total_cost REAL NOT NULL DEFAULT 0,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (coin, network)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_fills_network_timestamp ON fills(network, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_network ON positions(network)")
            .execute(&self.pool)
            .await?;

        info!("Ledger schema initialized");
        Ok(())
    }

    /// Record one fill, applying it to the position aggregate exactly once
    ///
    /// Validates the fill, then in a single transaction:
    /// 1. Inserts it into the append-only log. If `(trade_id, network)` is
    ///    already present the insert is a no-op and the call returns
    ///    `applied: false` with the current position, untouched.
    /// 2. Otherwise reads the current aggregate, applies the fill through
    ///    [`PositionState::apply`], and upserts the position row.
    ///
    /// Storage failures roll back both writes and propagate; the ledger
    /// never retries internally.
    pub async fn record_fill(&self, fill: &Fill, network: Network) -> Result<RecordOutcome> {
        fill.validate()?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO fills (
                trade_id, order_id, coin, side, price, size, fee, timestamp,
                closed_pnl, hash, crossed, dir, start_position, fee_token,
                builder_fee, network, received_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trade_id, network) DO NOTHING
            "#,
        )
        .bind(fill.trade_id)
        .bind(fill.order_id)
        .bind(&fill.coin)
        .bind(fill.side.as_str())
        .bind(fill.price)
        .bind(fill.size)
        .bind(fill.fee)
        .bind(fill.timestamp)
        .bind(fill.closed_pnl)
        .bind(&fill.hash)
        .bind(fill.crossed)
        .bind(&fill.dir)
        .bind(&fill.start_position)
        .bind(&fill.fee_token)
        .bind(fill.builder_fee)
        .bind(network.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Redelivered fill: report the current aggregate without touching it
            let position = fetch_position(&mut tx, &fill.coin, network)
                .await?
                .unwrap_or_else(|| Position::flat(&fill.coin, network));
            tx.commit().await?;
            debug!(
                trade_id = fill.trade_id,
                coin = %fill.coin,
                network = %network,
                "Duplicate fill skipped"
            );
            return Ok(RecordOutcome {
                applied: false,
                position,
            });
        }

        let current = fetch_position(&mut tx, &fill.coin, network)
            .await?
            .map(|p| PositionState {
                net_size: p.net_size,
                average_entry_price: p.average_entry_price,
                total_cost: p.total_cost,
            })
            .unwrap_or_else(PositionState::flat);

        let updated = current.apply(fill.side, fill.price, fill.size);
        let last_updated = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO positions (coin, network, net_size, average_entry_price, total_cost, last_updated)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(coin, network) DO UPDATE SET
                net_size = excluded.net_size,
                average_entry_price = excluded.average_entry_price,
                total_cost = excluded.total_cost,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&fill.coin)
        .bind(network.as_str())
        .bind(updated.net_size)
        .bind(updated.average_entry_price)
        .bind(updated.total_cost)
        .bind(last_updated.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            trade_id = fill.trade_id,
            coin = %fill.coin,
            network = %network,
            side = %fill.side,
            size = fill.size,
            price = fill.price,
            net_size = updated.net_size,
            avg_entry = updated.average_entry_price,
            "Fill applied"
        );

        Ok(RecordOutcome {
            applied: true,
            position: Position {
                coin: fill.coin.clone(),
                network,
                net_size: updated.net_size,
                average_entry_price: updated.average_entry_price,
                total_cost: updated.total_cost,
                last_updated,
            },
        })
    }

    /// The current aggregate for one coin, if a row exists
    pub async fn position(&self, coin: &str, network: Network) -> Result<Option<Position>> {
        let row = sqlx::query(
            "SELECT coin, network, net_size, average_entry_price, total_cost, last_updated \
             FROM positions WHERE coin = ? AND network = ?",
        )
        .bind(coin)
        .bind(network.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| position_from_row(&r)).transpose()
    }

    /// All positions with a non-zero net size on the given network
    ///
    /// Order is unspecified; callers sort if they need to.
    pub async fn list_open_positions(&self, network: Network) -> Result<Vec<Position>> {
        let rows = sqlx::query(
            "SELECT coin, network, net_size, average_entry_price, total_cost, last_updated \
             FROM positions WHERE network = ? AND net_size != 0",
        )
        .bind(network.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(position_from_row).collect()
    }

    /// Fills for a network, newest first, with optional time-range filter
    pub async fn list_fills(&self, network: Network, filter: &FillFilter) -> Result<Vec<Fill>> {
        let rows = sqlx::query(
            r#"
            SELECT trade_id, order_id, coin, side, price, size, fee, timestamp,
                   closed_pnl, hash, crossed, dir, start_position, fee_token, builder_fee
            FROM fills
            WHERE network = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(network.as_str())
        .bind(filter.since.unwrap_or(i64::MIN))
        .bind(filter.until.unwrap_or(i64::MAX))
        .bind(filter.limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(fill_from_row).collect()
    }
}

async fn fetch_position(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    coin: &str,
    network: Network,
) -> Result<Option<Position>> {
    let row = sqlx::query(
        "SELECT coin, network, net_size, average_entry_price, total_cost, last_updated \
         FROM positions WHERE coin = ? AND network = ?",
    )
    .bind(coin)
    .bind(network.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|r| position_from_row(&r)).transpose()
}

fn position_from_row(row: &SqliteRow) -> Result<Position> {
    let network: String = row.try_get("network")?;
    let last_updated: String = row.try_get("last_updated")?;
    Ok(Position {
        coin: row.try_get("coin")?,
        network: network.parse()?,
        net_size: row.try_get("net_size")?,
        average_entry_price: row.try_get("average_entry_price")?,
        total_cost: row.try_get("total_cost")?,
        last_updated: DateTime::parse_from_rfc3339(&last_updated)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn fill_from_row(row: &SqliteRow) -> Result<Fill> {
    let side: String = row.try_get("side")?;
    Ok(Fill {
        trade_id: row.try_get("trade_id")?,
        order_id: row.try_get("order_id")?,
        coin: row.try_get("coin")?,
        side: Side::from_str(&side)?,
        price: row.try_get("price")?,
        size: row.try_get("size")?,
        fee: row.try_get("fee")?,
        timestamp: row.try_get("timestamp")?,
        closed_pnl: row.try_get("closed_pnl")?,
        hash: row.try_get("hash")?,
        crossed: row.try_get("crossed")?,
        dir: row.try_get("dir")?,
        start_position: row.try_get("start_position")?,
        fee_token: row.try_get("fee_token")?,
        builder_fee: row.try_get("builder_fee")?,
    })
}
