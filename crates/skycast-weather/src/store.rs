//! SQLite-backed forecast cache.
//!
//! One row per location in `cached_forecasts` holds the merged current
//! conditions; `cached_daily` holds the per-day breakdown and is wiped
//! together with its parent row (ON DELETE CASCADE). Replacement of a
//! location's entry is a single transaction, so a reader never observes
//! current conditions paired with daily rows from a different fetch.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::types::{CurrentConditions, DailyConditions, Forecast, Location};

/// Durable per-location forecast store with push-on-write reads.
pub struct ForecastStore {
    conn: Mutex<Connection>,
    watchers: Mutex<HashMap<String, watch::Sender<Option<Forecast>>>>,
}

impl ForecastStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an ephemeral in-memory store. Contents are lost on drop;
    /// useful for tests and previews.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(HashMap::new()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS cached_forecasts (
                location_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                country TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                timezone TEXT,
                temp_c REAL NOT NULL,
                temp_min_c REAL NOT NULL,
                temp_max_c REAL NOT NULL,
                condition TEXT NOT NULL,
                humidity_pct INTEGER,
                wind_speed_ms REAL,
                icon TEXT,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cached_daily (
                location_id TEXT NOT NULL
                    REFERENCES cached_forecasts(location_id) ON DELETE CASCADE,
                date_epoch INTEGER NOT NULL,
                temp_min_c REAL NOT NULL,
                temp_max_c REAL NOT NULL,
                condition TEXT NOT NULL,
                icon TEXT,
                PRIMARY KEY (location_id, date_epoch)
            );

            CREATE INDEX IF NOT EXISTS idx_cached_daily_location
                ON cached_daily(location_id);
            "#,
        )?;
        Ok(())
    }

    /// One-shot read of the stored forecast for a location, daily
    /// entries ordered ascending by date.
    pub fn get(&self, location_id: &str) -> Result<Option<Forecast>> {
        let conn = self.conn.lock();
        read_forecast(&conn, location_id)
    }

    /// Replace the stored forecast for `forecast.location.id` as one
    /// atomic unit, then notify subscribers for that id.
    pub fn put(&self, forecast: &Forecast) -> Result<()> {
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;

            tx.execute(
                r#"
                INSERT OR REPLACE INTO cached_forecasts
                (location_id, name, country, lat, lon, timezone,
                 temp_c, temp_min_c, temp_max_c, condition,
                 humidity_pct, wind_speed_ms, icon, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    forecast.location.id,
                    forecast.location.name,
                    forecast.location.country,
                    forecast.location.lat,
                    forecast.location.lon,
                    forecast.location.timezone,
                    forecast.current.temp_c,
                    forecast.current.temp_min_c,
                    forecast.current.temp_max_c,
                    forecast.current.condition,
                    forecast.current.humidity_pct.map(i64::from),
                    forecast.current.wind_speed_ms,
                    forecast.current.icon,
                    forecast.updated_at,
                ],
            )?;

            // Drop the old daily set for this location
            tx.execute(
                "DELETE FROM cached_daily WHERE location_id = ?1",
                params![forecast.location.id],
            )?;

            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO cached_daily
                    (location_id, date_epoch, temp_min_c, temp_max_c, condition, icon)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )?;
                for day in &forecast.daily {
                    stmt.execute(params![
                        forecast.location.id,
                        day.date_epoch,
                        day.temp_min_c,
                        day.temp_max_c,
                        day.condition,
                        day.icon,
                    ])?;
                }
            }

            tx.commit()?;
        }

        self.notify(&forecast.location.id, Some(forecast.clone()));
        Ok(())
    }

    /// Remove the stored forecast for a location; its daily rows go
    /// with it via the cascade. Subscribers observe `None`.
    pub fn delete(&self, location_id: &str) -> Result<()> {
        {
            let conn = self.conn.lock();
            conn.execute(
                "DELETE FROM cached_forecasts WHERE location_id = ?1",
                params![location_id],
            )?;
        }
        self.notify(location_id, None);
        Ok(())
    }

    /// Reactive read: the receiver holds the currently stored value and
    /// is updated after every committed write for this location id.
    pub fn subscribe(&self, location_id: &str) -> watch::Receiver<Option<Forecast>> {
        let mut watchers = self.watchers.lock();
        if let Some(tx) = watchers.get(location_id) {
            return tx.subscribe();
        }

        let current = {
            let conn = self.conn.lock();
            read_forecast(&conn, location_id).unwrap_or_else(|e| {
                tracing::warn!("forecast store read failed for {}: {}", location_id, e);
                None
            })
        };
        let (tx, rx) = watch::channel(current);
        watchers.insert(location_id.to_string(), tx);
        rx
    }

    fn notify(&self, location_id: &str, value: Option<Forecast>) {
        let watchers = self.watchers.lock();
        if let Some(tx) = watchers.get(location_id) {
            tx.send_replace(value);
        }
    }

    #[cfg(test)]
    fn daily_row_count(&self, location_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM cached_daily WHERE location_id = ?1",
            params![location_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn read_forecast(conn: &Connection, location_id: &str) -> Result<Option<Forecast>> {
    let header = conn
        .query_row(
            r#"
            SELECT location_id, name, country, lat, lon, timezone,
                   temp_c, temp_min_c, temp_max_c, condition,
                   humidity_pct, wind_speed_ms, icon, updated_at
            FROM cached_forecasts WHERE location_id = ?1
            "#,
            params![location_id],
            |row| {
                Ok((
                    Location {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        country: row.get(2)?,
                        lat: row.get(3)?,
                        lon: row.get(4)?,
                        timezone: row.get(5)?,
                    },
                    CurrentConditions {
                        temp_c: row.get(6)?,
                        temp_min_c: row.get(7)?,
                        temp_max_c: row.get(8)?,
                        condition: row.get(9)?,
                        humidity_pct: row.get::<_, Option<i64>>(10)?.map(|v| v as u8),
                        wind_speed_ms: row.get(11)?,
                        icon: row.get(12)?,
                    },
                    row.get::<_, i64>(13)?,
                ))
            },
        )
        .optional()?;

    let Some((location, current, updated_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT date_epoch, temp_min_c, temp_max_c, condition, icon
        FROM cached_daily WHERE location_id = ?1
        ORDER BY date_epoch ASC
        "#,
    )?;
    let daily = stmt
        .query_map(params![location_id], |row| {
            Ok(DailyConditions {
                date_epoch: row.get(0)?,
                temp_min_c: row.get(1)?,
                temp_max_c: row.get(2)?,
                condition: row.get(3)?,
                icon: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(Forecast {
        location,
        updated_at,
        current,
        daily,
    }))
}
