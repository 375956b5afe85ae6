//! Static location catalog with a persisted selection.
//!
//! The set of supported locations ships with the app; only the selected
//! location id is persisted, as a single scalar preference.

use std::path::Path;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::types::Location;

const SELECTED_KEY: &str = "selected_location_id";

/// id, name, country, lat, lon, IANA timezone
const SUPPORTED_LOCATIONS: &[(&str, &str, &str, f64, f64, &str)] = &[
    ("1668341", "Taipei", "TW", 25.0478, 121.5318, "Asia/Taipei"),
    ("1816670", "Tokyo", "JP", 35.6895, 139.6917, "Asia/Tokyo"),
    ("1850147", "Naha", "JP", 26.2124, 127.6792, "Asia/Tokyo"),
    ("2643743", "London", "GB", 51.5074, -0.1278, "Europe/London"),
    ("5128581", "New York", "US", 40.7128, -74.006, "America/New_York"),
    (
        "5391959",
        "San Francisco",
        "US",
        37.7749,
        -122.4194,
        "America/Los_Angeles",
    ),
    (
        "5368361",
        "Los Angeles",
        "US",
        34.0522,
        -118.2437,
        "America/Los_Angeles",
    ),
    ("2950158", "Berlin", "DE", 52.52, 13.405, "Europe/Berlin"),
    ("2995469", "Marseille", "FR", 43.2965, 5.3698, "Europe/Paris"),
    ("2147714", "Sydney", "AU", -33.8688, 151.2093, "Australia/Sydney"),
];

/// Catalog of known locations plus the persisted selection.
pub struct LocationCatalog {
    conn: Mutex<Connection>,
    locations: Vec<Location>,
    selected_tx: watch::Sender<String>,
}

impl LocationCatalog {
    /// Open the catalog with its selection preference stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a catalog whose selection does not persist. Useful for
    /// tests and previews.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        let locations: Vec<Location> = SUPPORTED_LOCATIONS
            .iter()
            .map(|&(id, name, country, lat, lon, timezone)| Location {
                id: id.to_string(),
                name: name.to_string(),
                country: country.to_string(),
                lat,
                lon,
                timezone: Some(timezone.to_string()),
            })
            .collect();

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM prefs WHERE key = ?1",
                params![SELECTED_KEY],
                |row| row.get(0),
            )
            .optional()?;

        // Unset or stale ids fall back to the first catalog entry; the
        // default is computed, not persisted, until the first select.
        let selected = stored
            .filter(|id| locations.iter().any(|l| &l.id == id))
            .unwrap_or_else(|| locations[0].id.clone());

        let (selected_tx, _) = watch::channel(selected);

        Ok(Self {
            conn: Mutex::new(conn),
            locations,
            selected_tx,
        })
    }

    /// All known locations, in catalog order.
    pub fn list(&self) -> &[Location] {
        &self.locations
    }

    /// Case-insensitive substring search over name and country. A blank
    /// query returns the full catalog.
    pub fn search(&self, query: &str) -> Vec<Location> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.locations.clone();
        }
        self.locations
            .iter()
            .filter(|l| {
                l.name.to_lowercase().contains(&needle)
                    || l.country.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Look a location up by id.
    pub fn find(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Reactive selected-location-id stream: current value immediately,
    /// republished on every `select`.
    pub fn selected(&self) -> watch::Receiver<String> {
        self.selected_tx.subscribe()
    }

    /// Persist a new selection and republish it. Unknown ids are
    /// rejected.
    pub fn select(&self, id: &str) -> Result<()> {
        if self.find(id).is_none() {
            bail!("unknown location id: {}", id);
        }

        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT OR REPLACE INTO prefs (key, value) VALUES (?1, ?2)",
                params![SELECTED_KEY, id],
            )?;
        }

        self.selected_tx.send_replace(id.to_string());
        Ok(())
    }
}
