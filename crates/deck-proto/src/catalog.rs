use crate::protocol::{Station, StationStatus};
use crate::store::{self, KvStore};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Built-in station list, restored on reset or when nothing else survives.
const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Scheme of session-local media handles (local files registered at runtime).
/// Such URLs die with the process and are never persisted.
pub const SESSION_LOCAL_SCHEME: &str = "blob:";

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("station id '{0}' already exists")]
    DuplicateId(String),
    #[error("station url is empty")]
    EmptyUrl,
}

pub fn is_session_local(url: &str) -> bool {
    url.starts_with(SESSION_LOCAL_SCHEME)
}

/// Ordered station list plus the default set it falls back to.
#[derive(Debug, Clone)]
pub struct StationCatalog {
    stations: Vec<Station>,
    defaults: Vec<Station>,
}

impl StationCatalog {
    pub fn new(defaults: Vec<Station>) -> Self {
        Self {
            stations: defaults.clone(),
            defaults,
        }
    }

    /// Load the persisted list, dropping session-local entries. Falls back to
    /// the defaults when nothing is stored, the value is unreadable or every
    /// entry was dropped.
    pub fn load(store: &dyn KvStore, defaults: Vec<Station>) -> Self {
        let mut catalog = Self::new(defaults);
        match store::load_json::<Vec<Station>>(store, store::KEY_CUSTOM_STATIONS) {
            Ok(Some(saved)) => {
                let kept: Vec<Station> = saved
                    .into_iter()
                    .filter(|s| !is_session_local(&s.url))
                    .collect();
                if kept.is_empty() {
                    debug!("stored catalog empty after filtering, using defaults");
                } else {
                    catalog.stations = kept;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("ignoring stored catalog: {}", e),
        }
        catalog
    }

    pub fn persist(&self, store: &dyn KvStore) -> store::Result<()> {
        let durable: Vec<&Station> = self
            .stations
            .iter()
            .filter(|s| !is_session_local(&s.url))
            .collect();
        store::save_json(store, store::KEY_CUSTOM_STATIONS, &durable)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.stations.iter().position(|s| s.id == id)
    }

    pub fn first(&self) -> Option<&Station> {
        self.stations.first()
    }

    /// `custom-<millis>`, suffixed until unique.
    pub fn custom_id(&self, now_millis: i64) -> String {
        let base = format!("custom-{now_millis}");
        if self.get(&base).is_none() {
            return base;
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|id| self.get(id).is_none())
            .unwrap_or(base)
    }

    pub fn add(&mut self, station: Station) -> Result<(), CatalogError> {
        if station.url.trim().is_empty() {
            return Err(CatalogError::EmptyUrl);
        }
        if self.get(&station.id).is_some() {
            return Err(CatalogError::DuplicateId(station.id));
        }
        self.stations.push(station);
        Ok(())
    }

    /// Remove by id, returning the former index and the station.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Station)> {
        let idx = self.index_of(id)?;
        Some((idx, self.stations.remove(idx)))
    }

    pub fn reset(&mut self) {
        self.stations = self.defaults.clone();
    }

    /// Returns true when the station exists and was not already offline.
    pub fn mark_offline(&mut self, id: &str) -> bool {
        match self.stations.iter_mut().find(|s| s.id == id) {
            Some(s) if s.status != StationStatus::Offline => {
                s.status = StationStatus::Offline;
                true
            }
            _ => false,
        }
    }

    /// Drop offline stations; restores the defaults when none remain.
    /// Returns the number removed.
    pub fn clear_offline(&mut self) -> usize {
        let before = self.stations.len();
        self.stations.retain(|s| !s.is_offline());
        let removed = before - self.stations.len();
        if self.stations.is_empty() {
            self.reset();
        }
        removed
    }

    /// Circular scan from `from` in `forward` direction skipping offline
    /// stations, bounded by the catalog length. After a full lap the landing
    /// index is accepted even if offline. `from = None` starts before the
    /// first station (forward) or after the last (backward).
    pub fn scan(&self, from: Option<usize>, forward: bool) -> Option<usize> {
        let len = self.stations.len();
        if len == 0 {
            return None;
        }
        let mut idx = match (from, forward) {
            (Some(i), _) => i.min(len - 1),
            (None, true) => len - 1,
            (None, false) => 0,
        };
        let mut attempts = 0;
        loop {
            idx = if forward {
                (idx + 1) % len
            } else {
                (idx + len - 1) % len
            };
            attempts += 1;
            if !self.stations[idx].is_offline() || attempts >= len {
                return Some(idx);
            }
        }
    }
}

// ── TOML station loader ───────────────────────────────────────────────────────

/// Intermediate struct that matches the TOML `[[station]]` table.
/// Kept apart from `Station` so the file schema can carry optional fields.
#[derive(Debug, serde::Deserialize)]
struct TomlStationFile {
    station: Vec<TomlStation>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlStation {
    id: String,
    name: String,
    url: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    logo: String,
}

pub fn load_stations_from_toml(path: &std::path::Path) -> anyhow::Result<Vec<Station>> {
    let content = std::fs::read_to_string(path)?;
    parse_stations_from_toml_str(&content)
}

pub fn parse_stations_from_toml_str(content: &str) -> anyhow::Result<Vec<Station>> {
    let file: TomlStationFile = toml::from_str(content)?;
    let mut stations: Vec<Station> = Vec::with_capacity(file.station.len());
    for s in file.station {
        if stations.iter().any(|existing| existing.id == s.id) {
            anyhow::bail!("duplicate station id '{}'", s.id);
        }
        stations.push(Station {
            id: s.id,
            name: s.name,
            url: s.url,
            genre: s.genre,
            country: s.country,
            color: s.color,
            logo: s.logo,
            status: StationStatus::Ok,
        });
    }
    Ok(stations)
}

/// The embedded catalog.
pub fn builtin_stations() -> Vec<Station> {
    parse_stations_from_toml_str(BUILTIN_CATALOG).unwrap_or_else(|e| {
        error!("built-in catalog is malformed: {}", e);
        Vec::new()
    })
}

/// Defaults from `override_path` when it exists and parses, else built-in.
pub fn default_stations(override_path: Option<&std::path::Path>) -> Vec<Station> {
    if let Some(path) = override_path.filter(|p| p.exists()) {
        match load_stations_from_toml(path) {
            Ok(stations) if !stations.is_empty() => {
                debug!("loaded {} stations from {}", stations.len(), path.display());
                return stations;
            }
            Ok(_) => warn!("{} has no stations, using built-in list", path.display()),
            Err(e) => warn!("failed to read {}: {}", path.display(), e),
        }
    }
    builtin_stations()
}
