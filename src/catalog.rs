//! Monitoring catalog: sites, threshold ladders, alert templates and phrases.
//!
//! Loaded once from a TOML file at startup and never mutated afterwards.
//!
//! ```toml
//! [phrases]
//! warning_headline = "WARNING"
//!
//! [[areas]]
//! id = 1
//! name = "Repacking"
//!
//! [[doors]]
//! id = 1
//! name = "Repacking entrance"
//! area = 1
//!
//! [[thresholds.temperature]]
//! area = 1
//! no = 1
//! upper_critical = 10.0
//!
//! [[messages]]
//! area = 1
//! kind = "temperature"
//! upper_critical = "({headline}) {location}: {value}°C {phrase} ({limit}°C). {instruction}"
//! ```

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

use crate::{
    db::models::SensorKind,
    sites::{Area, Door, SiteDirectory},
    thresholds::{
        messages::{MessageCatalog, MessageTemplate, Phrases},
        ThresholdLadder, ThresholdTable,
    },
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("area {0} is defined more than once")]
    DuplicateArea(i32),

    #[error("door {0} is defined more than once")]
    DuplicateDoor(i32),

    #[error("door {door} references unknown area {area}")]
    UnknownDoorArea { door: i32, area: i32 },

    #[error("{kind} ladder for area {area} sensor {no} is defined more than once")]
    DuplicateLadder { kind: SensorKind, area: i32, no: i32 },

    #[error("invalid {kind} ladder for area {area} sensor {no}: {reason}")]
    InvalidLadder {
        kind: SensorKind,
        area: i32,
        no: i32,
        reason: String,
    },

    #[error("{kind} messages for area {area} are defined more than once")]
    DuplicateTemplate { kind: SensorKind, area: i32 },

    #[error("{0} readings do not have thresholds, so they cannot have messages")]
    UnsupportedTemplateKind(SensorKind),
}

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    phrases: Phrases,
    #[serde(default)]
    areas: Vec<Area>,
    #[serde(default)]
    doors: Vec<Door>,
    #[serde(default)]
    thresholds: ThresholdsFile,
    #[serde(default)]
    messages: Vec<MessageEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdsFile {
    #[serde(default)]
    temperature: Vec<LadderEntry>,
    #[serde(default)]
    humidity: Vec<LadderEntry>,
}

#[derive(Debug, Deserialize)]
struct LadderEntry {
    area: i32,
    #[serde(default = "default_sensor_no")]
    no: i32,
    #[serde(flatten)]
    ladder: ThresholdLadder,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    area: i32,
    kind: SensorKind,
    #[serde(flatten)]
    template: MessageTemplate,
}

fn default_sensor_no() -> i32 {
    1
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub sites: SiteDirectory,
    pub thresholds: ThresholdTable,
    pub messages: MessageCatalog,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        Self::from_file(file)
    }

    fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut area_ids = HashSet::new();
        for area in &file.areas {
            if !area_ids.insert(area.id) {
                return Err(CatalogError::DuplicateArea(area.id));
            }
        }

        let mut door_ids = HashSet::new();
        for door in &file.doors {
            if !door_ids.insert(door.id) {
                return Err(CatalogError::DuplicateDoor(door.id));
            }
            if !area_ids.contains(&door.area) {
                return Err(CatalogError::UnknownDoorArea {
                    door: door.id,
                    area: door.area,
                });
            }
        }

        let mut ladders = HashMap::new();
        let sections = [
            (SensorKind::Temperature, file.thresholds.temperature),
            (SensorKind::Humidity, file.thresholds.humidity),
        ];
        for (kind, entries) in sections {
            for LadderEntry { area, no, ladder } in entries {
                ladder.validate().map_err(|reason| CatalogError::InvalidLadder {
                    kind,
                    area,
                    no,
                    reason,
                })?;
                if !area_ids.contains(&area) {
                    warn!(kind = %kind, area, no, "Ladder configured for an area missing from [[areas]]");
                }
                match ladders.entry((kind, area, no)) {
                    Entry::Occupied(_) => return Err(CatalogError::DuplicateLadder { kind, area, no }),
                    Entry::Vacant(slot) => {
                        slot.insert(ladder);
                    }
                }
            }
        }

        let mut templates = HashMap::new();
        for MessageEntry { area, kind, template } in file.messages {
            if kind == SensorKind::Proximity {
                return Err(CatalogError::UnsupportedTemplateKind(kind));
            }
            match templates.entry((kind, area)) {
                Entry::Occupied(_) => return Err(CatalogError::DuplicateTemplate { kind, area }),
                Entry::Vacant(slot) => {
                    slot.insert(template);
                }
            }
        }

        Ok(Self {
            sites: SiteDirectory::new(file.areas, file.doors),
            thresholds: ThresholdTable::new(ladders),
            messages: MessageCatalog::new(templates, file.phrases),
        })
    }
}
