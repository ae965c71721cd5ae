use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Area {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Door {
    pub id: i32,
    pub name: String,
    pub area: i32,
}

/// Resolved naming for a door, with placeholders filled in for unknown ids.
#[derive(Debug, Clone, PartialEq)]
pub struct DoorInfo {
    pub name: String,
    pub area_id: Option<i32>,
    pub area_name: String,
}

/// Read-only area / door naming lookups.
#[derive(Debug, Clone, Default)]
pub struct SiteDirectory {
    areas: HashMap<i32, Area>,
    doors: HashMap<i32, Door>,
}

impl SiteDirectory {
    pub fn new(areas: impl IntoIterator<Item = Area>, doors: impl IntoIterator<Item = Door>) -> Self {
        Self {
            areas: areas.into_iter().map(|a| (a.id, a)).collect(),
            doors: doors.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub fn area_name(&self, area_id: i32) -> String {
        match self.areas.get(&area_id) {
            Some(area) => area.name.clone(),
            None => format!("Area {area_id} (unknown name)"),
        }
    }

    pub fn door_info(&self, door_id: i32) -> DoorInfo {
        match self.doors.get(&door_id) {
            Some(door) => DoorInfo {
                name: door.name.clone(),
                area_id: Some(door.area),
                area_name: self.area_name(door.area),
            },
            None => DoorInfo {
                name: format!("Door {door_id} (unknown name)"),
                area_id: None,
                area_name: "unknown area".to_owned(),
            },
        }
    }

    pub fn contains_area(&self, area_id: i32) -> bool {
        self.areas.contains_key(&area_id)
    }

    /// Areas ordered by id.
    pub fn areas(&self) -> Vec<&Area> {
        let mut areas: Vec<&Area> = self.areas.values().collect();
        areas.sort_by_key(|a| a.id);
        areas
    }

    /// Doors ordered by id.
    pub fn doors(&self) -> Vec<&Door> {
        let mut doors: Vec<&Door> = self.doors.values().collect();
        doors.sort_by_key(|d| d.id);
        doors
    }
}
