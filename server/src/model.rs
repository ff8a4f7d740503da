//! Static map catalog.
//!
//! Everything in here is built once at startup and then only read, so the
//! catalog is shared behind an `Arc` and never enters the serialized region.

use shared::{Building, MapDetail, MapSummary, Office, Road, DEFAULT_DOG_SPEED};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MapId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    DuplicateMap(MapId),
    DuplicateOffice { map: MapId, office: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::DuplicateMap(id) => write!(f, "map with id '{id}' already exists"),
            ModelError::DuplicateOffice { map, office } => {
                write!(f, "office '{office}' already exists on map '{map}'")
            }
        }
    }
}

impl std::error::Error for ModelError {}

#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    office_index: HashMap<String, usize>,
    dog_speed: Option<f64>,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            office_index: HashMap::new(),
            dog_speed: None,
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn dog_speed(&self) -> Option<f64> {
        self.dog_speed
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Fails without touching the map if the office id is taken.
    pub fn add_office(&mut self, office: Office) -> Result<(), ModelError> {
        if self.office_index.contains_key(&office.id) {
            return Err(ModelError::DuplicateOffice {
                map: self.id.clone(),
                office: office.id,
            });
        }

        self.office_index.insert(office.id.clone(), self.offices.len());
        self.offices.push(office);
        Ok(())
    }

    pub fn set_dog_speed(&mut self, speed: f64) {
        self.dog_speed = Some(speed);
    }

    pub fn summary(&self) -> MapSummary {
        MapSummary {
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }

    pub fn detail(&self) -> MapDetail {
        MapDetail {
            id: self.id.to_string(),
            name: self.name.clone(),
            roads: self.roads.clone(),
            buildings: self.buildings.clone(),
            offices: self.offices.clone(),
            dog_speed: self.dog_speed,
        }
    }
}

/// Map catalog plus game-wide settings.
#[derive(Debug, Clone)]
pub struct Game {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    default_dog_speed: f64,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(DEFAULT_DOG_SPEED)
    }
}

impl Game {
    pub fn new(default_dog_speed: f64) -> Self {
        Self {
            maps: Vec::new(),
            map_index: HashMap::new(),
            default_dog_speed,
        }
    }

    /// Appends a map, keeping insertion order.
    pub fn add_map(&mut self, map: Map) -> Result<(), ModelError> {
        if self.map_index.contains_key(map.id()) {
            return Err(ModelError::DuplicateMap(map.id().clone()));
        }

        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(map);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Map> {
        self.map_index.get(id).map(|&index| &self.maps[index])
    }

    pub fn default_dog_speed(&self) -> f64 {
        self.default_dog_speed
    }

    /// Speed of dogs on `map`, falling back to the game-wide default.
    pub fn dog_speed(&self, map: &Map) -> f64 {
        map.dog_speed().unwrap_or(self.default_dog_speed)
    }
}
