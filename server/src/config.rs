//! Command line and map catalog loading.

use crate::app::AppConfig;
use crate::model::{Game, Map, MapId, ModelError};
use clap::Parser;
use log::info;
use serde::Deserialize;
use shared::{Building, Office, Offset, Point, Road, Size, DEFAULT_DOG_SPEED};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Dog game server")]
pub struct Args {
    /// Map catalog (JSON)
    #[clap(short, long, value_name = "FILE")]
    pub config_file: PathBuf,
    /// Tick period in milliseconds; without it time advances on tick requests
    #[clap(short, long, value_name = "MILLISECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_period: Option<u64>,
    /// Spawn dogs at random points on random roads
    #[clap(long)]
    pub randomize_spawn_points: bool,
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
}

impl Args {
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            randomize_spawn_points: self.randomize_spawn_points,
            tick_period: self.tick_period.map(Duration::from_millis),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    InvalidRoad { map: String, index: usize },
    Model(ModelError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "malformed map catalog: {e}"),
            ConfigError::InvalidRoad { map, index } => {
                write!(f, "road {index} on map '{map}' needs exactly one of x1 or y1")
            }
            ConfigError::Model(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Model(e) => Some(e),
            ConfigError::InvalidRoad { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<ModelError> for ConfigError {
    fn from(e: ModelError) -> Self {
        ConfigError::Model(e)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameConfig {
    #[serde(default = "default_dog_speed")]
    default_dog_speed: f64,
    maps: Vec<MapConfig>,
}

fn default_dog_speed() -> f64 {
    DEFAULT_DOG_SPEED
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapConfig {
    id: String,
    name: String,
    dog_speed: Option<f64>,
    #[serde(default)]
    roads: Vec<RoadConfig>,
    #[serde(default)]
    buildings: Vec<BuildingConfig>,
    #[serde(default)]
    offices: Vec<OfficeConfig>,
}

#[derive(Debug, Deserialize)]
struct RoadConfig {
    x0: i32,
    y0: i32,
    x1: Option<i32>,
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BuildingConfig {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeConfig {
    id: String,
    x: i32,
    y: i32,
    offset_x: i32,
    offset_y: i32,
}

impl RoadConfig {
    fn to_road(&self) -> Option<Road> {
        let start = Point::new(self.x0, self.y0);
        match (self.x1, self.y1) {
            (Some(x1), None) => Some(Road::horizontal(start, x1)),
            (None, Some(y1)) => Some(Road::vertical(start, y1)),
            _ => None,
        }
    }
}

impl MapConfig {
    fn into_map(self) -> Result<Map, ConfigError> {
        let mut map = Map::new(MapId::new(self.id.as_str()), self.name);

        for (index, road) in self.roads.iter().enumerate() {
            let road = road.to_road().ok_or_else(|| ConfigError::InvalidRoad {
                map: self.id.clone(),
                index,
            })?;
            map.add_road(road);
        }

        for b in self.buildings {
            map.add_building(Building {
                position: Point::new(b.x, b.y),
                size: Size {
                    width: b.w,
                    height: b.h,
                },
            });
        }

        for o in self.offices {
            map.add_office(Office {
                id: o.id,
                position: Point::new(o.x, o.y),
                offset: Offset {
                    dx: o.offset_x,
                    dy: o.offset_y,
                },
            })?;
        }

        if let Some(speed) = self.dog_speed {
            map.set_dog_speed(speed);
        }

        Ok(map)
    }
}

/// Builds the map catalog from its JSON text.
pub fn parse_game(json: &str) -> Result<Game, ConfigError> {
    let config: GameConfig = serde_json::from_str(json)?;
    let mut game = Game::new(config.default_dog_speed);

    for map in config.maps {
        game.add_map(map.into_map()?)?;
    }

    Ok(game)
}

/// Reads and parses the map catalog at `path`.
pub fn load_game(path: &Path) -> Result<Game, ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let game = parse_game(&json)?;
    info!("Loaded {} maps from {}", game.maps().len(), path.display());
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "defaultDogSpeed": 3.0,
        "maps": [
            {
                "id": "map1",
                "name": "Map 1",
                "roads": [
                    { "x0": 0, "y0": 0, "x1": 40 },
                    { "x0": 40, "y0": 0, "y1": 30 }
                ],
                "buildings": [ { "x": 5, "y": 5, "w": 30, "h": 20 } ],
                "offices": [ { "id": "o0", "x": 40, "y": 30, "offsetX": 5, "offsetY": 0 } ]
            },
            {
                "id": "town",
                "name": "Town",
                "dogSpeed": 7.5,
                "roads": [ { "x0": 0, "y0": 0, "y1": 10 } ],
                "buildings": [],
                "offices": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_catalog() {
        let game = parse_game(CATALOG).unwrap();
        assert_eq!(game.default_dog_speed(), 3.0);
        assert_eq!(game.maps().len(), 2);

        let map1 = game.find_map(&MapId::new("map1")).unwrap();
        assert_eq!(map1.name(), "Map 1");
        assert_eq!(map1.roads().len(), 2);
        assert!(map1.roads()[0].is_horizontal());
        assert_eq!(map1.roads()[0].end(), Point::new(40, 0));
        assert!(map1.roads()[1].is_vertical());
        assert_eq!(map1.roads()[1].end(), Point::new(40, 30));
        assert_eq!(map1.buildings()[0].size.width, 30);
        assert_eq!(map1.offices()[0].offset, Offset { dx: 5, dy: 0 });
        assert_eq!(game.dog_speed(map1), 3.0);

        let town = game.find_map(&MapId::new("town")).unwrap();
        assert_eq!(game.dog_speed(town), 7.5);
    }

    #[test]
    fn test_default_speed_when_absent() {
        let game = parse_game(r#"{ "maps": [] }"#).unwrap();
        assert_eq!(game.default_dog_speed(), DEFAULT_DOG_SPEED);
    }

    #[test]
    fn test_road_needs_one_end() {
        let json = r#"{ "maps": [ { "id": "m", "name": "M",
            "roads": [ { "x0": 0, "y0": 0, "x1": 4 }, { "x0": 0, "y0": 0 } ] } ] }"#;
        let err = parse_game(json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoad { index: 1, .. }));

        let json = r#"{ "maps": [ { "id": "m", "name": "M",
            "roads": [ { "x0": 0, "y0": 0, "x1": 4, "y1": 4 } ] } ] }"#;
        assert!(matches!(
            parse_game(json).unwrap_err(),
            ConfigError::InvalidRoad { index: 0, .. }
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{ "maps": [ { "id": "m", "name": "M" }, { "id": "m", "name": "N" } ] }"#;
        assert!(matches!(
            parse_game(json).unwrap_err(),
            ConfigError::Model(ModelError::DuplicateMap(_))
        ));

        let json = r#"{ "maps": [ { "id": "m", "name": "M", "offices": [
            { "id": "o", "x": 0, "y": 0, "offsetX": 0, "offsetY": 0 },
            { "id": "o", "x": 1, "y": 1, "offsetX": 0, "offsetY": 0 } ] } ] }"#;
        assert!(matches!(
            parse_game(json).unwrap_err(),
            ConfigError::Model(ModelError::DuplicateOffice { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_game("{ not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_game(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "server",
            "--config-file",
            "maps.json",
            "--tick-period",
            "50",
            "--randomize-spawn-points",
        ])
        .unwrap();

        assert_eq!(args.config_file, PathBuf::from("maps.json"));
        assert_eq!(args.address(), "127.0.0.1:8080");
        let config = args.app_config();
        assert!(config.randomize_spawn_points);
        assert_eq!(config.tick_period, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_args_reject_zero_tick_period() {
        assert!(Args::try_parse_from(["server", "-c", "maps.json", "-t", "0"]).is_err());
        assert!(Args::try_parse_from(["server"]).is_err());

        let args = Args::try_parse_from(["server", "-c", "maps.json"]).unwrap();
        assert!(args.app_config().tick_period.is_none());
        assert!(!args.app_config().randomize_spawn_points);
    }
}
