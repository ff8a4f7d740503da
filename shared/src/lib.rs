pub mod geometry;

pub use geometry::{
    cross, legal_range, occupied_rects, Building, Office, Offset, Point, Position, Rect, Road,
    Size, Velocity, ROAD_HALF_WIDTH,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dog speed used by maps that do not configure their own.
pub const DEFAULT_DOG_SPEED: f64 = 1.0;

/// Number of hex characters in an auth token.
pub const TOKEN_LEN: usize = 32;

/// Largest datagram either side will send.
pub const MAX_PACKET_SIZE: usize = 65_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Single-letter code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
        }
    }
}

/// A movement command issued by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
    Stop,
}

impl Move {
    pub fn from_code(code: &str) -> Result<Self, MoveCodeError> {
        match code {
            "U" => Ok(Move::Up),
            "D" => Ok(Move::Down),
            "L" => Ok(Move::Left),
            "R" => Ok(Move::Right),
            "" => Ok(Move::Stop),
            other => Err(MoveCodeError(other.to_string())),
        }
    }

    /// Facing after the move. Stopping faces north.
    pub fn direction(&self) -> Direction {
        match self {
            Move::Up | Move::Stop => Direction::North,
            Move::Down => Direction::South,
            Move::Left => Direction::West,
            Move::Right => Direction::East,
        }
    }

    /// Velocity for a dog moving at `speed`. North is negative y.
    pub fn velocity(&self, speed: f64) -> Velocity {
        match self {
            Move::Up => Velocity::new(0.0, -speed),
            Move::Down => Velocity::new(0.0, speed),
            Move::Left => Velocity::new(-speed, 0.0),
            Move::Right => Velocity::new(speed, 0.0),
            Move::Stop => Velocity::default(),
        }
    }
}

impl FromStr for Move {
    type Err = MoveCodeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Move::from_code(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCodeError(pub String);

impl fmt::Display for MoveCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid move code '{}'", self.0)
    }
}

impl std::error::Error for MoveCodeError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDetail {
    pub id: String,
    pub name: String,
    pub roads: Vec<Road>,
    pub buildings: Vec<Building>,
    pub offices: Vec<Office>,
    pub dog_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogState {
    pub player_id: u32,
    pub position: Position,
    pub velocity: Velocity,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    MapNotFound,
    InvalidArgument,
    InvalidToken,
    UnknownToken,
    BadRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    ListMaps,
    GetMap { map_id: String },
    Join { user_name: String, map_id: String },
    Players { token: String },
    State { token: String },
    Action { token: String, direction: String },
    Tick { time_delta: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Maps(Vec<MapSummary>),
    Map(MapDetail),
    Joined { auth_token: String, player_id: u32 },
    Players(Vec<PlayerInfo>),
    State(Vec<DogState>),
    Ack,
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Request { id: u32, request: Request },
    Response { id: u32, response: Response },
}

/// True if `token` has the shape of an issued auth token.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.chars().all(|ch| ch.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_move_codes() {
        assert_eq!(Move::from_code("U"), Ok(Move::Up));
        assert_eq!(Move::from_code("D"), Ok(Move::Down));
        assert_eq!(Move::from_code("L"), Ok(Move::Left));
        assert_eq!(Move::from_code("R"), Ok(Move::Right));
        assert_eq!(Move::from_code(""), Ok(Move::Stop));
        assert_eq!("R".parse::<Move>(), Ok(Move::Right));
    }

    #[test]
    fn test_invalid_move_code() {
        let err = Move::from_code("X").unwrap_err();
        assert_eq!(err, MoveCodeError("X".to_string()));
        assert_eq!(err.to_string(), "invalid move code 'X'");
        assert!(Move::from_code("u").is_err());
        assert!(Move::from_code("UU").is_err());
    }

    #[test]
    fn test_move_velocity_and_facing() {
        let left = Move::Left.velocity(2.5);
        assert_approx_eq!(left.vx, -2.5);
        assert_approx_eq!(left.vy, 0.0);
        assert_eq!(Move::Left.direction(), Direction::West);

        let up = Move::Up.velocity(3.0);
        assert_approx_eq!(up.vx, 0.0);
        assert_approx_eq!(up.vy, -3.0);
        assert_eq!(Move::Up.direction(), Direction::North);

        assert!(Move::Stop.velocity(3.0).is_zero());
        assert_eq!(Move::Stop.direction(), Direction::North);
        assert_eq!(Move::Down.direction(), Direction::South);
        assert_eq!(Move::Right.direction(), Direction::East);
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(Direction::North.code(), "U");
        assert_eq!(Direction::South.code(), "D");
        assert_eq!(Direction::West.code(), "L");
        assert_eq!(Direction::East.code(), "R");
        assert_eq!(Direction::default(), Direction::North);
    }

    #[test]
    fn test_token_shape() {
        assert!(is_well_formed_token("0123456789abcdef0123456789ABCDEF"));
        assert!(!is_well_formed_token("0123456789abcdef"));
        assert!(!is_well_formed_token("0123456789abcdef0123456789abcdeg"));
        assert!(!is_well_formed_token(""));
    }

    #[test]
    fn test_packet_serialization_join() {
        let packet = Packet::Request {
            id: 7,
            request: Request::Join {
                user_name: "Rex".to_string(),
                map_id: "map1".to_string(),
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, packet);
    }

    #[test]
    fn test_packet_serialization_map_detail() {
        let detail = MapDetail {
            id: "map1".to_string(),
            name: "Map 1".to_string(),
            roads: vec![
                Road::horizontal(Point::new(0, 0), 40),
                Road::vertical(Point::new(40, 0), 30),
            ],
            buildings: vec![Building {
                position: Point::new(5, 5),
                size: Size {
                    width: 30,
                    height: 20,
                },
            }],
            offices: vec![Office {
                id: "o0".to_string(),
                position: Point::new(40, 30),
                offset: Offset { dx: 5, dy: 0 },
            }],
            dog_speed: Some(4.0),
        };
        let packet = Packet::Response {
            id: 1,
            response: Response::Map(detail),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Response {
                id,
                response: Response::Map(detail),
            } => {
                assert_eq!(id, 1);
                assert_eq!(detail.roads.len(), 2);
                assert!(detail.roads[1].is_vertical());
                assert_eq!(detail.offices[0].id, "o0");
                assert_eq!(detail.dog_speed, Some(4.0));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
