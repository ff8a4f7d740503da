//! Live game sessions and the dogs moving in them.

use crate::model::{Map, MapId};
use crate::players::PlayerId;
use log::info;
use shared::{Direction, DogState, Position, Velocity};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dog id, unique within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DogId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Dog {
    pub id: DogId,
    pub player_id: PlayerId,
    pub position: Position,
    pub velocity: Velocity,
    pub direction: Direction,
}

impl Dog {
    pub fn new(id: DogId, player_id: PlayerId, position: Position) -> Self {
        Self {
            id,
            player_id,
            position,
            velocity: Velocity::default(),
            direction: Direction::North,
        }
    }

    pub fn state(&self) -> DogState {
        DogState {
            player_id: self.player_id.0,
            position: self.position,
            velocity: self.velocity,
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    map_id: MapId,
    dogs: Vec<Dog>,
}

impl GameSession {
    pub fn new(id: SessionId, map_id: MapId) -> Self {
        Self {
            id,
            map_id,
            dogs: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn map_id(&self) -> &MapId {
        &self.map_id
    }

    pub fn add_dog(&mut self, player_id: PlayerId, position: Position) -> DogId {
        let id = DogId(self.dogs.len() as u32 + 1);
        self.dogs.push(Dog::new(id, player_id, position));
        id
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    pub fn dogs_mut(&mut self) -> &mut [Dog] {
        &mut self.dogs
    }

    pub fn dog_by_player(&self, player_id: PlayerId) -> Option<&Dog> {
        self.dogs.iter().find(|dog| dog.player_id == player_id)
    }

    pub fn dog_by_player_mut(&mut self, player_id: PlayerId) -> Option<&mut Dog> {
        self.dogs.iter_mut().find(|dog| dog.player_id == player_id)
    }
}

/// Owns every live session.
///
/// Session ids start at 1 and are never reused. The registry does not stop
/// two sessions being created for one map; callers look up first.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<GameSession>,
    next_session_id: u32,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            next_session_id: 1,
        }
    }

    pub fn find_by_map(&self, map_id: &MapId) -> Option<&GameSession> {
        self.sessions.iter().find(|s| s.map_id() == map_id)
    }

    /// Opens a session on `map`. Taking the map itself means the id has
    /// already been resolved against the catalog.
    pub fn create(&mut self, map: &Map) -> &mut GameSession {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        info!("Created session {} for map {}", id, map.id());
        self.sessions.push(GameSession::new(id, map.id().clone()));
        let index = self.sessions.len() - 1;
        &mut self.sessions[index]
    }

    pub fn get(&self, id: SessionId) -> Option<&GameSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut GameSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameSession> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameSession> {
        self.sessions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
