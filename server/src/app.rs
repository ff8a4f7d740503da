use crate::model::{Game, Map, MapId};
use crate::players::{Player, PlayerDirectory, PlayerId};
use crate::session::{Dog, GameSession, SessionId, SessionRegistry};
use crate::token::TokenGenerator;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{legal_range, occupied_rects, DogState, MapSummary, Move, Position, Road, Velocity};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How often tick statistics are logged.
const TICK_LOG_INTERVAL: u64 = 100;

/// Startup options for the application.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Spawn dogs at a random spot on a random road instead of the start of
    /// the first road.
    pub randomize_spawn_points: bool,
    /// Period of the internal ticker. `None` means time only advances on
    /// explicit tick requests.
    pub tick_period: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    MapNotFound(MapId),
    UnknownToken,
    UnknownSession(SessionId),
    UnknownPlayer(PlayerId),
    /// Tick requests are refused while the internal ticker drives the clock.
    TickDisabled,
    /// The serialized region has shut down.
    Unavailable,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MapNotFound(id) => write!(f, "map '{id}' not found"),
            AppError::UnknownToken => write!(f, "player token has not been found"),
            AppError::UnknownSession(id) => write!(f, "session {id} does not exist"),
            AppError::UnknownPlayer(id) => write!(f, "player {id} has no dog"),
            AppError::TickDisabled => write!(f, "time is driven by the internal ticker"),
            AppError::Unavailable => write!(f, "application is shutting down"),
        }
    }
}

impl std::error::Error for AppError {}

/// Game façade owning all mutable simulation state.
pub struct Application {
    game: Arc<Game>,
    config: AppConfig,
    sessions: SessionRegistry,
    players: PlayerDirectory,
    tokens: TokenGenerator,
    spawn_rng: StdRng,
    tick_count: u64,
}

impl Application {
    pub fn new(game: Arc<Game>, config: AppConfig) -> Self {
        Self::with_generators(game, config, TokenGenerator::new(), StdRng::from_entropy())
    }

    pub fn with_generators(
        game: Arc<Game>,
        config: AppConfig,
        tokens: TokenGenerator,
        spawn_rng: StdRng,
    ) -> Self {
        Self {
            game,
            config,
            sessions: SessionRegistry::new(),
            players: PlayerDirectory::new(),
            tokens,
            spawn_rng,
            tick_count: 0,
        }
    }

    pub fn game(&self) -> &Arc<Game> {
        &self.game
    }

    pub fn maps(&self) -> Vec<MapSummary> {
        self.game.maps().iter().map(Map::summary).collect()
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Map> {
        self.game.find_map(id)
    }

    /// Joins `name` to the session of `map_id`, opening the session on first
    /// use. Joining again with a name already present in that session returns
    /// the existing player untouched.
    pub fn join_game(&mut self, name: &str, map_id: &MapId) -> Result<Player, AppError> {
        let game = Arc::clone(&self.game);
        let map = game
            .find_map(map_id)
            .ok_or_else(|| AppError::MapNotFound(map_id.clone()))?;

        let session_id = match self.sessions.find_by_map(map_id) {
            Some(session) => session.id(),
            None => self.sessions.create(map).id(),
        };

        if let Some(existing) = self.players.find_in_session(name, session_id) {
            debug!("Player {} rejoined session {}", existing.id, session_id);
            return Ok(existing.clone());
        }

        let spawn = self.spawn_point(map);
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(AppError::UnknownSession(session_id))?;

        let token = self.tokens.generate();
        let player = self.players.register(name, session_id, token).clone();
        session.add_dog(player.id, spawn);

        info!(
            "Player {} ({}) joined session {} at ({}, {})",
            player.id, player.name, session_id, spawn.x, spawn.y
        );
        Ok(player)
    }

    pub fn find_player_by_token(&self, token: &str) -> Option<&Player> {
        self.players.find_by_token(token)
    }

    pub fn players_in_session(&self, session_id: SessionId) -> Vec<&Player> {
        self.players.in_session(session_id)
    }

    pub fn session(&self, session_id: SessionId) -> Option<&GameSession> {
        self.sessions.get(session_id)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn session_state(&self, session_id: SessionId) -> Result<Vec<DogState>, AppError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(AppError::UnknownSession(session_id))?;
        Ok(session.dogs().iter().map(Dog::state).collect())
    }

    /// Points the player's dog in the direction of `mv` at its map's speed.
    pub fn set_velocity(&mut self, player_id: PlayerId, mv: Move) -> Result<(), AppError> {
        let session_id = self
            .players
            .get(player_id)
            .ok_or(AppError::UnknownPlayer(player_id))?
            .session_id;
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(AppError::UnknownSession(session_id))?;
        let map = self
            .game
            .find_map(session.map_id())
            .ok_or_else(|| AppError::MapNotFound(session.map_id().clone()))?;
        let speed = self.game.dog_speed(map);

        let dog = session
            .dog_by_player_mut(player_id)
            .ok_or(AppError::UnknownPlayer(player_id))?;
        dog.velocity = mv.velocity(speed);
        dog.direction = mv.direction();

        debug!(
            "Player {} moves {:?} at ({}, {})",
            player_id, mv, dog.velocity.vx, dog.velocity.vy
        );
        Ok(())
    }

    /// Advances every dog in every session by `delta_millis`.
    pub fn advance_time(&mut self, delta_millis: u64) {
        let dt = delta_millis as f64 / 1000.0;
        let game = &self.game;

        for session in self.sessions.iter_mut() {
            let Some(map) = game.find_map(session.map_id()) else {
                warn!(
                    "Session {} refers to unknown map {}",
                    session.id(),
                    session.map_id()
                );
                continue;
            };

            for dog in session.dogs_mut() {
                move_dog(dog, map.roads(), dt);
            }
        }

        self.tick_count += 1;
        if self.tick_count % TICK_LOG_INTERVAL == 0 {
            debug!(
                "Tick {}: {} sessions, {} players",
                self.tick_count,
                self.sessions.len(),
                self.players.len()
            );
        }
    }

    /// Advances time on behalf of an external tick request.
    pub fn request_tick(&mut self, delta_millis: u64) -> Result<(), AppError> {
        if self.config.tick_period.is_some() {
            return Err(AppError::TickDisabled);
        }
        self.advance_time(delta_millis);
        Ok(())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn spawn_point(&mut self, map: &Map) -> Position {
        let roads = map.roads();
        if roads.is_empty() {
            warn!("Map {} has no roads, spawning at origin", map.id());
            return Position::default();
        }

        if !self.config.randomize_spawn_points {
            return Position::from(roads[0].start());
        }

        let road = roads[self.spawn_rng.gen_range(0..roads.len())];
        random_point_on(&road, &mut self.spawn_rng)
    }
}

fn random_point_on(road: &Road, rng: &mut StdRng) -> Position {
    let (start, end) = (road.start(), road.end());
    if road.is_horizontal() {
        let x = rng.gen_range(f64::from(start.x.min(end.x))..=f64::from(start.x.max(end.x)));
        Position::new(x, f64::from(start.y))
    } else {
        let y = rng.gen_range(f64::from(start.y.min(end.y))..=f64::from(start.y.max(end.y)));
        Position::new(f64::from(start.x), y)
    }
}

/// Moves one dog, keeping it inside the road area it occupied before the
/// move. Each axis is clamped on its own, x first.
fn move_dog(dog: &mut Dog, roads: &[Road], dt: f64) {
    let rects = occupied_rects(dog.position, roads);
    let Some(range) = legal_range(&rects) else {
        warn!(
            "Dog {} of player {} is off-road at ({}, {}), holding it in place",
            dog.id.0, dog.player_id, dog.position.x, dog.position.y
        );
        dog.velocity = Velocity::default();
        return;
    };

    let (x, clamped) = range.clamp_x(dog.position.x + dog.velocity.vx * dt);
    dog.position.x = x;
    if clamped {
        dog.velocity.vx = 0.0;
    }

    let (y, clamped) = range.clamp_y(dog.position.y + dog.velocity.vy * dt);
    dog.position.y = y;
    if clamped {
        dog.velocity.vy = 0.0;
    }
}
