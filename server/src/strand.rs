//! Serialized execution region for all mutable game state
//!
//! The [`Application`] is moved into a single task. Everything that reads or
//! changes sessions, dogs or players is sent to that task as a [`Command`]
//! and handled in arrival order, so a request racing a tick sees either the
//! whole tick or none of it. The map catalog is immutable and is read
//! straight from the shared [`Game`] without a round trip.

use crate::app::{AppError, Application};
use crate::model::{Game, MapId};
use crate::players::Player;
use log::{debug, info};
use shared::{DogState, MapDetail, MapSummary, Move, PlayerInfo};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Default depth of the command queue.
pub const COMMAND_QUEUE_SIZE: usize = 1000;

type Reply<T> = oneshot::Sender<Result<T, AppError>>;

/// Messages handled inside the region
#[derive(Debug)]
pub enum Command {
    Join {
        name: String,
        map_id: MapId,
        reply: Reply<Player>,
    },
    Players {
        token: String,
        reply: Reply<Vec<PlayerInfo>>,
    },
    State {
        token: String,
        reply: Reply<Vec<DogState>>,
    },
    Move {
        token: String,
        mv: Move,
        reply: Reply<()>,
    },
    /// Tick from an external request. Refused while the ticker runs.
    RequestTick { delta_millis: u64, reply: Reply<()> },
    /// Tick from the internal ticker.
    TimerTick { delta_millis: u64, reply: Reply<()> },
}

/// Reply to a command that is already queued in the region.
///
/// Queuing fixes the command's place in the order; awaiting the reply can
/// happen later and on another task without affecting that order.
#[derive(Debug)]
pub struct Pending<T> {
    response: oneshot::Receiver<Result<T, AppError>>,
}

impl<T> Pending<T> {
    pub async fn wait(self) -> Result<T, AppError> {
        self.response.await.map_err(|_| AppError::Unavailable)?
    }
}

/// Cloneable entry point into the region
///
/// The `queue_*` methods return once the command is in the queue. The plain
/// methods also wait for the result.
#[derive(Debug, Clone)]
pub struct AppHandle {
    commands: mpsc::Sender<Command>,
    game: Arc<Game>,
}

impl AppHandle {
    pub fn maps(&self) -> Vec<MapSummary> {
        self.game.maps().iter().map(|map| map.summary()).collect()
    }

    pub fn find_map(&self, id: &MapId) -> Option<MapDetail> {
        self.game.find_map(id).map(|map| map.detail())
    }

    pub async fn queue_join(
        &self,
        name: &str,
        map_id: &MapId,
    ) -> Result<Pending<Player>, AppError> {
        self.queue(|reply| Command::Join {
            name: name.to_string(),
            map_id: map_id.clone(),
            reply,
        })
        .await
    }

    pub async fn queue_players(
        &self,
        token: &str,
    ) -> Result<Pending<Vec<PlayerInfo>>, AppError> {
        self.queue(|reply| Command::Players {
            token: token.to_string(),
            reply,
        })
        .await
    }

    pub async fn queue_state(&self, token: &str) -> Result<Pending<Vec<DogState>>, AppError> {
        self.queue(|reply| Command::State {
            token: token.to_string(),
            reply,
        })
        .await
    }

    pub async fn queue_velocity(&self, token: &str, mv: Move) -> Result<Pending<()>, AppError> {
        self.queue(|reply| Command::Move {
            token: token.to_string(),
            mv,
            reply,
        })
        .await
    }

    pub async fn queue_tick(&self, delta_millis: u64) -> Result<Pending<()>, AppError> {
        self.queue(|reply| Command::RequestTick {
            delta_millis,
            reply,
        })
        .await
    }

    pub async fn join_game(&self, name: &str, map_id: &MapId) -> Result<Player, AppError> {
        self.queue_join(name, map_id).await?.wait().await
    }

    pub async fn players(&self, token: &str) -> Result<Vec<PlayerInfo>, AppError> {
        self.queue_players(token).await?.wait().await
    }

    pub async fn state(&self, token: &str) -> Result<Vec<DogState>, AppError> {
        self.queue_state(token).await?.wait().await
    }

    pub async fn set_velocity(&self, token: &str, mv: Move) -> Result<(), AppError> {
        self.queue_velocity(token, mv).await?.wait().await
    }

    pub async fn tick(&self, delta_millis: u64) -> Result<(), AppError> {
        self.queue_tick(delta_millis).await?.wait().await
    }

    pub(crate) async fn timer_tick(&self, delta_millis: u64) -> Result<(), AppError> {
        self.queue(|reply| Command::TimerTick {
            delta_millis,
            reply,
        })
        .await?
        .wait()
        .await
    }

    async fn queue<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<Pending<T>, AppError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| AppError::Unavailable)?;
        Ok(Pending { response })
    }
}

/// Moves `app` into its own task and returns a handle to it.
///
/// The task ends once every handle is dropped, yielding the application
/// back so its final state can be inspected.
pub fn spawn(app: Application, queue_size: usize) -> (AppHandle, JoinHandle<Application>) {
    let (commands, receiver) = mpsc::channel(queue_size);
    let handle = AppHandle {
        commands,
        game: Arc::clone(app.game()),
    };
    let task = tokio::spawn(run(app, receiver));
    (handle, task)
}

async fn run(mut app: Application, mut commands: mpsc::Receiver<Command>) -> Application {
    debug!("Application region started");
    while let Some(command) = commands.recv().await {
        handle_command(&mut app, command);
    }
    info!("Application region stopped after {} ticks", app.tick_count());
    app
}

/// Applies one command. Send errors only mean the caller stopped waiting.
fn handle_command(app: &mut Application, command: Command) {
    match command {
        Command::Join {
            name,
            map_id,
            reply,
        } => {
            let _ = reply.send(app.join_game(&name, &map_id));
        }
        Command::Players { token, reply } => {
            let result = app
                .find_player_by_token(&token)
                .map(|player| player.session_id)
                .ok_or(AppError::UnknownToken)
                .map(|session_id| {
                    app.players_in_session(session_id)
                        .into_iter()
                        .map(Player::info)
                        .collect()
                });
            let _ = reply.send(result);
        }
        Command::State { token, reply } => {
            let result = app
                .find_player_by_token(&token)
                .map(|player| player.session_id)
                .ok_or(AppError::UnknownToken)
                .and_then(|session_id| app.session_state(session_id));
            let _ = reply.send(result);
        }
        Command::Move { token, mv, reply } => {
            let result = match app.find_player_by_token(&token).map(|player| player.id) {
                Some(player_id) => app.set_velocity(player_id, mv),
                None => Err(AppError::UnknownToken),
            };
            let _ = reply.send(result);
        }
        Command::RequestTick {
            delta_millis,
            reply,
        } => {
            let _ = reply.send(app.request_tick(delta_millis));
        }
        Command::TimerTick {
            delta_millis,
            reply,
        } => {
            app.advance_time(delta_millis);
            let _ = reply.send(Ok(()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;
    use crate::model::Map;
    use shared::{Point, Road};

    fn test_app() -> Application {
        let mut game = Game::new(2.0);
        let mut map = Map::new(MapId::new("park"), "Park");
        map.add_road(Road::horizontal(Point::new(0, 0), 20));
        game.add_map(map).unwrap();
        Application::new(Arc::new(game), AppConfig::default())
    }

    #[tokio::test]
    async fn test_join_through_handle() {
        let (handle, task) = spawn(test_app(), 16);

        let player = handle.join_game("Rex", &MapId::new("park")).await.unwrap();
        let again = handle.join_game("Rex", &MapId::new("park")).await.unwrap();
        assert_eq!(player, again);

        let err = handle
            .join_game("Rex", &MapId::new("moon"))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::MapNotFound(MapId::new("moon")));

        drop(handle);
        let app = task.await.unwrap();
        assert_eq!(app.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_move_and_tick_through_handle() {
        let (handle, task) = spawn(test_app(), 16);
        let player = handle.join_game("Rex", &MapId::new("park")).await.unwrap();
        let token = player.token.as_str();

        handle.set_velocity(token, Move::Right).await.unwrap();
        handle.tick(1500).await.unwrap();

        let state = handle.state(token).await.unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].position.x, 3.0);
        assert_eq!(state[0].direction.code(), "R");

        drop(handle);
        assert_eq!(task.await.unwrap().tick_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let (handle, _task) = spawn(test_app(), 16);
        let stranger = "ffffffffffffffffffffffffffffffff";

        assert_eq!(handle.players(stranger).await, Err(AppError::UnknownToken));
        assert_eq!(handle.state(stranger).await, Err(AppError::UnknownToken));
        assert_eq!(
            handle.set_velocity(stranger, Move::Up).await,
            Err(AppError::UnknownToken)
        );
    }

    #[tokio::test]
    async fn test_players_roster() {
        let (handle, _task) = spawn(test_app(), 16);
        let rex = handle.join_game("Rex", &MapId::new("park")).await.unwrap();
        handle.join_game("Fido", &MapId::new("park")).await.unwrap();

        let roster = handle.players(rex.token.as_str()).await.unwrap();
        let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Rex", "Fido"]);
    }

    #[tokio::test]
    async fn test_queued_commands_apply_in_queue_order() {
        let (handle, _task) = spawn(test_app(), 16);
        let player = handle.join_game("Rex", &MapId::new("park")).await.unwrap();
        let token = player.token.as_str();

        let right = handle.queue_velocity(token, Move::Right).await.unwrap();
        let tick = handle.queue_tick(1000).await.unwrap();
        let stop = handle.queue_velocity(token, Move::Stop).await.unwrap();

        // Waiting in reverse does not change the order of application
        stop.wait().await.unwrap();
        tick.wait().await.unwrap();
        right.wait().await.unwrap();

        let state = handle.state(token).await.unwrap();
        assert_eq!(state[0].position.x, 2.0);
        assert!(state[0].velocity.is_zero());
        assert_eq!(state[0].direction.code(), "U");
    }

    #[tokio::test]
    async fn test_catalog_reads_skip_region() {
        let (handle, task) = spawn(test_app(), 16);
        task.abort();
        let _ = task.await;

        // Region is gone but the catalog is still readable
        assert_eq!(handle.maps().len(), 1);
        assert_eq!(handle.find_map(&MapId::new("park")).unwrap().roads.len(), 1);
        assert!(handle.find_map(&MapId::new("moon")).is_none());
        assert_eq!(handle.tick(10).await, Err(AppError::Unavailable));
    }

    #[test]
    fn test_handle_command_directly() {
        let mut app = test_app();
        let (reply, mut response) = oneshot::channel();
        handle_command(
            &mut app,
            Command::Join {
                name: "Rex".to_string(),
                map_id: MapId::new("park"),
                reply,
            },
        );
        let player = tokio_test::assert_ok!(response.try_recv().unwrap());
        assert_eq!(player.name, "Rex");

        let (reply, response) = oneshot::channel();
        handle_command(
            &mut app,
            Command::TimerTick {
                delta_millis: 16,
                reply,
            },
        );
        tokio_test::block_on(async { tokio_test::assert_ok!(response.await.unwrap()) });
        assert_eq!(app.tick_count(), 1);
    }
}
