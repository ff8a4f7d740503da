//! # Dog Game Server Library
//!
//! This library holds the authoritative simulation for the dog game: a static
//! catalog of maps made of axis-aligned roads, a session per map in which every
//! joined player's dog moves, and the clock that advances those dogs.
//!
//! ## Core Responsibilities
//!
//! ### Map Catalog
//! Maps are loaded once at startup from a JSON file and never change. Each map
//! owns its roads, buildings and offices and may override the default dog
//! speed.
//!
//! ### Joining
//! A player joins a map by name. The first join on a map opens its session;
//! later joins reuse it. Joining hands back a 32 character hex token that
//! authenticates every later request.
//!
//! ### Movement
//! Dogs move only along roads. A road is widened into a rectangle of half
//! width 0.4 and a dog is never allowed to leave the union of the rectangles
//! it started the tick in. Hitting an edge stops the dog on that axis.
//!
//! ## Architecture Design
//!
//! ### Serialized Region
//! All mutable state lives in a single [`app::Application`] owned by one tokio
//! task. Callers talk to it through a cloneable [`strand::AppHandle`], so
//! joins, moves and ticks apply in arrival order and never interleave.
//!
//! ### Clock
//! Time advances either on explicit tick requests or, when a tick period is
//! configured, from a [`ticker::Ticker`] that feeds measured elapsed time into
//! the region. Explicit ticks are refused while the ticker runs.
//!
//! ### UDP Adapter
//! The [`network`] module exposes the application over UDP. Requests and
//! responses are bincode encoded [`shared::Packet`] values correlated by id.
//!
//! ## Module Organization
//!
//! - `model`: maps and the immutable game catalog
//! - `session`: live sessions and their dogs
//! - `players`: player records and token lookup
//! - `token`: auth token generation
//! - `app`: join orchestration and the tick
//! - `strand`: the task owning the application
//! - `ticker`: periodic clock driver
//! - `config`: command line and catalog loading
//! - `network`: UDP request handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::app::{AppConfig, Application};
//! use server::config::load_game;
//! use server::network::Server;
//! use server::strand::{self, COMMAND_QUEUE_SIZE};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let game = Arc::new(load_game(Path::new("maps.json"))?);
//!     let app = Application::new(game, AppConfig::default());
//!     let (handle, _region) = strand::spawn(app, COMMAND_QUEUE_SIZE);
//!
//!     let mut server = Server::new("127.0.0.1:8080", handle).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod model;
pub mod network;
pub mod players;
pub mod session;
pub mod strand;
pub mod ticker;
pub mod token;
