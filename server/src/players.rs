//! Player identities and token lookup
//!
//! This module keeps the server-side record of every player that ever joined:
//! - Sequential player id assignment across all sessions
//! - Session membership for roster queries
//! - Bearer token indexing for authenticating later requests
//!
//! Players are never removed; a token stays valid for the lifetime of the
//! process.

use crate::session::SessionId;
use crate::token::Token;
use shared::PlayerInfo;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A joined player
///
/// The session id is a back-reference used for lookups only; the session
/// itself belongs to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Unique player identifier, starting from 1
    pub id: PlayerId,
    /// Display name chosen on join
    pub name: String,
    /// Session the player's dog lives in
    pub session_id: SessionId,
    /// Credential for every later request
    pub token: Token,
}

impl Player {
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.0,
            name: self.name.clone(),
        }
    }
}

/// Registry of all players
///
/// Stores players in join order and keeps a token index so authenticating a
/// request is a single hash lookup rather than a scan.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    /// Players in join order; `players[i].id == i + 1`
    players: Vec<Player>,
    /// Token to position in `players`
    token_index: HashMap<Token, usize>,
}

impl PlayerDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new player in `session_id`
    ///
    /// Assigns the next sequential id. The caller is responsible for
    /// checking that the name is not already taken in the session and for
    /// supplying a fresh token.
    pub fn register(&mut self, name: &str, session_id: SessionId, token: Token) -> &Player {
        let index = self.players.len();
        let player = Player {
            id: PlayerId(index as u32 + 1),
            name: name.to_string(),
            session_id,
            token: token.clone(),
        };

        self.token_index.insert(token, index);
        self.players.push(player);
        &self.players[index]
    }

    /// Looks up a player by id
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.players.get(index)
    }

    /// Resolves a bearer token to its player
    ///
    /// Matching is exact; no normalisation of case or whitespace is done.
    pub fn find_by_token(&self, token: &str) -> Option<&Player> {
        self.token_index
            .get(token)
            .map(|&index| &self.players[index])
    }

    /// Finds the player called `name` in `session_id`, if any
    pub fn find_in_session(&self, name: &str, session_id: SessionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|player| player.session_id == session_id && player.name == name)
    }

    /// All players whose session is `session_id`, in join order
    pub fn in_session(&self, session_id: SessionId) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|player| player.session_id == session_id)
            .collect()
    }

    /// Returns the number of registered players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody has joined yet
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenGenerator;

    fn directory_with_players() -> (PlayerDirectory, TokenGenerator) {
        let mut tokens = TokenGenerator::from_seeds(3, 4);
        let mut directory = PlayerDirectory::new();
        directory.register("Rex", SessionId(1), tokens.generate());
        directory.register("Fido", SessionId(2), tokens.generate());
        directory.register("Lassie", SessionId(1), tokens.generate());
        (directory, tokens)
    }

    #[test]
    fn test_directory_creation() {
        let directory = PlayerDirectory::new();
        assert!(directory.is_empty());
        assert_eq!(directory.len(), 0);
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let (directory, _) = directory_with_players();

        assert_eq!(directory.len(), 3);
        assert_eq!(directory.get(PlayerId(1)).unwrap().name, "Rex");
        assert_eq!(directory.get(PlayerId(2)).unwrap().name, "Fido");
        assert_eq!(directory.get(PlayerId(3)).unwrap().name, "Lassie");
        assert!(directory.get(PlayerId(0)).is_none());
        assert!(directory.get(PlayerId(4)).is_none());
    }

    #[test]
    fn test_find_by_token() {
        let (mut directory, mut tokens) = directory_with_players();
        let token = tokens.generate();
        let id = directory.register("Bolt", SessionId(3), token.clone()).id;

        let found = directory.find_by_token(token.as_str()).unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.session_id, SessionId(3));
    }

    #[test]
    fn test_unknown_token() {
        let (directory, mut tokens) = directory_with_players();
        let stranger = tokens.generate();

        assert!(directory.find_by_token(stranger.as_str()).is_none());
        assert!(directory.find_by_token("").is_none());
    }

    #[test]
    fn test_find_in_session() {
        let (directory, _) = directory_with_players();

        let rex = directory.find_in_session("Rex", SessionId(1)).unwrap();
        assert_eq!(rex.id, PlayerId(1));
        assert!(directory.find_in_session("Rex", SessionId(2)).is_none());
        assert!(directory.find_in_session("Bolt", SessionId(1)).is_none());
    }

    #[test]
    fn test_players_in_session() {
        let (directory, _) = directory_with_players();

        let names: Vec<&str> = directory
            .in_session(SessionId(1))
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Rex", "Lassie"]);
        assert!(directory.in_session(SessionId(9)).is_empty());
    }

    #[test]
    fn test_player_info() {
        let (directory, _) = directory_with_players();
        let info = directory.get(PlayerId(2)).unwrap().info();
        assert_eq!(info.id, 2);
        assert_eq!(info.name, "Fido");
    }
}
