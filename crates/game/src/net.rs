use std::collections::HashMap;

use engine::Vec2;
use thiserror::Error;
use tracing::{debug, info};

use crate::world::movement::Direction;

pub const CHAT_BUBBLE_SECONDS: f32 = 5.0;
pub const CHAT_FETCH_LIMIT: usize = 50;
pub const QUICK_CHAT_TEXT: &str = "Hello!";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("network service unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("network session disconnected")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub id: u32,
    pub map: String,
    pub position: Vec2,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: u32,
    pub text: String,
}

/// Position and chat sync with other players. Calls must not block; a
/// failure means "no new data this frame".
pub trait NetworkService {
    fn local_id(&self) -> u32;
    fn update(&mut self, map: &str, position: Vec2, direction: Direction) -> Result<(), NetError>;
    fn list_players(&mut self) -> Result<Vec<RemotePlayer>, NetError>;
    fn send_chat(&mut self, text: &str) -> Result<(), NetError>;
    fn recent_chat(&mut self, limit: usize) -> Result<Vec<ChatMessage>, NetError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatBubble {
    pub text: String,
    expires_at: f32,
}

/// Wraps a service for the overworld: caches the last player list, keeps
/// chat bubbles per sender and never surfaces transport errors.
pub struct OnlineSession {
    service: Box<dyn NetworkService>,
    players: Vec<RemotePlayer>,
    bubbles: HashMap<u32, ChatBubble>,
    last_seen_chat_id: u64,
    clock: f32,
}

impl OnlineSession {
    pub fn new(service: Box<dyn NetworkService>) -> Self {
        info!(local_id = service.local_id(), "online_session_started");
        Self {
            service,
            players: Vec::new(),
            bubbles: HashMap::new(),
            last_seen_chat_id: 0,
            clock: 0.0,
        }
    }

    pub fn local_id(&self) -> u32 {
        self.service.local_id()
    }

    pub fn update(&mut self, dt_seconds: f32, map: &str, position: Vec2, direction: Direction) {
        self.clock += dt_seconds;

        if let Err(err) = self.service.update(map, position, direction) {
            debug!(error = %err, "online_update_failed");
        }
        match self.service.list_players() {
            Ok(players) => self.players = players,
            Err(err) => debug!(error = %err, "online_list_players_failed"),
        }
        match self.service.recent_chat(CHAT_FETCH_LIMIT) {
            Ok(messages) => self.absorb_chat(messages),
            Err(err) => debug!(error = %err, "online_recent_chat_failed"),
        }

        let now = self.clock;
        self.bubbles.retain(|_, bubble| bubble.expires_at > now);
    }

    fn absorb_chat(&mut self, messages: Vec<ChatMessage>) {
        let mut newest = self.last_seen_chat_id;
        for message in messages {
            if message.id <= self.last_seen_chat_id {
                continue;
            }
            newest = newest.max(message.id);
            self.bubbles.insert(
                message.sender,
                ChatBubble {
                    text: message.text,
                    expires_at: self.clock + CHAT_BUBBLE_SECONDS,
                },
            );
        }
        self.last_seen_chat_id = newest;
    }

    pub fn send_chat(&mut self, text: &str) {
        match self.service.send_chat(text) {
            Ok(()) => debug!(text, "chat_sent"),
            Err(err) => debug!(error = %err, "online_send_chat_failed"),
        }
    }

    /// Remote players on `map`, excluding the local player.
    pub fn players_on<'a>(&'a self, map: &'a str) -> impl Iterator<Item = &'a RemotePlayer> + 'a {
        let local = self.local_id();
        self.players
            .iter()
            .filter(move |player| player.id != local && player.map == map)
    }

    pub fn bubble(&self, sender: u32) -> Option<&ChatBubble> {
        self.bubbles.get(&sender)
    }
}

/// In-process service: remembers the local player and echoes chat back.
#[derive(Debug, Default)]
pub struct LoopbackService {
    local_id: u32,
    local: Option<RemotePlayer>,
    others: Vec<RemotePlayer>,
    chat: Vec<ChatMessage>,
}

impl LoopbackService {
    pub fn new(local_id: u32) -> Self {
        Self {
            local_id,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_player(mut self, player: RemotePlayer) -> Self {
        self.others.push(player);
        self
    }
}

impl NetworkService for LoopbackService {
    fn local_id(&self) -> u32 {
        self.local_id
    }

    fn update(&mut self, map: &str, position: Vec2, direction: Direction) -> Result<(), NetError> {
        self.local = Some(RemotePlayer {
            id: self.local_id,
            map: map.to_string(),
            position,
            direction,
        });
        Ok(())
    }

    fn list_players(&mut self) -> Result<Vec<RemotePlayer>, NetError> {
        Ok(self.local.iter().chain(self.others.iter()).cloned().collect())
    }

    fn send_chat(&mut self, text: &str) -> Result<(), NetError> {
        let id = self.chat.last().map_or(1, |message| message.id + 1);
        self.chat.push(ChatMessage {
            id,
            sender: self.local_id,
            text: text.to_string(),
        });
        Ok(())
    }

    fn recent_chat(&mut self, limit: usize) -> Result<Vec<ChatMessage>, NetError> {
        let skip = self.chat.len().saturating_sub(limit);
        Ok(self.chat[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl NetworkService for Unreachable {
        fn local_id(&self) -> u32 {
            9
        }

        fn update(&mut self, _map: &str, _position: Vec2, _direction: Direction) -> Result<(), NetError> {
            Err(NetError::Disconnected)
        }

        fn list_players(&mut self) -> Result<Vec<RemotePlayer>, NetError> {
            Err(NetError::Unavailable {
                reason: "timeout".to_string(),
            })
        }

        fn send_chat(&mut self, _text: &str) -> Result<(), NetError> {
            Err(NetError::Disconnected)
        }

        fn recent_chat(&mut self, _limit: usize) -> Result<Vec<ChatMessage>, NetError> {
            Err(NetError::Disconnected)
        }
    }

    fn remote(id: u32, map: &str) -> RemotePlayer {
        RemotePlayer {
            id,
            map: map.to_string(),
            position: Vec2::new(64.0, 32.0),
            direction: Direction::Left,
        }
    }

    #[test]
    fn only_remote_players_on_same_map_are_listed() {
        let service = LoopbackService::new(1)
            .with_player(remote(2, "map.tmx"))
            .with_player(remote(3, "gym.tmx"));
        let mut session = OnlineSession::new(Box::new(service));
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);

        let ids: Vec<u32> = session.players_on("map.tmx").map(|player| player.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn chat_bubble_lasts_five_seconds() {
        let mut session = OnlineSession::new(Box::new(LoopbackService::new(1)));
        session.send_chat(QUICK_CHAT_TEXT);
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        assert_eq!(session.bubble(1).map(|bubble| bubble.text.as_str()), Some("Hello!"));

        session.update(4.8, "map.tmx", Vec2::ZERO, Direction::Down);
        assert!(session.bubble(1).is_some());
        session.update(0.3, "map.tmx", Vec2::ZERO, Direction::Down);
        assert!(session.bubble(1).is_none());
    }

    #[test]
    fn already_seen_messages_do_not_reopen_bubbles() {
        let mut session = OnlineSession::new(Box::new(LoopbackService::new(1)));
        session.send_chat("first");
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        session.update(6.0, "map.tmx", Vec2::ZERO, Direction::Down);
        assert!(session.bubble(1).is_none());

        session.send_chat("second");
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        assert_eq!(session.bubble(1).map(|bubble| bubble.text.as_str()), Some("second"));
    }

    #[test]
    fn bubble_is_replaced_only_by_newer_chat() {
        let mut session = OnlineSession::new(Box::new(LoopbackService::new(1)));
        session.send_chat("first");
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        let shown = session.bubble(1).cloned();
        assert!(shown.is_some());

        session.update(1.0, "map.tmx", Vec2::ZERO, Direction::Down);
        assert_eq!(session.bubble(1), shown.as_ref());

        session.send_chat("second");
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        assert_ne!(session.bubble(1), shown.as_ref());
    }

    #[test]
    fn transport_failures_are_treated_as_no_data() {
        let mut session = OnlineSession::new(Box::new(Unreachable));
        session.send_chat("hi");
        session.update(0.1, "map.tmx", Vec2::ZERO, Direction::Down);
        assert_eq!(session.players_on("map.tmx").count(), 0);
        assert!(session.bubble(9).is_none());
    }
}
