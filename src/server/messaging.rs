//! Persist-then-send chat helpers. System messages are authored by the root
//! pseudo-player.

use crate::domain::{PlayerId, RoomId};
use crate::protocol::ChatMessage;
use crate::store::StoreError;

use super::GameServer;

impl GameServer {
    /// Persist a player-authored chat message and broadcast it to its room.
    pub async fn persist_and_broadcast_chat(
        &self,
        content: &str,
        room_id: RoomId,
        author_id: PlayerId,
        author_name: &str,
    ) -> Result<(), StoreError> {
        let record = self.store.insert_message(content, room_id, author_id).await?;
        self.connections.broadcast_chat(ChatMessage {
            id: Some(record.id),
            created_on: Some(record.created_on),
            content: record.content,
            player_name: author_name.to_string(),
            room_id,
        });
        Ok(())
    }

    /// Persist a root-authored message and broadcast it to a room.
    pub async fn system_chat(&self, room_id: RoomId, content: &str) -> Result<(), StoreError> {
        let record = self
            .store
            .insert_message(content, room_id, self.settings.root_id)
            .await?;
        self.connections.broadcast_chat(ChatMessage {
            id: Some(record.id),
            created_on: Some(record.created_on),
            content: record.content,
            player_name: self.settings.root_name.clone(),
            room_id,
        });
        Ok(())
    }

    /// Persist a root-authored message and send it to a single player.
    pub async fn system_chat_to(
        &self,
        player_id: PlayerId,
        room_id: RoomId,
        content: &str,
    ) -> Result<(), StoreError> {
        let record = self
            .store
            .insert_message(content, room_id, self.settings.root_id)
            .await?;
        self.connections.send_chat(
            ChatMessage {
                id: Some(record.id),
                created_on: Some(record.created_on),
                content: record.content,
                player_name: self.settings.root_name.clone(),
                room_id,
            },
            player_id,
        );
        Ok(())
    }
}
