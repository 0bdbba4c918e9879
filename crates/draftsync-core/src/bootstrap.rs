// Room bootstrap: the REST calls that create, join, and start a draft before
// the WebSocket session takes over. The core only defines the contract and
// the payload shapes; an HTTP implementation lives in the CLI crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::draft::{DraftState, Pick, Player, Room};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    /// Seated at draft position 1 as the host.
    pub host_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_time_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub participant_id: String,
    pub draft_position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartDraftResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLookup {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicksResponse {
    pub picks: Vec<Pick>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamsResponse {
    pub teams: BTreeMap<String, Vec<Player>>,
}

/// The bootstrap collaborator. Implementations map transport failures into
/// their own error type.
#[async_trait]
pub trait RoomApi: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_room(&self, req: &CreateRoomRequest) -> Result<CreateRoomResponse, Self::Error>;
    async fn get_room(&self, room_id: &str) -> Result<Room, Self::Error>;
    async fn find_room_by_code(&self, code: &str) -> Result<RoomLookup, Self::Error>;
    async fn join_room(&self, room_id: &str, user_name: &str) -> Result<JoinRoomResponse, Self::Error>;
    async fn start_draft(&self, room_id: &str) -> Result<StartDraftResponse, Self::Error>;
    async fn available_players(&self, room_id: &str) -> Result<Vec<Player>, Self::Error>;
    async fn picks(&self, room_id: &str) -> Result<Vec<Pick>, Self::Error>;
    async fn teams(&self, room_id: &str) -> Result<BTreeMap<String, Vec<Player>>, Self::Error>;
}

/// Join `room_id` as `user_name` and build the initial state from the room
/// the server reports afterwards.
pub async fn join_and_load<A: RoomApi + ?Sized>(
    api: &A,
    room_id: &str,
    user_name: &str,
) -> Result<(JoinRoomResponse, DraftState), A::Error> {
    let joined = api.join_room(room_id, user_name).await?;
    let room = api.get_room(room_id).await?;
    tracing::info!(
        "Joined room {} ({}) at draft position {}",
        room.name,
        room.code,
        joined.draft_position
    );
    Ok((joined, DraftState::from_room(user_name, room)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Participant, RoomStatus};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("fake api failure")]
    struct FakeError;

    #[derive(Default)]
    struct FakeApi {
        joined: Mutex<Vec<String>>,
        fail_join: bool,
    }

    #[async_trait]
    impl RoomApi for FakeApi {
        type Error = FakeError;

        async fn create_room(&self, _req: &CreateRoomRequest) -> Result<CreateRoomResponse, FakeError> {
            Ok(CreateRoomResponse {
                room_id: "r1".into(),
                code: "ABC123".into(),
            })
        }

        async fn get_room(&self, room_id: &str) -> Result<Room, FakeError> {
            let joined = self.joined.lock().unwrap();
            Ok(Room {
                id: room_id.into(),
                name: "Sunday League".into(),
                code: "ABC123".into(),
                status: RoomStatus::Waiting,
                current_pick: 0,
                total_rounds: 3,
                turn_time_sec: 30,
                participants: joined
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Participant {
                        id: format!("u{i}"),
                        user_name: name.clone(),
                        draft_position: i as u32 + 1,
                        is_host: i == 0,
                    })
                    .collect(),
            })
        }

        async fn find_room_by_code(&self, _code: &str) -> Result<RoomLookup, FakeError> {
            Ok(RoomLookup {
                room_id: "r1".into(),
            })
        }

        async fn join_room(&self, _room_id: &str, user_name: &str) -> Result<JoinRoomResponse, FakeError> {
            if self.fail_join {
                return Err(FakeError);
            }
            let mut joined = self.joined.lock().unwrap();
            joined.push(user_name.to_string());
            Ok(JoinRoomResponse {
                participant_id: format!("u{}", joined.len() - 1),
                draft_position: joined.len() as u32,
            })
        }

        async fn start_draft(&self, _room_id: &str) -> Result<StartDraftResponse, FakeError> {
            Ok(StartDraftResponse {
                success: true,
                message: "Draft started".into(),
            })
        }

        async fn available_players(&self, _room_id: &str) -> Result<Vec<Player>, FakeError> {
            Ok(vec![])
        }

        async fn picks(&self, _room_id: &str) -> Result<Vec<Pick>, FakeError> {
            Ok(vec![])
        }

        async fn teams(&self, _room_id: &str) -> Result<BTreeMap<String, Vec<Player>>, FakeError> {
            Ok(BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn join_and_load_builds_initial_state() {
        let api = FakeApi::default();
        let (joined, state) = join_and_load(&api, "r1", "alice").await.unwrap();
        assert_eq!(joined.draft_position, 1);
        assert_eq!(state.me(), "alice");
        let room = state.room().unwrap();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(room.participant("alice").is_some());
        assert!(state.picks().is_empty());
    }

    #[tokio::test]
    async fn join_failure_propagates() {
        let api = FakeApi {
            fail_join: true,
            ..FakeApi::default()
        };
        assert!(join_and_load(&api, "r1", "alice").await.is_err());
    }

    #[test]
    fn create_request_omits_unset_options() {
        let req = CreateRoomRequest {
            name: "League".into(),
            host_name: "alice".into(),
            turn_time_sec: None,
            total_rounds: Some(5),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, serde_json::json!({"name": "League", "host_name": "alice", "total_rounds": 5}));
    }
}
