//! HTTP implementation of the room bootstrap API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use draftsync_core::bootstrap::{
    CreateRoomRequest, CreateRoomResponse, JoinRoomRequest, JoinRoomResponse, PicksResponse,
    PlayersResponse, RoomApi, RoomLookup, StartDraftResponse, TeamsResponse,
};
use draftsync_core::draft::{Pick, Player, Room};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
}

/// Talks to the draft server's REST API.
#[derive(Debug, Clone)]
pub struct HttpRoomApi {
    base_url: String,
    client: Client,
}

impl HttpRoomApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRoomApi {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("GET {path}");
        self.send(self.client.get(self.url(path))).await
    }
}

/// The server reports failures as `{"detail": ...}`; fall back to the raw
/// body for anything else.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) if body.is_empty() => "(empty response)".to_string(),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl RoomApi for HttpRoomApi {
    type Error = ApiError;

    #[instrument(skip_all, fields(name = %req.name))]
    async fn create_room(&self, req: &CreateRoomRequest) -> Result<CreateRoomResponse, ApiError> {
        self.send(self.client.post(self.url("/rooms")).json(req)).await
    }

    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError> {
        self.get(&format!("/rooms/{room_id}")).await
    }

    async fn find_room_by_code(&self, code: &str) -> Result<RoomLookup, ApiError> {
        self.get(&format!("/rooms/code/{code}")).await
    }

    #[instrument(skip(self))]
    async fn join_room(&self, room_id: &str, user_name: &str) -> Result<JoinRoomResponse, ApiError> {
        let body = JoinRoomRequest {
            user_name: user_name.to_string(),
        };
        let path = format!("/rooms/{room_id}/join");
        self.send(self.client.post(self.url(&path)).json(&body)).await
    }

    #[instrument(skip(self))]
    async fn start_draft(&self, room_id: &str) -> Result<StartDraftResponse, ApiError> {
        let path = format!("/rooms/{room_id}/start");
        self.send(self.client.post(self.url(&path))).await
    }

    async fn available_players(&self, room_id: &str) -> Result<Vec<Player>, ApiError> {
        let resp: PlayersResponse = self.get(&format!("/players/rooms/{room_id}/available")).await?;
        Ok(resp.players)
    }

    async fn picks(&self, room_id: &str) -> Result<Vec<Pick>, ApiError> {
        let resp: PicksResponse = self.get(&format!("/rooms/{room_id}/picks")).await?;
        Ok(resp.picks)
    }

    async fn teams(&self, room_id: &str) -> Result<BTreeMap<String, Vec<Player>>, ApiError> {
        let resp: TeamsResponse = self.get(&format!("/rooms/{room_id}/teams")).await?;
        Ok(resp.teams)
    }
}
