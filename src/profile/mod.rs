//! Read-through boundary to the remote profile and match stores. The
//! profile store is authoritative for display identity; the core never
//! caches appearance beyond the snapshot being built, and never writes
//! match records.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{LobbyError, PlayerDisplay, ProfileId, DEFAULT_COLOR, DEFAULT_EMOJI};

/// One profile as the remote store reports it. The store emits field names
/// in either of two capitalizations; the aliases normalize both onto this
/// shape so the rest of the core sees one canonical record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileRecord {
    #[serde(alias = "Id", alias = "ID")]
    pub id: ProfileId,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Color")]
    pub color: Option<String>,
    #[serde(default, alias = "Emoji")]
    pub emoji: Option<String>,
}

impl ProfileRecord {
    /// Derive display attributes. Defaults apply only when the store's
    /// value is literally absent or empty; client-supplied values never
    /// enter here.
    pub fn display(&self) -> PlayerDisplay {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        PlayerDisplay {
            display_name: if self.name.trim().is_empty() {
                self.id.clone()
            } else {
                self.name.clone()
            },
            color: non_empty(&self.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            emoji: non_empty(&self.emoji).unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
        }
    }
}

/// Fields accepted when forwarding a profile creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Remote profile store interface. All reads carry a short deadline; a slow
/// or failing store degrades snapshots to default appearance rather than
/// stalling a room.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<ProfileRecord>, LobbyError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, LobbyError>;
    async fn create(&self, profile: NewProfile) -> Result<ProfileRecord, LobbyError>;
    async fn update(&self, id: &str, patch: Value) -> Result<ProfileRecord, LobbyError>;
    async fn delete(&self, id: &str) -> Result<(), LobbyError>;
    async fn search(&self, criteria: Value) -> Result<Vec<ProfileRecord>, LobbyError>;
}

/// Remote match store interface. Append-only upstream; the core only reads.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn wins_by_game(&self, game_type: &str) -> Result<Value, LobbyError>;
    async fn wins_by_player(&self, profile_id: &str) -> Result<Value, LobbyError>;
    async fn wins_by_room(&self, room_id: &str, game_type: &str) -> Result<Value, LobbyError>;
}

/// HTTP client for the hosted profile/match backend.
pub struct HttpProfileStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileStore {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self, LobbyError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = api_key {
            let value = reqwest::header::HeaderValue::from_str(key)
                .map_err(|e| LobbyError::Invalid(format!("invalid API key header: {e}")))?;
            headers.insert("X-API-Key", value);
        }
        let client = reqwest::Client::builder()
            .user_agent("arcade-lobby-server/0.1")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, LobbyError> {
        let status = response.status();
        if !status.is_success() {
            return Err(LobbyError::Upstream(format!(
                "profile backend returned {status}"
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn get_all(&self) -> Result<Vec<ProfileRecord>, LobbyError> {
        let response = self
            .client
            .get(self.url("/user-profiles"))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, LobbyError> {
        let response = self
            .client
            .get(self.url(&format!("/user-profiles/{id}")))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::decode(response).await?))
    }

    async fn create(&self, profile: NewProfile) -> Result<ProfileRecord, LobbyError> {
        let response = self
            .client
            .post(self.url("/user-profiles"))
            .json(&profile)
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }

    async fn update(&self, id: &str, patch: Value) -> Result<ProfileRecord, LobbyError> {
        let response = self
            .client
            .patch(self.url(&format!("/user-profiles/{id}")))
            .json(&patch)
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), LobbyError> {
        let response = self
            .client
            .delete(self.url(&format!("/user-profiles/{id}")))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(LobbyError::Upstream(format!(
                "profile backend returned {} on delete",
                response.status()
            )))
        }
    }

    async fn search(&self, criteria: Value) -> Result<Vec<ProfileRecord>, LobbyError> {
        let response = self
            .client
            .post(self.url("/user-profiles/search"))
            .json(&criteria)
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }
}

#[async_trait]
impl MatchStore for HttpProfileStore {
    async fn wins_by_game(&self, game_type: &str) -> Result<Value, LobbyError> {
        let response = self
            .client
            .get(self.url(&format!("/wins/{game_type}")))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }

    async fn wins_by_player(&self, profile_id: &str) -> Result<Value, LobbyError> {
        let response = self
            .client
            .get(self.url(&format!("/wins/player/{profile_id}")))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }

    async fn wins_by_room(&self, room_id: &str, game_type: &str) -> Result<Value, LobbyError> {
        let response = self
            .client
            .get(self.url(&format!("/wins/room/{room_id}/{game_type}")))
            .send()
            .await
            .map_err(|e| LobbyError::Upstream(e.to_string()))?;
        Self::decode(response).await
    }
}

/// In-memory store used when no backend is configured, and by tests. Keeps
/// the server runnable standalone.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<ProfileId, ProfileRecord>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: ProfileRecord) {
        self.profiles.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_all(&self) -> Result<Vec<ProfileRecord>, LobbyError> {
        Ok(self.profiles.iter().map(|e| e.value().clone()).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, LobbyError> {
        Ok(self.profiles.get(id).map(|e| e.value().clone()))
    }

    async fn create(&self, profile: NewProfile) -> Result<ProfileRecord, LobbyError> {
        let record = ProfileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: profile.name,
            color: profile.color,
            emoji: profile.emoji,
        };
        self.profiles.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: Value) -> Result<ProfileRecord, LobbyError> {
        let mut entry = self
            .profiles
            .get_mut(id)
            .ok_or_else(|| LobbyError::ProfileUnknown(id.to_string()))?;
        if let Some(name) = patch.get("name").and_then(Value::as_str) {
            entry.name = name.to_string();
        }
        if let Some(color) = patch.get("color").and_then(Value::as_str) {
            entry.color = Some(color.to_string());
        }
        if let Some(emoji) = patch.get("emoji").and_then(Value::as_str) {
            entry.emoji = Some(emoji.to_string());
        }
        Ok(entry.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), LobbyError> {
        self.profiles.remove(id);
        Ok(())
    }

    async fn search(&self, criteria: Value) -> Result<Vec<ProfileRecord>, LobbyError> {
        let name = criteria
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        Ok(self
            .profiles
            .iter()
            .filter(|e| name.is_empty() || e.value().name.to_lowercase().contains(&name))
            .map(|e| e.value().clone())
            .collect())
    }
}

#[async_trait]
impl MatchStore for InMemoryProfileStore {
    async fn wins_by_game(&self, _game_type: &str) -> Result<Value, LobbyError> {
        Ok(Value::Array(Vec::new()))
    }

    async fn wins_by_player(&self, _profile_id: &str) -> Result<Value, LobbyError> {
        Ok(Value::Array(Vec::new()))
    }

    async fn wins_by_room(&self, _room_id: &str, _game_type: &str) -> Result<Value, LobbyError> {
        Ok(Value::Array(Vec::new()))
    }
}
