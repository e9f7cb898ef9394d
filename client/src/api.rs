//! Platform REST client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every non-streaming endpoint wraps its payload in the platform envelope
//! `{code, msg, data}`, where a nonzero `code` is a business error even under
//! HTTP 200. Pure decoding lives in `decode_envelope` for testability; the
//! streaming endpoints bypass the envelope and hand raw body chunks to the
//! frame parser.

use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::state::chat::ChatMessage;
use crate::transport::{Backend, ByteStream, StreamRequest};

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the agent platform API.
///
/// No overall request timeout is set because chat runs stream for as long as
/// the model generates; only the connect phase is bounded.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, token })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        decode_envelope(status, &text)
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(self.request(reqwest::Method::GET, path)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.execute(self.request(reqwest::Method::POST, path).json(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.execute(self.request(reqwest::Method::PUT, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(self.request(reqwest::Method::DELETE, path)).await
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

/// Decode a platform response body into its `data` payload.
pub(crate) fn decode_envelope(status: u16, text: &str) -> Result<Value, ClientError> {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) if envelope.code == 0 => Ok(envelope.data),
        Ok(envelope) => Err(ClientError::Api { code: envelope.code, msg: envelope.msg }),
        Err(error) if (200..300).contains(&status) => Err(ClientError::Decode(error.to_string())),
        Err(_) => Err(ClientError::Status { status, body: text.to_owned() }),
    }
}

/// Extract a typed list from `data`, accepting either a bare array or a
/// paginated object keyed by `key`.
fn list_from<T: DeserializeOwned>(data: Value, key: &str) -> Result<Vec<T>, ClientError> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => return Err(ClientError::Decode(format!("expected a `{key}` array"))),
        },
        _ => return Err(ClientError::Decode(format!("expected an array or `{key}` object"))),
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| ClientError::Decode(e.to_string())))
        .collect()
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model_config_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub document_count: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl ApiClient {
    pub async fn list_agents(&self) -> Result<Vec<AgentSummary>, ClientError> {
        list_from(self.get("/api/agents").await?, "list")
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Value, ClientError> {
        self.get(&format!("/api/agents/{agent_id}")).await
    }

    pub async fn create_agent(&self, body: &Value) -> Result<Value, ClientError> {
        self.post("/api/agents", body).await
    }

    pub async fn update_agent(&self, agent_id: &str, body: &Value) -> Result<Value, ClientError> {
        self.put(&format!("/api/agents/{agent_id}"), body).await
    }

    pub async fn delete_agent(&self, agent_id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/agents/{agent_id}")).await?;
        Ok(())
    }

    pub async fn list_clusters(&self) -> Result<Vec<ClusterSummary>, ClientError> {
        list_from(self.get("/api/clusters").await?, "list")
    }

    pub async fn get_cluster(&self, cluster_id: &str) -> Result<Value, ClientError> {
        self.get(&format!("/api/clusters/{cluster_id}")).await
    }

    pub async fn create_cluster(&self, body: &Value) -> Result<Value, ClientError> {
        self.post("/api/clusters", body).await
    }

    pub async fn update_cluster(
        &self,
        cluster_id: &str,
        body: &Value,
    ) -> Result<Value, ClientError> {
        self.put(&format!("/api/clusters/{cluster_id}"), body).await
    }

    pub async fn delete_cluster(&self, cluster_id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/clusters/{cluster_id}")).await?;
        Ok(())
    }

    pub async fn list_models(&self) -> Result<Vec<ModelSummary>, ClientError> {
        list_from(self.get("/api/models").await?, "list")
    }

    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ClientError> {
        list_from(self.get("/api/workspaces").await?, "list")
    }

    pub async fn switch_workspace(&self, workspace_id: &str) -> Result<(), ClientError> {
        self.post(&format!("/api/workspaces/{workspace_id}/switch"), &json!({})).await?;
        Ok(())
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptSummary>, ClientError> {
        list_from(self.get("/api/prompts").await?, "list")
    }

    pub async fn create_prompt(&self, name: &str, content: &str) -> Result<Value, ClientError> {
        self.post("/api/prompts", &json!({ "name": name, "content": content })).await
    }

    pub async fn update_prompt(&self, prompt_id: &str, body: &Value) -> Result<Value, ClientError> {
        self.put(&format!("/api/prompts/{prompt_id}"), body).await
    }

    pub async fn delete_prompt(&self, prompt_id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/prompts/{prompt_id}")).await?;
        Ok(())
    }

    pub async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, ClientError> {
        list_from(self.get("/api/knowledge-bases").await?, "list")
    }

    pub async fn create_knowledge_base(&self, name: &str) -> Result<Value, ClientError> {
        self.post("/api/knowledge-bases", &json!({ "name": name })).await
    }

    pub async fn delete_knowledge_base(&self, kb_id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/knowledge-bases/{kb_id}")).await?;
        Ok(())
    }

    /// Upload one document into a knowledge base.
    pub async fn upload_document(
        &self,
        kb_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_owned());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self
            .request(
                reqwest::Method::POST,
                &format!("/api/knowledge-bases/{kb_id}/documents"),
            )
            .multipart(form);
        self.execute(builder).await
    }

    pub async fn list_conversations(
        &self,
        agent_id: &str,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        list_from(
            self.get(&format!("/api/agents/{agent_id}/conversations")).await?,
            "list",
        )
    }

    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, ClientError> {
        list_from(
            self.get(&format!("/api/conversations/{conversation_id}/messages")).await?,
            "list",
        )
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/conversations/{conversation_id}")).await?;
        Ok(())
    }

    /// Exchange a share token for an access token. The caller caches the
    /// result in [`crate::state::share::ShareTokenCache`].
    pub async fn redeem_share_token(&self, share_token: &str) -> Result<String, ClientError> {
        let data = self
            .post(&format!("/api/share/{share_token}/access"), &json!({}))
            .await?;
        data.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(ClientError::MissingField("access_token"))
    }
}

// =============================================================================
// STREAMING
// =============================================================================

#[async_trait::async_trait]
impl Backend for ApiClient {
    async fn save_draft(&self, path: &str, body: &Value) -> Result<(), ClientError> {
        self.put(path, body).await?;
        Ok(())
    }

    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &request.path)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response
                .text()
                .await
                .map_err(|e| ClientError::Request(e.to_string()))?;
            // A refused run still answers with the envelope.
            return match decode_envelope(status, &text) {
                Err(error) => Err(error),
                Ok(_) => Err(ClientError::Status { status, body: text }),
            };
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(error) => Err(ClientError::Request(error.to_string())),
            })
            .boxed();
        Ok(stream)
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
