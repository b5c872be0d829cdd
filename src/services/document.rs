use crate::models::{MoodStatus, QuizAnswerSet, UserRecord};
use crate::services::store::{StoreError, UserStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Page size used when listing documents
const PAGE_SIZE: usize = 100;

/// Collection IDs in the document store
#[derive(Debug, Clone)]
pub struct DocumentCollections {
    pub users: String,
}

/// REST client for the Appwrite-style document database holding user records
///
/// Documents are keyed by user id, so single-user reads and writes go straight
/// to `/documents/{userId}`.
pub struct DocumentStoreClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: DocumentCollections,
}

impl DocumentStoreClient {
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: DocumentCollections,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collections.users
        )
    }

    fn document_url(&self, user_id: &str) -> String {
        format!("{}/{}", self.documents_url(), urlencoding::encode(user_id))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    async fn check(response: Response, action: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(action.to_string())),
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Document store failed to {}: {} - {}", action, status, body);
                Err(StoreError::ApiError(format!("Failed to {}: {}", action, status)))
            }
        }
    }

    async fn update_document(&self, user_id: &str, data: Value, action: &str) -> Result<(), StoreError> {
        let response = self
            .authorized(self.client.patch(self.document_url(user_id)))
            .json(&json!({ "data": data }))
            .send()
            .await?;

        Self::check(response, action).await?;
        Ok(())
    }

    /// List one page of completed-quiz documents after `cursor`
    async fn list_completed_page(
        &self,
        exclude_user_id: &str,
        cursor: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let query_string = completed_page_queries(exclude_user_id, cursor)
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.documents_url(), query_string);

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, "list completed users").await?;
        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| StoreError::InvalidResponse("Missing documents array".into()))?;

        Ok(documents.clone())
    }
}

/// String literal for the query DSL; quotes and backslashes in ids are escaped
fn query_value(value: &str) -> String {
    Value::from(value).to_string()
}

fn completed_page_queries(exclude_user_id: &str, cursor: Option<&str>) -> Vec<String> {
    let mut queries = vec![
        "equal(\"quizCompleted\", true)".to_string(),
        format!("notEqual(\"$id\", {})", query_value(exclude_user_id)),
        "orderAsc(\"$id\")".to_string(),
        format!("limit({})", PAGE_SIZE),
    ];
    if let Some(cursor) = cursor {
        queries.push(format!("cursorAfter({})", query_value(cursor)));
    }
    queries
}

/// Parse a document into a user record, filling `userId` from `$id` when absent
fn parse_user(doc: &Value) -> Result<UserRecord, StoreError> {
    let mut data = doc.get("data").unwrap_or(doc).clone();

    if let Some(obj) = data.as_object_mut() {
        if !obj.contains_key("userId") {
            if let Some(id) = doc.get("$id").cloned() {
                obj.insert("userId".to_string(), id);
            }
        }
    }

    serde_json::from_value(data)
        .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse user: {}", e)))
}

#[async_trait]
impl UserStore for DocumentStoreClient {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        tracing::debug!("Fetching user record: {}", user_id);

        let response = self
            .authorized(self.client.get(self.document_url(user_id)))
            .send()
            .await?;

        let response = match Self::check(response, "fetch user").await {
            Ok(response) => response,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let json: Value = response.json().await?;
        parse_user(&json).map(Some)
    }

    async fn completed_quiz_users(&self, exclude_user_id: &str) -> Result<Vec<UserRecord>, StoreError> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .list_completed_page(exclude_user_id, cursor.as_deref())
                .await?;
            let page_len = page.len();

            cursor = page
                .last()
                .and_then(|doc| doc.get("$id"))
                .and_then(|id| id.as_str())
                .map(str::to_string);

            // Malformed documents are not valid candidates yet
            users.extend(page.iter().filter_map(|doc| parse_user(doc).ok()));

            if page_len < PAGE_SIZE || cursor.is_none() {
                break;
            }
        }

        tracing::debug!("Fetched {} completed-quiz users", users.len());
        Ok(users)
    }

    async fn create_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        let data = serde_json::to_value(record)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to encode user: {}", e)))?;

        let response = self
            .authorized(self.client.post(self.documents_url()))
            .json(&json!({ "documentId": record.user_id, "data": data }))
            .send()
            .await?;

        Self::check(response, "create user").await?;
        tracing::debug!("Created user record: {}", record.user_id);
        Ok(())
    }

    async fn save_quiz_answers(&self, user_id: &str, answers: &QuizAnswerSet) -> Result<(), StoreError> {
        let data = json!({
            "quizAnswers": answers,
            "quizCompleted": true,
            "quizCompletedAt": chrono::Utc::now(),
        });

        self.update_document(user_id, data, "save quiz answers").await
    }

    async fn set_mood(&self, user_id: &str, mood: &MoodStatus) -> Result<(), StoreError> {
        self.update_document(user_id, json!({ "moodStatus": mood }), "set mood").await
    }
}
