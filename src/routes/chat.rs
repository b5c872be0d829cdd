use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{ApiError, AppState, CurrentUser};
use crate::models::{Chat, OpenChatRequest, SendMessageRequest, UserRecord};
use crate::services::LiveEvent;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/chats", web::get().to(list_chats))
        .route("/chats", web::post().to(open_chat))
        .route("/chats/{chat_id}/messages", web::get().to(list_messages))
        .route("/chats/{chat_id}/messages", web::post().to(send_message))
        .route("/chats/{chat_id}/read", web::post().to(mark_read));
}

/// Load a chat the caller belongs to
async fn participant_chat(state: &AppState, chat_id: &str, user_id: &str) -> Result<Chat, ApiError> {
    let chat = state
        .postgres
        .get_chat(chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Chat {}", chat_id)))?;

    if !chat.has_participant(user_id) {
        return Err(ApiError::Forbidden(format!("Not a participant of chat {}", chat_id)));
    }

    Ok(chat)
}

/// Name shown on a message: the profile name, else the account email
fn sender_display_name(record: Option<UserRecord>, email: &str) -> String {
    record
        .and_then(|record| record.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.to_string())
}

/// The caller's chats, most recently active first
///
/// GET /api/v1/chats
async fn list_chats(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let chats = state.postgres.chat_summaries(&user.user_id).await?;

    Ok(HttpResponse::Ok().json(chats))
}

/// Open (or reuse) the two-person chat with another user
///
/// POST /api/v1/chats
///
/// Request body:
/// ```json
/// { "otherUserId": "string" }
/// ```
async fn open_chat(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<OpenChatRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let other_id = req.other_user_id.trim();

    if other_id == user.user_id {
        return Err(ApiError::Validation("Cannot open a chat with yourself".to_string()));
    }

    if state.store.get_user(other_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("User {}", other_id)));
    }

    let (chat, created) = state.postgres.open_chat_between(&user.user_id, other_id).await?;
    if !created {
        return Ok(HttpResponse::Ok().json(chat));
    }

    let profile = state.store.get_user(&user.user_id).await?;
    let opener = sender_display_name(profile, &user.email);
    state
        .postgres
        .create_notification(other_id, "new_chat", &format!("{} started a chat with you", opener))
        .await?;
    state.hub.publish(LiveEvent::NotificationCreated {
        user_id: other_id.to_string(),
    });

    state.sessions.attach_chat(&user.user_id, &chat.chat_id).await;
    state.sessions.attach_chat(other_id, &chat.chat_id).await;

    tracing::info!("User {} opened chat {} with {}", user.user_id, chat.chat_id, other_id);

    Ok(HttpResponse::Created().json(chat))
}

/// GET /api/v1/chats/{chat_id}/messages
async fn list_messages(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let chat = participant_chat(&state, &path, &user.user_id).await?;
    let messages = state.postgres.list_messages(&chat.chat_id).await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/chats/{chat_id}/messages
async fn send_message(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("Message text is empty".to_string()));
    }
    req.validate()?;

    let chat = participant_chat(&state, &path, &user.user_id).await?;

    let profile = state.store.get_user(&user.user_id).await?;
    let sender_name = sender_display_name(profile, &user.email);

    let message = state
        .postgres
        .insert_message(&chat.chat_id, &user.user_id, &sender_name, text)
        .await?;

    state.hub.publish(LiveEvent::MessagePosted {
        chat_id: chat.chat_id,
        sender_id: user.user_id,
    });

    Ok(HttpResponse::Created().json(message))
}

/// POST /api/v1/chats/{chat_id}/read
async fn mark_read(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let chat = participant_chat(&state, &path, &user.user_id).await?;
    state.postgres.mark_chat_read(&chat.chat_id, &user.user_id).await?;

    state.hub.publish(LiveEvent::ChatRead {
        chat_id: chat.chat_id,
        user_id: user.user_id,
    });

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::super::configure_routes;
    use super::super::test_support::{database, sign_in, state, state_with};
    use crate::models::{ChatSummary, UserRecord};
    use crate::services::MemoryUserStore;
    use std::sync::Arc;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, web, App};
    use serde_json::json;

    // These checks all run before PostgreSQL is touched

    #[actix_web::test]
    async fn test_open_chat_with_self_rejected() {
        let state = state(MemoryUserStore::with_users([UserRecord::new("u1", "Sam", "sam@test.local")]));
        let bearer = sign_in(&state, "u1").await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/chats")
            .insert_header((header::AUTHORIZATION, bearer))
            .set_json(json!({ "otherUserId": "u1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_open_chat_with_unknown_user() {
        let state = state(MemoryUserStore::with_users([UserRecord::new("u1", "Sam", "sam@test.local")]));
        let bearer = sign_in(&state, "u1").await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/chats")
            .insert_header((header::AUTHORIZATION, bearer))
            .set_json(json!({ "otherUserId": "ghost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_blank_message_rejected() {
        let state = state(MemoryUserStore::new());
        let bearer = sign_in(&state, "u1").await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/chats/c1/messages")
            .insert_header((header::AUTHORIZATION, bearer))
            .set_json(json!({ "text": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    fn unique(prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4())
    }

    #[actix_web::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_outsider_cannot_read_or_post() {
        let state = state_with(Arc::new(MemoryUserStore::new()), database().await);
        let (chat, _) = state
            .postgres
            .open_chat_between(&unique("amy"), &unique("bob"))
            .await
            .unwrap();
        let bearer = sign_in(&state, &unique("eve")).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/chats/{}/messages", chat.chat_id))
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/chats/{}/messages", chat.chat_id))
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(json!({ "text": "let me in" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/chats/{}/read", chat.chat_id))
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_open_chat_twice_reuses_it() {
        let (amy, bob) = (unique("amy"), unique("bob"));
        let store = MemoryUserStore::with_users([
            UserRecord::new(&amy, "Amy", "amy@test.local"),
            UserRecord::new(&bob, "Bob", "bob@test.local"),
        ]);
        let state = state_with(Arc::new(store), database().await);
        let bearer = sign_in(&state, &amy).await;
        let postgres = state.postgres.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let open = || {
            test::TestRequest::post()
                .uri("/api/v1/chats")
                .insert_header((header::AUTHORIZATION, bearer.clone()))
                .set_json(json!({ "otherUserId": bob }))
                .to_request()
        };

        let first = test::call_service(&app, open()).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = test::call_service(&app, open()).await;
        assert_eq!(second.status(), StatusCode::OK);

        // Only the creating call notifies the other user
        let notifications = postgres.unread_notifications(&bob).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Amy started a chat with you");

        let req = test::TestRequest::get()
            .uri("/api/v1/chats")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let chats: Vec<ChatSummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].unread_count, 0);
    }
}
