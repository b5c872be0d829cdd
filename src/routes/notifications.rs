use actix_web::{web, HttpResponse};

use super::{ApiError, AppState, CurrentUser};
use crate::services::LiveEvent;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/notifications", web::get().to(list_unread))
        .route("/notifications/read-all", web::post().to(mark_all_read))
        .route("/notifications/stats", web::get().to(stats));
}

/// Unread notifications, newest first
async fn list_unread(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let notifications = state.postgres.unread_notifications(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

async fn mark_all_read(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    let updated = state.postgres.mark_all_notifications_read(&user.user_id).await?;

    state.hub.publish(LiveEvent::NotificationsCleared {
        user_id: user.user_id.clone(),
    });

    tracing::debug!("Marked {} notifications read for {}", updated, user.user_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// Live unread counters held by the caller's session
async fn stats(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user.session.unread())
}

#[cfg(test)]
mod tests {
    use super::super::configure_routes;
    use super::super::test_support::{sign_in, state};
    use crate::models::UnreadStats;
    use crate::services::MemoryUserStore;
    use actix_web::http::header;
    use actix_web::{test, web, App};
    use std::time::Duration;

    #[actix_web::test]
    async fn test_stats_from_session() {
        let state = state(MemoryUserStore::new());
        let bearer = sign_in(&state, "u1").await;
        let claims = state.tokens.verify(bearer.trim_start_matches("Bearer ")).unwrap();

        // Wait for the notification listener's first count
        let session = state.sessions.get(&claims.sid).await.unwrap();
        let mut rx = session.aggregator().subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.unread_notifications == 1))
            .await
            .unwrap()
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/notifications/stats")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        let body: UnreadStats = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            body,
            UnreadStats {
                unread_messages: 0,
                chats_with_unread: 0,
                unread_notifications: 1,
            }
        );
    }
}
