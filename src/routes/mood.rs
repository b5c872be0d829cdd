use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{ApiError, AppState, CurrentUser};
use crate::core::{find_mood, MOOD_PRESETS};
use crate::models::SetMoodRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/mood/presets", web::get().to(presets))
        .route("/mood", web::put().to(set_mood));
}

async fn presets() -> HttpResponse {
    HttpResponse::Ok().json(MOOD_PRESETS)
}

/// PUT /api/v1/mood
///
/// Request body:
/// ```json
/// { "mood": "Chill", "status": "studying in the library" }
/// ```
async fn set_mood(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<SetMoodRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let preset = find_mood(&req.mood)
        .ok_or_else(|| ApiError::Validation(format!("Unknown mood: {}", req.mood)))?;
    let mood = preset.status(req.status.as_deref());

    state.store.set_mood(&user.user_id, &mood).await?;
    tracing::debug!("User {} is now {}", user.user_id, mood.name);

    Ok(HttpResponse::Ok().json(mood))
}
