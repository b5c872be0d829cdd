use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{ApiError, AppState, CurrentUser};
use crate::core::{validate_answers, MatchFilter, QUIZ_QUESTIONS};
use crate::models::{HealthResponse, MatchQuery, MatchesResponse, SubmitQuizRequest};
use crate::services::CacheKey;

/// Configure health, quiz and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/quiz/questions", web::get().to(quiz_questions))
        .route("/quiz/submit", web::post().to(submit_quiz))
        .route("/matches", web::get().to(get_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn quiz_questions() -> HttpResponse {
    HttpResponse::Ok().json(QUIZ_QUESTIONS)
}

/// Full ranked list for a user, served from cache when possible
async fn ranked_matches(state: &AppState, user_id: &str) -> Result<MatchesResponse, ApiError> {
    let key = CacheKey::matches(user_id);

    if let Ok(cached) = state.cache.get::<MatchesResponse>(&key).await {
        tracing::debug!("Serving cached matches for {}", user_id);
        return Ok(cached);
    }

    let result = state.ranker.find_matches(state.store.as_ref(), user_id).await?;
    let response = MatchesResponse {
        matches: result.matches,
        total_candidates: result.total_candidates,
    };

    if let Err(e) = state.cache.set(&key, &response).await {
        tracing::warn!("Failed to cache matches for {}: {}", user_id, e);
    }

    Ok(response)
}

/// Ranked matches
///
/// GET /api/v1/matches?gender=female&minCompatibility=60&limit=10
async fn get_matches(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<MatchQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let query = query.into_inner();

    let ranked = ranked_matches(&state, &user.user_id).await?;
    let filter = MatchFilter {
        gender: query.gender,
        min_compatibility: query.min_compatibility,
        limit: query.limit,
    };
    let matches = state.ranker.select(&ranked.matches, &filter);

    tracing::info!(
        "Returning {} matches for user {} (from {} candidates)",
        matches.len(),
        user.user_id,
        ranked.total_candidates
    );

    Ok(HttpResponse::Ok().json(MatchesResponse {
        matches,
        total_candidates: ranked.total_candidates,
    }))
}

/// Submit or retake the quiz
///
/// POST /api/v1/quiz/submit
///
/// Request body:
/// ```json
/// { "answers": { "sleepSchedule": "early", "noise": "quiet" } }
/// ```
///
/// Answers are replaced wholesale; the response is the fresh ranking.
async fn submit_quiz(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<SubmitQuizRequest>,
) -> Result<HttpResponse, ApiError> {
    let answers = req.into_inner().answers;
    validate_answers(&answers)?;

    state.store.save_quiz_answers(&user.user_id, &answers).await?;

    if let Err(e) = state.cache.delete(&CacheKey::matches(&user.user_id)).await {
        tracing::warn!("Failed to invalidate matches for {}: {}", user.user_id, e);
    }

    tracing::info!("User {} submitted {} quiz answers", user.user_id, answers.len());

    let ranked = ranked_matches(&state, &user.user_id).await?;
    let matches = state.ranker.select(&ranked.matches, &MatchFilter::default());

    Ok(HttpResponse::Ok().json(MatchesResponse {
        matches,
        total_candidates: ranked.total_candidates,
    }))
}
