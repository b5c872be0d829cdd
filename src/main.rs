use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use roomie_match::auth::TokenIssuer;
use roomie_match::config::{LoggingSettings, Settings};
use roomie_match::core::{MatchRanker, UnreadSource};
use roomie_match::models::RankingLimits;
use roomie_match::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use roomie_match::services::{
    CacheManager, DocumentCollections, DocumentStoreClient, LiveHub, MemoryUserStore, PostgresClient, UserStore,
};
use roomie_match::session::SessionRegistry;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize logging; LOG_LEVEL and LOG_FORMAT override the config file
fn init_tracing(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", what, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", what, err))
}

fn build_store(settings: &Settings) -> io::Result<Arc<dyn UserStore>> {
    match settings.store.backend.as_str() {
        "memory" => {
            warn!("Using the in-memory user store; records are lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
        "document" => {
            let client = DocumentStoreClient::new(
                settings.store.endpoint.clone(),
                settings.store.api_key.clone(),
                settings.store.project_id.clone(),
                settings.store.database_id.clone(),
                DocumentCollections {
                    users: settings.collection.users.clone(),
                },
                settings.store.timeout_secs.unwrap_or(30),
            )
            .map_err(|e| startup_error("Failed to build document store client", e))?;

            info!("Document store client initialized");
            Ok(Arc::new(client))
        }
        other => Err(startup_error("Unknown store backend", other)),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => {
            init_tracing(&settings.logging);
            settings
        }
        Err(e) => {
            init_tracing(&LoggingSettings::default());
            return Err(startup_error("Failed to load configuration", e));
        }
    };

    info!("Starting roomie-match service...");

    let store = build_store(&settings)?;

    // Redis is optional; the in-process tier works alone
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s, Redis)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using the in-process cache only", e);
                CacheManager::l1_only(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            CacheManager::l1_only(l1_cache_size, cache_ttl)
        }
    };

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized");

    let hub = Arc::new(LiveHub::default());
    let unread_source: Arc<dyn UnreadSource> = postgres.clone();
    let sessions = Arc::new(SessionRegistry::new(unread_source, hub.clone()));
    sessions.start_sweeper(Duration::from_secs(settings.auth.session_sweep_secs.max(1)));

    let ranker = MatchRanker::new(RankingLimits {
        default_limit: settings.matching.default_limit,
        max_limit: settings.matching.max_limit,
    });

    let app_state = AppState {
        store,
        postgres,
        cache: Arc::new(cache),
        ranker,
        hub,
        sessions: sessions.clone(),
        tokens: TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    sessions.close_all().await;
    info!("Server stopped");

    result
}
