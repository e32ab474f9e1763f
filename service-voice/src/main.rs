// =====================================================================================
// File: service-voice/src/main.rs
// Description: Main entry point for the Rapid100 voice triage service
// Author: arkSong (arksong2018@gmail.com)
// Framework: Rapid100 - AI-Powered Emergency Call Triage Platform
// =====================================================================================

use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};

use core_ai::OllamaClient;
use core_config::{BackendKind, ConfigLoader};
use core_database::CallRepository;
use core_events::BroadcastHub;
use core_observability::{init_tracing, TriageMetrics};
use core_triage::TriageEngine;
use service_voice::{configure_app, AppState, SessionManager};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    // Load platform configuration
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize observability stack
    init_tracing(
        &config.observability.service_name,
        &config.observability.log_level,
    )
    .expect("Failed to initialize tracing");
    info!("Starting Rapid100 voice triage service");

    let metrics = Arc::new(TriageMetrics::new().expect("Failed to initialize metrics"));

    // Model client, only when a model-backed backend is configured
    let llm_client = match config.triage.backend {
        BackendKind::Rule => None,
        BackendKind::Llm | BackendKind::Hybrid => {
            match OllamaClient::new(
                &config.llm.host,
                &config.llm.model,
                config.llm.temperature,
                config.llm.deadline_ms,
            ) {
                Ok(client) => {
                    let client = Arc::new(client);
                    if config.llm.warmup {
                        let warm = Arc::clone(&client);
                        tokio::spawn(async move { warm.warmup().await });
                    }
                    Some(client)
                }
                Err(e) => {
                    error!(error = %e, "Model client unavailable, falling back to rule backend");
                    None
                }
            }
        }
    };

    // Triage engine; a missing model client degrades to the rule backend
    let engine = match TriageEngine::new(&config.triage, llm_client.clone(), config.llm.deadline_ms)
    {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            warn!(error = %e, "Configured backend unavailable, running rule-only");
            let mut rule_only = config.triage.clone();
            rule_only.backend = BackendKind::Rule;
            Arc::new(
                TriageEngine::new(&rule_only, None, config.llm.deadline_ms)
                    .expect("rule backend always constructs"),
            )
        }
    };

    // Persistence; a down database never stops call handling
    let repository = match core_database::create_pool(&config.database).await {
        Ok(pool) => match core_database::migrations::run_migrations(&pool).await {
            Ok(()) => Some(Arc::new(CallRepository::new(
                pool,
                config.database.write_retries,
            ))),
            Err(e) => {
                error!(error = %e, "Migrations failed, persistence disabled");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "Database unreachable, persistence disabled");
            None
        }
    };

    // Live operator bus
    let hub = BroadcastHub::new(
        config.broadcast.channel_capacity,
        config.broadcast.enabled,
    );

    // Session manager and its TTL sweeper
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&engine),
        repository.clone(),
        hub.clone(),
        Arc::clone(&metrics),
        config.session.clone(),
    ));
    sessions.start_sweeper();

    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers.unwrap_or_else(num_cpus::get);

    info!("Voice service configuration:");
    info!("  Host: {}", host);
    info!("  Port: {}", port);
    info!("  Workers: {}", workers);
    info!("  Backend: {:?}", config.triage.backend);
    info!("  Persistence: {}", repository.is_some());
    info!("  Broadcast: {}", config.broadcast.enabled);

    let state = web::Data::new(AppState {
        config,
        sessions,
        repository,
        hub,
        metrics,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
                    .add(("X-Service", "rapid100-voice")),
            )
            .configure(configure_app)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}
