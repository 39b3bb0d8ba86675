use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pubfinder::api::{self, routes::middleware::RateLimiter};
use pubfinder::{AppError, AppState, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Chargement de la configuration (.env compris), avant le logging qui en dépend
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ Configuration invalide: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()));
        }
    };

    // Initialisation du logging
    setup_tracing(&config);
    info!("🚀 Démarrage de {} v{}", pubfinder::NAME, pubfinder::VERSION);
    info!("✅ Configuration chargée avec succès");
    info!("🔧 Mode: {}", config.run_mode);

    if config.jwt_secret.len() < 32 {
        warn!("⚠️  JWT_SECRET trop court (< 32 caractères) - risque de sécurité");
    }

    // Initialisation des services
    let state = AppState::build(config.clone()).await.map_err(startup_error)?;
    state.bootstrap_admin().await.map_err(startup_error)?;

    let app_state = web::Data::new(state);
    let rate_limiter = RateLimiter::from_config(&config);
    let frontend_url = config.frontend_url.clone();

    // Configuration du serveur Actix-Web
    let server = HttpServer::new(move || {
        let cors = match &frontend_url {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers(vec![header::HeaderName::from_static("x-user-id")])
                .max_age(3600),
            None => Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .expose_any_header()
                .max_age(3600),
        };

        App::new()
            .wrap(rate_limiter.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(api::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.workers)
    .shutdown_timeout(10);

    info!("✅ Backend démarré avec succès!");
    info!("🔗 API disponible sur http://{}:{}", config.server_host, config.server_port);

    server.run().await
}

/// Configure le tracing pour le logging structuré (`LOG_LEVEL`, `LOG_FORMAT`)
fn setup_tracing(config: &Config) {
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level(config).into()),
        )
        .with(if config.logging_format == "json" {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            ) as Box<dyn tracing_subscriber::Layer<_> + Send + Sync>
        } else {
            Box::new(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_line_number(true)
                    .with_file(true),
            ) as Box<dyn tracing_subscriber::Layer<_> + Send + Sync>
        });

    subscriber.init();
}

fn log_level(config: &Config) -> tracing::Level {
    config.log_level.parse().unwrap_or(tracing::Level::INFO)
}

fn startup_error(err: AppError) -> std::io::Error {
    error!("❌ Échec du démarrage: {}", err);
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}
