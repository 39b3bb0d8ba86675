pub mod routes;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::models::HealthStatus;
use crate::utils::error::AppError;
use crate::AppState;

/// Configure toutes les routes de l'API
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));

    cfg.configure(routes::config);

    // Endpoint de santé
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

/// Corps JSON illisible ou invalide : 400 au format d'erreur standard
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Endpoint de santé pour monitoring
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let cache = match state.cache.health_check().await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    HttpResponse::Ok().json(HealthStatus {
        status: "healthy".to_string(),
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        cache: cache.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::Value;

    use crate::test_utils::test_state;

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(super::config),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["cache"], "up");
        assert_eq!(body["version"], crate::VERSION);
    }
}
