//! # API Middleware
//!
//! - `AuthenticatedUser` : extracteur qui résout l'appelant depuis son token d'accès
//! - `RateLimiter` : limite les requêtes par IP sur une fenêtre fixe
//!
//! L'IP retenue est celle de la connexion TCP. Les en-têtes `X-Forwarded-For`
//! et `Forwarded` ne sont lus que si la connexion vient d'un proxy de confiance.
//!
//! Un token d'accès n'est accepté que s'il est signé, non expiré, de type
//! `access` et encore enregistré (non révoqué) pour l'utilisateur.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, FromRequest, HttpRequest, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::domain::Principal;
use crate::utils::config::Config;
use crate::utils::error::AppError;
use crate::AppState;

/// Extraire le token d'un en-tête `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Appelant authentifié de la requête courante
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Principal);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req.headers()).map(str::to_string);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(AppError::Unauthorized)?;
            let state = state.ok_or(AppError::Internal)?;

            let principal = state
                .user_service
                .authenticate_access_token(&token)
                .await?;
            Ok(AuthenticatedUser(principal))
        })
    }
}

/// Middleware de rate limiting
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_trusted_proxies(max_requests, window, Vec::new())
    }

    pub fn with_trusted_proxies(
        max_requests: u32,
        window: Duration,
        trusted_proxies: Vec<IpAddr>,
    ) -> Self {
        Self {
            store: Arc::new(RateLimitStore {
                enabled: true,
                windows: Mutex::new(HashMap::new()),
                max_requests,
                window,
                trusted_proxies,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        if !config.rate_limit_enabled {
            return Self::disabled();
        }

        Self::with_trusted_proxies(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
            config.rate_limit_trusted_proxies.clone(),
        )
    }

    pub fn disabled() -> Self {
        Self {
            store: Arc::new(RateLimitStore {
                enabled: false,
                windows: Mutex::new(HashMap::new()),
                max_requests: 0,
                window: Duration::ZERO,
                trusted_proxies: Vec::new(),
            }),
        }
    }
}

struct RateLimitStore {
    enabled: bool,
    /// IP -> (début de fenêtre, requêtes comptées)
    windows: Mutex<HashMap<String, (Instant, u32)>>,
    max_requests: u32,
    window: Duration,
    trusted_proxies: Vec<IpAddr>,
}

impl RateLimitStore {
    /// Clé de comptage : IP du pair, ou IP transmise par un proxy de confiance
    fn client_key(&self, req: &ServiceRequest) -> String {
        let peer = match req.peer_addr() {
            Some(addr) => addr.ip(),
            None => return "unknown".to_string(),
        };

        if self.trusted_proxies.contains(&peer) {
            if let Some(forwarded) = req.connection_info().realip_remote_addr() {
                return forwarded.to_string();
            }
        }

        peer.to_string()
    }

    fn check_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Purge des fenêtres terminées
        if windows.len() > 10_000 {
            let window = self.window;
            windows.retain(|_, (started, _)| now.duration_since(*started) <= window);
        }

        let (started, count) = windows.entry(key.to_string()).or_insert((now, 0));

        if now.duration_since(*started) > self.window {
            *started = now;
            *count = 1;
            return true;
        }

        if *count >= self.max_requests {
            false
        } else {
            *count += 1;
            true
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterService {
            service,
            store: self.store.clone(),
        })
    }
}

pub struct RateLimiterService<S> {
    service: S,
    store: Arc<RateLimitStore>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.store.enabled {
            let ip = self.store.client_key(&req);

            if !self.store.check_limit(&ip) {
                warn!("⚠️ Limite de requêtes atteinte pour {}", ip);
                let response = AppError::TooManyRequests
                    .error_response()
                    .map_into_right_body();
                let (request, _) = req.into_parts();
                return Box::pin(async move { Ok(ServiceResponse::new(request, response)) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
