use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::api::routes::middleware::{bearer_token, AuthenticatedUser};
use crate::models::mapper::dto_to_entity;
use crate::models::{FollowDto, LoginRequest, UserDto};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{require_present, validate_object};
use crate::AppState;

/// Inscription : 201 avec l'identifiant dans `X-User-Id` et la paire de tokens
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<UserDto>,
) -> Result<HttpResponse> {
    let dto = body.into_inner();
    validate_object(&dto)?;
    require_present(dto.password.as_deref(), "password")?;

    let (user_id, tokens) = state
        .user_service
        .register_user(dto_to_entity(&dto))
        .await?;

    Ok(HttpResponse::Created()
        .insert_header(("X-User-Id", user_id.to_string()))
        .json(tokens))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    validate_object(&body.0)?;
    let tokens = state.user_service.login(&body).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Le refresh token est attendu dans `Authorization: Bearer <token>`
#[post("/refreshToken")]
pub async fn refresh_token(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let refresh = bearer_token(req.headers())
        .ok_or_else(|| AppError::BadRequest("Authorization header is required".to_string()))?;

    let tokens = state.user_service.refresh_token(refresh).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[delete("/delete")]
pub async fn delete_user(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<UserDto>,
) -> Result<HttpResponse> {
    let id = body
        .id
        .ok_or_else(|| AppError::BadRequest("id is required".to_string()))?;

    state.user_service.delete(&caller.0, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[put("/edit")]
pub async fn edit(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<UserDto>,
) -> Result<HttpResponse> {
    validate_object(&body.0)?;
    let dto = state.user_service.edit(&caller.0, &body).await?;
    Ok(HttpResponse::Ok().json(dto))
}

#[delete("/revokeUserAccess/{id}")]
pub async fn revoke_user_access(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .user_service
        .revoke_user_access(&caller.0, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let dto = state.user_service.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(dto))
}

#[post("/follow")]
pub async fn follow(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<FollowDto>,
) -> Result<HttpResponse> {
    let dto = state.user_service.follow(&caller.0, &body).await?;
    Ok(HttpResponse::Ok().json(dto))
}

#[post("/unfollow")]
pub async fn unfollow(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    body: web::Json<FollowDto>,
) -> Result<HttpResponse> {
    state.user_service.unfollow(&caller.0, &body).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/{id}/followers")]
pub async fn get_followers(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let followers = state.user_service.get_followers(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(followers))
}

#[get("/{id}/following")]
pub async fn get_following(
    state: web::Data<AppState>,
    _caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let following = state.user_service.get_following(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(following))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        dev::{Service, ServiceResponse},
        http::{header, StatusCode},
        test, web, App,
    };
    use assert_json_diff::assert_json_include;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use crate::models::AuthenticationResponse;
    use crate::test_utils::test_state;

    async fn app() -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
        test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::api::config),
        )
        .await
    }

    async fn register<S>(app: &S, username: &str) -> (Uuid, AuthenticationResponse)
    where
        S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let req = test::TestRequest::post()
            .uri("/user/register")
            .set_json(json!({
                "username": username,
                "email": format!("{}@pubfinder.io", username),
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let id = resp
            .headers()
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap();
        let tokens: AuthenticationResponse = test::read_body_json(resp).await;
        (id, tokens)
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_register_and_get_user() {
        let app = app().await;
        let (id, tokens) = register(&app, "alice").await;
        assert_eq!(tokens.token_type, "Bearer");

        let req = test::TestRequest::get()
            .uri(&format!("/user/{}", id))
            .insert_header(bearer(&tokens.access_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_json_include!(
            actual: body.clone(),
            expected: json!({
                "id": id,
                "username": "alice",
                "email": "alice@pubfinder.io",
                "following": [],
                "followers": []
            })
        );
        assert!(body.get("password").is_none());
    }

    #[actix_web::test]
    async fn test_register_validation_and_conflict() {
        let app = app().await;
        register(&app, "alice").await;

        let duplicate = test::TestRequest::post()
            .uri("/user/register")
            .set_json(json!({
                "username": "alice",
                "email": "other@pubfinder.io",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, duplicate).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let invalid = test::TestRequest::post()
            .uri("/user/register")
            .set_json(json!({ "username": "al", "email": "nope", "password": "short" }))
            .to_request();
        let resp = test::call_service(&app, invalid).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "BAD_REQUEST");

        let no_password = test::TestRequest::post()
            .uri("/user/register")
            .set_json(json!({ "username": "bob", "email": "bob@pubfinder.io" }))
            .to_request();
        let resp = test::call_service(&app, no_password).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_malformed_json() {
        let app = app().await;
        let req = test::TestRequest::post()
            .uri("/user/login")
            .insert_header(header::ContentType::json())
            .set_payload("{not json")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_login_and_refresh() {
        let app = app().await;
        let (_, first) = register(&app, "alice").await;

        let bad = test::TestRequest::post()
            .uri("/user/login")
            .set_json(json!({ "username": "alice", "password": "wrong-password" }))
            .to_request();
        assert_eq!(test::call_service(&app, bad).await.status(), StatusCode::UNAUTHORIZED);

        let good = test::TestRequest::post()
            .uri("/user/login")
            .set_json(json!({ "username": "alice", "password": "password123" }))
            .to_request();
        let resp = test::call_service(&app, good).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let login: AuthenticationResponse = test::read_body_json(resp).await;

        // L'ancien token d'accès a été remplacé
        let req = test::TestRequest::get()
            .uri(&format!("/user/{}", Uuid::new_v4()))
            .insert_header(bearer(&first.access_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let refresh = test::TestRequest::post()
            .uri("/user/refreshToken")
            .insert_header(bearer(&login.refresh_token))
            .to_request();
        let resp = test::call_service(&app, refresh).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let missing = test::TestRequest::post().uri("/user/refreshToken").to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let app = app().await;
        let (id, tokens) = register(&app, "alice").await;

        let anonymous = test::TestRequest::get().uri(&format!("/user/{}", id)).to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);

        // Un refresh token ne donne pas accès aux routes protégées
        let refresh = test::TestRequest::get()
            .uri(&format!("/user/{}", id))
            .insert_header(bearer(&tokens.refresh_token))
            .to_request();
        assert_eq!(test::call_service(&app, refresh).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_follow_flow() {
        let app = app().await;
        let (alice, alice_tokens) = register(&app, "alice").await;
        let (bob, _) = register(&app, "bob").await;

        let req = test::TestRequest::post()
            .uri("/user/follow")
            .insert_header(bearer(&alice_tokens.access_token))
            .set_json(json!({ "userId": alice, "followId": bob }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_json_include!(
            actual: body,
            expected: json!({ "id": alice, "following": [{ "id": bob, "username": "bob" }] })
        );

        let req = test::TestRequest::get()
            .uri(&format!("/user/{}/followers", bob))
            .insert_header(bearer(&alice_tokens.access_token))
            .to_request();
        let followers: Value = test::call_and_read_body_json(&app, req).await;
        assert_json_include!(actual: followers, expected: json!([{ "id": alice, "username": "alice" }]));

        let req = test::TestRequest::post()
            .uri("/user/unfollow")
            .insert_header(bearer(&alice_tokens.access_token))
            .set_json(json!({ "userId": alice, "followId": bob }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/user/{}/following", alice))
            .insert_header(bearer(&alice_tokens.access_token))
            .to_request();
        let following: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(following, json!([]));

        let req = test::TestRequest::post()
            .uri("/user/follow")
            .insert_header(bearer(&alice_tokens.access_token))
            .set_json(json!({ "userId": alice, "followId": alice }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_edit_and_permissions() {
        let app = app().await;
        let (alice, alice_tokens) = register(&app, "alice").await;
        let (_, bob_tokens) = register(&app, "bob").await;

        let edit = json!({
            "id": alice,
            "username": "alice",
            "firstname": "Alice",
            "email": "alice@pubfinder.io"
        });

        let req = test::TestRequest::put()
            .uri("/user/edit")
            .insert_header(bearer(&bob_tokens.access_token))
            .set_json(edit.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri("/user/edit")
            .insert_header(bearer(&alice_tokens.access_token))
            .set_json(edit)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_json_include!(actual: body, expected: json!({ "firstname": "Alice" }));

        // L'édition force une nouvelle connexion
        let req = test::TestRequest::get()
            .uri(&format!("/user/{}", alice))
            .insert_header(bearer(&alice_tokens.access_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_revoke_and_delete() {
        let app = app().await;
        let (alice, alice_tokens) = register(&app, "alice").await;

        let req = test::TestRequest::delete()
            .uri(&format!("/user/revokeUserAccess/{}", alice))
            .insert_header(bearer(&alice_tokens.access_token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let login = test::TestRequest::post()
            .uri("/user/login")
            .set_json(json!({ "username": "alice", "password": "password123" }))
            .to_request();
        let tokens: AuthenticationResponse = test::call_and_read_body_json(&app, login).await;

        let req = test::TestRequest::delete()
            .uri("/user/delete")
            .insert_header(bearer(&tokens.access_token))
            .set_json(json!({ "id": alice }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let login = test::TestRequest::post()
            .uri("/user/login")
            .set_json(json!({ "username": "alice", "password": "password123" }))
            .to_request();
        assert_eq!(test::call_service(&app, login).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_get_unknown_user() {
        let app = app().await;
        let (_, tokens) = register(&app, "alice").await;
        let missing = Uuid::new_v4();

        let req = test::TestRequest::get()
            .uri(&format!("/user/{}", missing))
            .insert_header(bearer(&tokens.access_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_json_include!(
            actual: body,
            expected: json!({
                "error": format!("User with id: {} was not found", missing),
                "code": "NOT_FOUND"
            })
        );
    }
}
