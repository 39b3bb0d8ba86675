use actix_web::web;

pub mod middleware;
pub mod user;

/// Routes `/user`
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            // Routes publiques
            .service(user::register)
            .service(user::login)
            .service(user::refresh_token)
            // Routes protégées par token d'accès
            .service(user::delete_user)
            .service(user::edit)
            .service(user::revoke_user_access)
            .service(user::follow)
            .service(user::unfollow)
            .service(user::get_followers)
            .service(user::get_following)
            .service(user::get_user),
    );
}
