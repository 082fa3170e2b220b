pub mod auth;
mod catalog;
pub mod error;
mod interactions;
pub mod rate_limit;
mod reviews;
mod system;
mod users;
mod validation;

#[cfg(test)]
mod test_support;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;
use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Login and signup get the tighter auth budget
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_auth,
        ))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let api_routes = Router::new()
        // Interactions
        .route(
            "/interactions",
            get(interactions::list_interactions)
                .post(interactions::upsert_interaction)
                .delete(interactions::delete_interaction),
        )
        .route("/interactions/favorite", put(interactions::set_favorite))
        .route("/interactions/average", get(interactions::average_rating))
        .route(
            "/interactions/:id",
            put(interactions::update_interaction).delete(interactions::delete_interaction_by_id),
        )
        // Users
        .route("/users/me", get(auth::me))
        .route(
            "/users/watchlist",
            get(users::get_watchlist).post(users::add_to_watchlist),
        )
        .route("/users/watchlist/enriched", get(users::get_enriched_watchlist))
        .route("/users/favorites", get(users::get_favorites))
        .route("/users/reviews", get(users::get_user_reviews))
        .route("/users/stats", get(users::get_stats))
        .route("/users/account", delete(users::delete_account))
        // Reviews
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/reviews/title/:media_type/:tmdb_id",
            get(reviews::list_title_reviews),
        )
        .route(
            "/reviews/:id",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/reviews/:id/vote", post(reviews::vote_review))
        // Catalog
        .route("/movies/trending", get(catalog::trending))
        .route("/movies/popular", get(catalog::popular_movies))
        .route("/tv/popular", get(catalog::popular_tv))
        .route("/search/multi", get(catalog::search_multi))
        .route("/details/casts", get(catalog::casts))
        .route("/details/similars", get(catalog::similars))
        .route("/details/:media_type/:id", get(catalog::details))
        .route("/genres", get(catalog::genres))
        // System
        .route("/system/check", get(system::system_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_api,
        ));

    let app = Router::new()
        .route("/health", get(system::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes);

    let base_path = state.config.server.base_path.clone();
    let app = if base_path.is_empty() {
        app
    } else {
        Router::new().nest(&base_path, app)
    };

    app.fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
