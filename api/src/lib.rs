pub mod auth;
pub mod blob;
pub mod care;
pub mod customers;
pub mod error;
pub mod opportunities;
pub mod packages;
pub mod pricing;
pub mod quotations;
pub mod sanitize;
pub mod seed;
pub mod sequence;
pub mod shortname;
pub mod surveys;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;

use crate::auth::AuthConfig;
use crate::blob::BlobStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthConfig>,
    pub blob: Option<Arc<BlobStorage>>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/customers", post(customers::create))
        .route("/customers/import", post(customers::import))
        .route(
            "/customers/{id}",
            get(customers::get)
                .patch(customers::update)
                .delete(customers::remove),
        )
        .route("/opportunities", post(opportunities::create))
        .route(
            "/opportunities/{id}",
            get(opportunities::get).patch(opportunities::update),
        )
        .route("/care", post(care::create))
        .route("/care/{id}", get(care::get))
        .route("/care/{id}/complete", post(care::complete))
        .route("/care/{id}/cancel", post(care::cancel))
        .route("/surveys", post(surveys::create))
        .route("/surveys/{id}", get(surveys::get).patch(surveys::update))
        .route("/packages", get(packages::list).post(packages::create))
        .route("/quotations", post(quotations::create))
        .route(
            "/quotations/{id}",
            get(quotations::get).patch(quotations::update),
        )
        .route("/quotations/{id}/price", post(quotations::reprice))
        .route("/quotations/{id}/status", post(quotations::change_status))
        .route("/quotations/{id}/history", get(quotations::history))
        .route("/quotations/{id}/summary", get(quotations::summary))
        .route("/uploads", post(blob::upload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
