use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::{Filter, Reply};

pub mod ingredients;
pub mod recipes;
pub mod reply;
pub mod tags;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub secret: Arc<String>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, secret: String) -> Self {
        Self {
            pool,
            secret: Arc::new(secret),
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Every endpoint under `/api`, with rejections rendered as JSON errors.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let log = warp::log::custom(|info| {
        log::info!(
            "{} {} {} ({:?})",
            info.method(),
            info.path(),
            info.status().as_u16(),
            info.elapsed()
        );
    });

    warp::path("api")
        .and(
            recipes::routes(state.clone())
                .or(users::routes(state.clone()))
                .unify()
                .or(tags::routes(state.clone()))
                .unify()
                .or(ingredients::routes(state))
                .unify(),
        )
        .recover(reply::recover)
        .with(log)
}
