use serde::Deserialize;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::ingredients::{create_ingredient, get_ingredient, search_ingredients},
    constants::MAX_FORM_SIZE,
    error::ApiError,
    jwt::SessionData,
    middleware::with_session,
    schema::{NewIngredient, Uuid},
};

use super::{reply as api_reply, with_state, AppState};

#[derive(Debug, Deserialize)]
struct SearchQuery {
    name: Option<String>,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let search = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(with_state(state.clone()))
        .and_then(search_handler);

    let detail = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(detail_handler);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(warp::body::content_length_limit(MAX_FORM_SIZE))
        .and(warp::body::json::<NewIngredient>())
        .and(with_state(state))
        .and_then(create_handler);

    search
        .or(detail)
        .unify()
        .or(create)
        .unify()
        .boxed()
}

async fn search_handler(query: SearchQuery, state: AppState) -> Result<Response, Rejection> {
    let result = search_ingredients(query.name.as_deref(), &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn detail_handler(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let result = match get_ingredient(id, &state.pool).await {
        Ok(Some(ingredient)) => Ok(ingredient),
        Ok(None) => Err(ApiError::not_found("No ingredient exists with specified id").into()),
        Err(e) => Err(e),
    };

    Ok(api_reply::json(result, StatusCode::OK))
}

async fn create_handler(
    session: SessionData,
    ingredient: NewIngredient,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = create_ingredient(ingredient, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::CREATED))
}
