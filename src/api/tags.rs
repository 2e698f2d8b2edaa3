use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::tags::{create_tag, get_tag, list_tags},
    constants::MAX_FORM_SIZE,
    error::ApiError,
    jwt::SessionData,
    middleware::with_session,
    schema::{NewTag, Uuid},
};

use super::{reply as api_reply, with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_handler);

    let detail = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(detail_handler);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(warp::body::content_length_limit(MAX_FORM_SIZE))
        .and(warp::body::json::<NewTag>())
        .and(with_state(state))
        .and_then(create_handler);

    list.or(detail)
        .unify()
        .or(create)
        .unify()
        .boxed()
}

async fn list_handler(state: AppState) -> Result<Response, Rejection> {
    Ok(api_reply::json(list_tags(&state.pool).await, StatusCode::OK))
}

async fn detail_handler(id: Uuid, state: AppState) -> Result<Response, Rejection> {
    let result = match get_tag(id, &state.pool).await {
        Ok(Some(tag)) => Ok(tag),
        Ok(None) => Err(ApiError::not_found("No tag exists with specified id").into()),
        Err(e) => Err(e),
    };

    Ok(api_reply::json(result, StatusCode::OK))
}

async fn create_handler(
    session: SessionData,
    tag: NewTag,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = create_tag(tag, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::CREATED))
}
