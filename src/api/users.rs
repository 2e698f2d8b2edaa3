use serde::Deserialize;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::{
        relations::{follow_author, list_subscriptions, unfollow_author},
        users::{get_user_profile, list_user_profiles},
    },
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

use super::{reply as api_reply, with_state, AppState};

#[derive(Debug, Deserialize)]
struct SubscriptionQuery {
    recipes_limit: Option<usize>,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users_handler);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(me_handler);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_state(state.clone()))
        .and_then(subscriptions_handler);

    let profile = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(profile_handler);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state))
        .and_then(unsubscribe_handler);

    list.or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(profile)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

async fn list_users_handler(
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let result = list_user_profiles(viewer, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn me_handler(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let result = get_user_profile(session.user_id, Some(session.user_id), &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn subscriptions_handler(
    session: SessionData,
    query: SubscriptionQuery,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = list_subscriptions(&session, query.recipes_limit, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn profile_handler(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let result = get_user_profile(id, viewer, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn subscribe_handler(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = follow_author(id, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::CREATED))
}

async fn unsubscribe_handler(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    Ok(api_reply::no_content(
        unfollow_author(id, &session, &state.pool).await,
    ))
}
