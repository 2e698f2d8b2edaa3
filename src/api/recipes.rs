use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Reply, Response},
    Filter, Rejection,
};

use crate::{
    actions::{
        recipes::{create_recipe, delete_recipe, fetch_recipes, get_recipe_detail, update_recipe},
        relations::{add_recipe_relation, remove_recipe_relation, RecipeRelation},
        shopping_list::generate_shopping_list,
    },
    constants::{MAX_BODY_SIZE, SHOPPING_LIST_FILENAME},
    filter::RecipeFilter,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::{RecipeForm, RecipePatch, Uuid},
};

use super::{reply as api_reply, with_state, AppState};

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let download = warp::path("recipes")
        .and(
            warp::path("download_shopping_cart")
                .or(warp::path("download_cart"))
                .unify(),
        )
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart_handler);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes_handler);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.secret.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json::<RecipeForm>())
        .and(with_state(state.clone()))
        .and_then(create_handler);

    let detail = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(detail_handler);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(state.secret.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json::<RecipePatch>())
        .and(with_state(state.clone()))
        .and_then(update_handler);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_handler);

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(relation_routes("favorite", RecipeRelation::Favorite, state.clone()))
        .unify()
        .or(relation_routes(
            "shopping_cart",
            RecipeRelation::ShoppingCart,
            state,
        ))
        .unify()
        .boxed()
}

/// `POST` and `DELETE` on `/recipes/{id}/<segment>`.
fn relation_routes(
    segment: &'static str,
    relation: RecipeRelation,
    state: AppState,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(warp::any().map(move || relation))
        .and(with_session(state.secret.clone()))
        .and(with_state(state.clone()))
        .and_then(add_relation_handler);

    let remove = path
        .and(warp::delete())
        .and(warp::any().map(move || relation))
        .and(with_session(state.secret.clone()))
        .and(with_state(state))
        .and_then(remove_relation_handler);

    add.or(remove).unify().boxed()
}

async fn list_recipes_handler(
    query: Vec<(String, String)>,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match RecipeFilter::from_query(&query) {
        Ok(filter) => fetch_recipes(&filter, session.as_ref(), &state.pool).await,
        Err(e) => Err(e.into()),
    };

    Ok(api_reply::json(result, StatusCode::OK))
}

async fn create_handler(
    session: SessionData,
    form: RecipeForm,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = create_recipe(form, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::CREATED))
}

async fn detail_handler(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = get_recipe_detail(id, session.as_ref(), &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn update_handler(
    id: Uuid,
    session: SessionData,
    patch: RecipePatch,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = update_recipe(id, patch, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::OK))
}

async fn delete_handler(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    Ok(api_reply::no_content(
        delete_recipe(id, &session, &state.pool).await,
    ))
}

async fn add_relation_handler(
    id: Uuid,
    relation: RecipeRelation,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = add_recipe_relation(relation, id, &session, &state.pool).await;
    Ok(api_reply::json(result, StatusCode::CREATED))
}

async fn remove_relation_handler(
    id: Uuid,
    relation: RecipeRelation,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    Ok(api_reply::no_content(
        remove_recipe_relation(relation, id, &session, &state.pool).await,
    ))
}

async fn download_shopping_cart_handler(
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let list = match generate_shopping_list(session.user_id, &state.pool).await {
        Ok(list) => list,
        Err(e) => return Ok(api_reply::error(e)),
    };

    let response = reply::with_header(
        reply::with_header(list.render(), "Content-Type", "text/plain; charset=utf-8"),
        "Content-Disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    );

    Ok(response.into_response())
}
