use crate::{
    actions::{
        recipes::get_recipe_or_404,
        users::{follow_profiles, get_user_by_id},
    },
    error::{unique_violation_as, ApiError, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{FollowProfile, RecipeSummary, User, Uuid},
};

use sqlx::{Pool, Postgres};

/// The per-user recipe lists a recipe can be put on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl RecipeRelation {
    fn table(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "favorites",
            RecipeRelation::ShoppingCart => "shopping_cart",
        }
    }

    fn action(&self) -> ActionType {
        match self {
            RecipeRelation::Favorite => ActionType::ManageOwnFavorites,
            RecipeRelation::ShoppingCart => ActionType::ManageOwnShoppingCart,
        }
    }

    pub fn already_added(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "Recipe is already in favorites",
            RecipeRelation::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    pub fn not_added(&self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "Recipe is not in favorites",
            RecipeRelation::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub async fn add_recipe_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, potion::Error> {
    session.authenticate(relation.action())?;
    let recipe = get_recipe_or_404(recipe_id, pool).await?;
    let table = relation.table();

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let exists: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = $1 AND recipe_id = $2)"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if exists.0 {
        return Err(ApiError::validation(relation.already_added()).into());
    }

    sqlx::query(&format!(
        "INSERT INTO {table} (user_id, recipe_id) VALUES ($1, $2)"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| unique_violation_as(e, relation.already_added()))?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} added recipe {} to {table}", session.username, recipe_id);

    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_recipe_relation(
    relation: RecipeRelation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(relation.action())?;
    get_recipe_or_404(recipe_id, pool).await?;
    let table = relation.table();

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE user_id = $1 AND recipe_id = $2"
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::validation(relation.not_added()).into());
    }

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} removed recipe {} from {table}", session.username, recipe_id);

    Ok(())
}

pub fn check_follow_target(user_id: Uuid, author_id: Uuid) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::validation("You can't subscribe to yourself"));
    }
    Ok(())
}

async fn get_author_or_404(author_id: Uuid, pool: &Pool<Postgres>) -> Result<User, potion::Error> {
    get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id").into())
}

pub async fn follow_author(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<FollowProfile, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    check_follow_target(session.user_id, author_id)?;
    let author = get_author_or_404(author_id, pool).await?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(session.user_id)
    .bind(author_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if exists.0 {
        return Err(ApiError::validation("You are already subscribed to this author").into());
    }

    sqlx::query("INSERT INTO follows (user_id, author_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation_as(e, "You are already subscribed to this author"))?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} subscribed to {}", session.username, author.username);

    follow_profiles(vec![author], Some(session.user_id), None, pool)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("No user exists with specified id").into())
}

pub async fn unfollow_author(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = get_author_or_404(author_id, pool).await?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::validation("You are not subscribed to this author").into());
    }

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} unsubscribed from {}", session.username, author.username);

    Ok(())
}

pub async fn list_subscriptions(
    session: &SessionData,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<FollowProfile>, potion::Error> {
    let authors: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.id
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    follow_profiles(authors, Some(session.user_id), recipes_limit, pool).await
}
