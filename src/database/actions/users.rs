use std::collections::{HashMap, HashSet};

use crate::{
    error::{ApiError, QueryError},
    schema::{FollowProfile, RecipeRow, RecipeSummary, User, UserProfile, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_users(pool: &Pool<Postgres>) -> Result<Vec<User>, potion::Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_users_by_id(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<User>, potion::Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Which of `author_ids` the viewer follows.
pub async fn followed_among(
    viewer: Option<Uuid>,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, potion::Error> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };

    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = ANY($2)")
            .bind(viewer)
            .bind(author_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn user_profiles(
    users: Vec<User>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, potion::Error> {
    let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
    let followed = followed_among(viewer, &ids, pool).await?;

    Ok(users
        .into_iter()
        .map(|user| {
            let is_subscribed = followed.contains(&user.id);
            UserProfile::from_user(user, is_subscribed)
        })
        .collect())
}

pub async fn get_user_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))?;

    let mut profiles = user_profiles(vec![user], viewer, pool).await?;
    profiles
        .pop()
        .ok_or_else(|| ApiError::not_found("No user exists with specified id").into())
}

pub async fn list_user_profiles(
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, potion::Error> {
    let users = list_users(pool).await?;
    user_profiles(users, viewer, pool).await
}

/// Follow view of each author: their profile, newest recipes first (at most
/// `recipes_limit` of them) and how many recipes they have in total.
pub async fn follow_profiles(
    authors: Vec<User>,
    viewer: Option<Uuid>,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<FollowProfile>, potion::Error> {
    let ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();

    let rows: Vec<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE author_id = ANY($1) ORDER BY id DESC")
            .bind(&ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<RecipeSummary>> = HashMap::new();
    rows.iter().for_each(|row| {
        hashmap
            .entry(row.author_id)
            .or_default()
            .push(RecipeSummary::from(row))
    });

    let profiles = user_profiles(authors, viewer, pool).await?;

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let mut recipes = hashmap.remove(&profile.id).unwrap_or_default();
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }

            FollowProfile {
                profile,
                recipes,
                recipes_count,
            }
        })
        .collect())
}
