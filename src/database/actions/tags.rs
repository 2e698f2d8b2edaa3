use std::collections::HashMap;

use crate::{
    error::{unique_violation_as, ApiError, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{LinkedRecipeTag, NewTag, Tag, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn create_tag(
    tag: NewTag,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Tag, potion::Error> {
    session.authenticate(ActionType::ManageTags)?;
    tag.validate()?;

    let row: Tag = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(tag.name.trim())
    .bind(tag.color.to_uppercase())
    .bind(tag.slug)
    .fetch_one(pool)
    .await
    .map_err(|e| unique_violation_as(e, "A tag with this name, color or slug already exists"))?;

    log::info!("Created tag {} ({})", row.slug, row.id);

    Ok(row)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Tags of every recipe in `recipe_ids`, keyed by recipe.
pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Tag>>, potion::Error> {
    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    rows.into_iter()
        .for_each(|x| hashmap.entry(x.recipe_id).or_default().push(x.into()));

    Ok(hashmap)
}

/// Fails with a validation error naming the first id that has no tag.
pub async fn ensure_tags_exist(
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    match tag_ids
        .iter()
        .find(|id| !found.iter().any(|row| row.0 == **id))
    {
        Some(id) => Err(ApiError::Validation(format!("Tag {id} doesn't exist")).into()),
        None => Ok(()),
    }
}

/// Replaces the tag set of a recipe wholesale.
pub async fn set_recipe_tags(
    recipe_id: Uuid,
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !tag_ids.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tag_ids.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
