use std::collections::HashMap;

use crate::{
    error::{unique_violation_as, ApiError, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Ingredient, NewIngredient, RecipePart, RecipePartNoId, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Case-insensitive prefix search over ingredient names.
pub async fn search_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let prefix = name.map(str::trim).unwrap_or("");
    let pattern = format!("{}%", escape_like(prefix));

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, measurement_unit",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    ingredient: NewIngredient,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    session.authenticate(ActionType::ManageIngredients)?;
    ingredient.validate()?;

    let row: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(ingredient.name.trim())
    .bind(ingredient.measurement_unit.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| unique_violation_as(e, "This ingredient already exists with that unit"))?;

    log::info!("Created ingredient {} ({})", row.name, row.id);

    Ok(row)
}

pub async fn ensure_ingredients_exist(
    ingredient_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    match ingredient_ids
        .iter()
        .find(|id| !found.iter().any(|row| row.0 == **id))
    {
        Some(id) => Err(ApiError::Validation(format!("Ingredient {id} doesn't exist")).into()),
        None => Ok(()),
    }
}

/// Ingredient lines of every recipe in `recipe_ids`, keyed by recipe, in the
/// order they were written.
pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipePartNoId>>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as("
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ")
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<RecipePartNoId>> = HashMap::new();
    rows.into_iter()
        .for_each(|x| hashmap.entry(x.recipe_id).or_default().push(x.into()));

    Ok(hashmap)
}

/// Clears the ingredient lines of a recipe and writes `parts` in their place.
pub async fn replace_recipe_parts(
    recipe_id: Uuid,
    parts: &[(Uuid, i32)],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !parts.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(parts.iter(), |mut b, (ingredient_id, amount)| {
            b.push_bind(recipe_id)
                .push_bind(*ingredient_id)
                .push_bind(*amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
