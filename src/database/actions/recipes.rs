use std::collections::{HashMap, HashSet};

use crate::{
    actions::{
        ingredients::{ensure_ingredients_exist, list_recipe_parts, replace_recipe_parts},
        tags::{ensure_tags_exist, list_recipe_tags, set_recipe_tags},
        users::{list_users_by_id, user_profiles},
    },
    authentication::permissions::ActionType,
    error::{missing_user_as_unauthenticated, ApiError, QueryError},
    filter::RecipeFilter,
    jwt::SessionData,
    schema::{IngredientAmount, RecipeDetail, RecipeForm, RecipePatch, RecipeRow, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    let viewer = session.map(|session| session.user_id);

    let rows: Vec<RecipeRow> = filter
        .query_builder(viewer)
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    render_recipes(rows, viewer, pool).await
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<RecipeRow>, potion::Error> {
    let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_or_404(id: Uuid, pool: &Pool<Postgres>) -> Result<RecipeRow, potion::Error> {
    get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id").into())
}

/// Locks a recipe row for modification inside the caller's transaction.
/// Only its author may change it.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    conn: &mut PgConnection,
) -> Result<RecipeRow, potion::Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe: RecipeRow = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))?;

    if recipe.author_id != session.user_id {
        return Err(ApiError::forbidden().into());
    }

    Ok(recipe)
}

pub async fn get_recipe_detail(
    id: Uuid,
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    let recipe = get_recipe_or_404(id, pool).await?;
    let viewer = session.map(|session| session.user_id);

    render_recipes(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id").into())
}

fn ingredient_pairs(ingredients: &[IngredientAmount]) -> Vec<(Uuid, i32)> {
    ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient.amount))
        .collect()
}

pub async fn create_recipe(
    form: RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = form.validate()?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    ensure_tags_exist(&recipe.tags, &mut tx).await?;
    let ingredient_ids: Vec<Uuid> = recipe.ingredients.iter().map(|i| i.id).collect();
    ensure_ingredients_exist(&ingredient_ids, &mut tx).await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, image_type, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.image.data)
    .bind(&recipe.image.mime_type)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(missing_user_as_unauthenticated)?;

    let recipe_id = id.0;

    set_recipe_tags(recipe_id, &recipe.tags, &mut tx).await?;
    replace_recipe_parts(recipe_id, &ingredient_pairs(&recipe.ingredients), &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!(
        "{} created recipe {} ({})",
        session.username,
        recipe.name,
        recipe_id
    );

    get_recipe_detail(recipe_id, Some(session), pool).await
}

pub async fn update_recipe(
    id: Uuid,
    patch: RecipePatch,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let current = get_recipe_mut(id, session, &mut tx).await?;
    let patch = patch.validate()?;

    let name = patch.name.unwrap_or(current.name);
    let text = patch.text.unwrap_or(current.text);
    let cooking_time = patch.cooking_time.unwrap_or(current.cooking_time);
    let (image, image_type) = match patch.image {
        Some(image) => (image.data, image.mime_type),
        None => (current.image, current.image_type),
    };

    sqlx::query(
        "UPDATE recipes SET name = $1, image = $2, image_type = $3, text = $4, cooking_time = $5 WHERE id = $6",
    )
    .bind(&name)
    .bind(image)
    .bind(image_type)
    .bind(text)
    .bind(cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if let Some(tags) = &patch.tags {
        ensure_tags_exist(tags, &mut tx).await?;
        set_recipe_tags(id, tags, &mut tx).await?;
    }

    if let Some(ingredients) = &patch.ingredients {
        let ingredient_ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
        ensure_ingredients_exist(&ingredient_ids, &mut tx).await?;
        replace_recipe_parts(id, &ingredient_pairs(ingredients), &mut tx).await?;
    }

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} updated recipe {} ({})", session.username, name, id);

    get_recipe_detail(id, Some(session), pool).await
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let recipe = get_recipe_mut(id, session, &mut tx).await?;

    for table in ["recipe_ingredients", "recipe_tags", "favorites", "shopping_cart"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("{} deleted recipe {} ({})", session.username, recipe.name, id);

    Ok(())
}

/// Recipe ids among `recipe_ids` that `user_id` has a row for in `table`.
async fn related_among(
    table: &str,
    user_id: Uuid,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, potion::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {table} WHERE user_id = $1 AND recipe_id = ANY($2)"
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Renders rows through the detail shape, loading tags, ingredient lines,
/// authors and the viewer's favorite/cart flags in one query each.
pub async fn render_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let mut parts = list_recipe_parts(&recipe_ids, pool).await?;

    let authors = list_users_by_id(&author_ids, pool).await?;
    let authors: HashMap<Uuid, _> = user_profiles(authors, viewer, pool)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();

    let (favorites, cart) = match viewer {
        Some(viewer) => (
            related_among("favorites", viewer, &recipe_ids, pool).await?,
            related_among("shopping_cart", viewer, &recipe_ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    rows.into_iter()
        .map(|row| -> Result<RecipeDetail, potion::Error> {
            let author = authors.get(&row.author_id).cloned().ok_or_else(|| {
                QueryError::new(format!("Author {} of recipe {} is missing", row.author_id, row.id))
            })?;

            Ok(RecipeDetail {
                id: row.id,
                tags: tags.remove(&row.id).unwrap_or_default(),
                author,
                ingredients: parts.remove(&row.id).unwrap_or_default(),
                is_favorited: favorites.contains(&row.id),
                is_in_shopping_cart: cart.contains(&row.id),
                image: row.image_uri(),
                name: row.name,
                text: row.text,
                cooking_time: row.cooking_time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actions::relations::{add_recipe_relation, RecipeRelation},
        schema::UserRole,
        testing::{err, ok, recipe_form, session, TestDatabase},
    };

    fn query(pairs: &[(&str, &str)]) -> RecipeFilter {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RecipeFilter::from_query(&pairs).expect("valid filter")
    }

    fn ids(recipes: &[RecipeDetail]) -> Vec<Uuid> {
        recipes.iter().map(|recipe| recipe.id).collect()
    }

    #[tokio::test]
    async fn filters_narrow_the_listing() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = session(&db.user("author", UserRole::User).await);
        let reader = session(&db.user("reader", UserRole::User).await);
        let breakfast = db.tag("breakfast", "#E26C2D").await;
        let dinner = db.tag("dinner", "#49B64E").await;
        let eggs = db.ingredient("eggs", "pcs").await;

        let pancakes = ok(create_recipe(
            recipe_form("Pancakes", &[breakfast.id], &[(eggs.id, 2)]),
            &author,
            &db.pool,
        )
        .await);
        let stew = ok(create_recipe(
            recipe_form("Stew", &[dinner.id], &[(eggs.id, 1)]),
            &author,
            &db.pool,
        )
        .await);

        let everything = ok(fetch_recipes(&query(&[]), None, &db.pool).await);
        assert_eq!(ids(&everything), vec![stew.id, pancakes.id]);

        let tagged = ok(fetch_recipes(&query(&[("tags", "breakfast")]), None, &db.pool).await);
        assert_eq!(ids(&tagged), vec![pancakes.id]);
        assert_eq!(tagged[0].tags[0].slug, "breakfast");

        let either = ok(fetch_recipes(
            &query(&[("tags", "breakfast"), ("tags", "dinner")]),
            None,
            &db.pool,
        )
        .await);
        assert_eq!(either.len(), 2);

        let unknown = ok(fetch_recipes(&query(&[("tags", "brunch")]), None, &db.pool).await);
        assert!(unknown.is_empty());

        ok(add_recipe_relation(RecipeRelation::Favorite, stew.id, &reader, &db.pool).await);

        let favorites =
            ok(fetch_recipes(&query(&[("is_favorited", "1")]), Some(&reader), &db.pool).await);
        assert_eq!(ids(&favorites), vec![stew.id]);
        assert!(favorites[0].is_favorited);
        assert!(!favorites[0].is_in_shopping_cart);

        let anonymous = ok(fetch_recipes(&query(&[("is_favorited", "1")]), None, &db.pool).await);
        assert_eq!(anonymous.len(), 2);
        assert!(anonymous.iter().all(|recipe| !recipe.is_favorited));

        db.close().await;
    }

    #[tokio::test]
    async fn patching_ingredients_replaces_every_line() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = session(&db.user("author", UserRole::User).await);
        let tag = db.tag("breakfast", "#E26C2D").await;
        let flour = db.ingredient("flour", "g").await;
        let eggs = db.ingredient("eggs", "pcs").await;
        let milk = db.ingredient("milk", "ml").await;

        let recipe = ok(create_recipe(
            recipe_form("Pancakes", &[tag.id], &[(flour.id, 200), (eggs.id, 2)]),
            &author,
            &db.pool,
        )
        .await);
        assert_eq!(recipe.ingredients.len(), 2);

        let patch = RecipePatch {
            ingredients: Some(vec![IngredientAmount {
                id: milk.id,
                amount: 300,
            }]),
            ..Default::default()
        };
        let updated = ok(update_recipe(recipe.id, patch, &author, &db.pool).await);

        assert_eq!(updated.name, "Pancakes");
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "milk");
        assert_eq!(updated.ingredients[0].amount, 300);

        let stored: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(recipe.id)
                .fetch_one(&db.pool)
                .await
                .expect("count");
        assert_eq!(stored.0, 1);

        db.close().await;
    }

    #[tokio::test]
    async fn only_authors_change_their_recipes() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = session(&db.user("author", UserRole::User).await);
        let admin = session(&db.user("admin", UserRole::Admin).await);
        let tag = db.tag("breakfast", "#E26C2D").await;
        let flour = db.ingredient("flour", "g").await;

        let recipe = ok(create_recipe(
            recipe_form("Pancakes", &[tag.id], &[(flour.id, 200)]),
            &author,
            &db.pool,
        )
        .await);

        let patch = RecipePatch {
            name: Some(String::from("Crepes")),
            ..Default::default()
        };
        assert_eq!(err(update_recipe(recipe.id, patch, &admin, &db.pool).await).0, 403);
        assert_eq!(err(delete_recipe(recipe.id, &admin, &db.pool).await).0, 403);
        assert_eq!(err(delete_recipe(recipe.id + 1000, &author, &db.pool).await).0, 404);

        ok(delete_recipe(recipe.id, &author, &db.pool).await);
        assert!(ok(get_recipe(recipe.id, &db.pool).await).is_none());

        db.close().await;
    }

    #[tokio::test]
    async fn unknown_references_are_rejected() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = db.user("author", UserRole::User).await;
        let tag = db.tag("breakfast", "#E26C2D").await;
        let flour = db.ingredient("flour", "g").await;

        let (code, info) = err(create_recipe(
            recipe_form("Pancakes", &[tag.id + 1000], &[(flour.id, 200)]),
            &session(&author),
            &db.pool,
        )
        .await);
        assert_eq!(code, 400);
        assert_eq!(info, format!("Tag {} doesn't exist", tag.id + 1000));

        let mut ghost = session(&author);
        ghost.user_id = author.id + 1000;
        let (code, _) = err(create_recipe(
            recipe_form("Pancakes", &[tag.id], &[(flour.id, 200)]),
            &ghost,
            &db.pool,
        )
        .await);
        assert_eq!(code, 401);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
            .fetch_one(&db.pool)
            .await
            .expect("count");
        assert_eq!(count.0, 0);

        db.close().await;
    }

    #[tokio::test]
    async fn concurrent_patches_keep_each_others_fields() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = session(&db.user("author", UserRole::User).await);
        let tag = db.tag("breakfast", "#E26C2D").await;
        let flour = db.ingredient("flour", "g").await;

        let recipe = ok(create_recipe(
            recipe_form("Pancakes", &[tag.id], &[(flour.id, 200)]),
            &author,
            &db.pool,
        )
        .await);

        let rename = RecipePatch {
            name: Some(String::from("Crepes")),
            ..Default::default()
        };
        let slow_down = RecipePatch {
            cooking_time: Some(45),
            ..Default::default()
        };

        let (renamed, slowed) = tokio::join!(
            update_recipe(recipe.id, rename, &author, &db.pool),
            update_recipe(recipe.id, slow_down, &author, &db.pool),
        );
        ok(renamed);
        ok(slowed);

        let stored = ok(get_recipe_or_404(recipe.id, &db.pool).await);
        assert_eq!(stored.name, "Crepes");
        assert_eq!(stored.cooking_time, 45);

        db.close().await;
    }
}
