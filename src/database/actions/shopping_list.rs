use crate::{
    error::QueryError,
    schema::Uuid,
    shopping_list::{CartLine, ShoppingList},
};

use sqlx::{Pool, Postgres};

/// Every ingredient line of every recipe in the user's cart, unsummed.
pub async fn fetch_cart_lines(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartLine>, potion::Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn generate_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, potion::Error> {
    let lines = fetch_cart_lines(user_id, pool).await?;
    let list = ShoppingList::aggregate(lines);

    log::info!(
        "Generated a shopping list of {} items for user {}",
        list.items().len(),
        user_id
    );

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actions::{
            recipes::create_recipe,
            relations::{add_recipe_relation, RecipeRelation},
        },
        schema::UserRole,
        testing::{ok, recipe_form, session, TestDatabase},
    };

    #[tokio::test]
    async fn cart_lines_are_summed_per_ingredient() {
        let Some(db) = TestDatabase::connect().await else {
            return;
        };
        let author = session(&db.user("author", UserRole::User).await);
        let shopper = session(&db.user("shopper", UserRole::User).await);
        let other = session(&db.user("other", UserRole::User).await);
        let tag = db.tag("baking", "#E26C2D").await;
        let flour = db.ingredient("flour", "g").await;
        let eggs = db.ingredient("eggs", "pcs").await;
        let salt = db.ingredient("salt", "g").await;

        let pancakes = ok(create_recipe(
            recipe_form("Pancakes", &[tag.id], &[(flour.id, 200), (eggs.id, 2)]),
            &author,
            &db.pool,
        )
        .await);
        let bread = ok(create_recipe(
            recipe_form("Bread", &[tag.id], &[(flour.id, 100)]),
            &author,
            &db.pool,
        )
        .await);
        let pretzels = ok(create_recipe(
            recipe_form("Pretzels", &[tag.id], &[(salt.id, 5)]),
            &author,
            &db.pool,
        )
        .await);

        for recipe in [pancakes.id, bread.id] {
            ok(add_recipe_relation(RecipeRelation::ShoppingCart, recipe, &shopper, &db.pool).await);
        }
        ok(add_recipe_relation(RecipeRelation::ShoppingCart, pretzels.id, &other, &db.pool).await);

        assert_eq!(ok(fetch_cart_lines(shopper.user_id, &db.pool).await).len(), 3);

        let list = ok(generate_shopping_list(shopper.user_id, &db.pool).await);
        assert_eq!(list.render(), "Shopping list\neggs - 2/pcs\nflour - 300/g\n");

        let empty = ok(generate_shopping_list(author.user_id, &db.pool).await);
        assert!(empty.is_empty());

        db.close().await;
    }
}
