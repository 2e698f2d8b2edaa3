//! Fixtures for tests that need a live Postgres.
//!
//! Each database gets its own schema loaded from `sql/schema.sql`, so tests
//! can run in parallel against one server. Without `DATABASE_URL` the
//! fixtures return `None` and the calling test passes vacuously.

use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use crate::{
    jwt::SessionData,
    schema::{Ingredient, IngredientAmount, RecipeForm, Tag, User, UserRole, Uuid},
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");
pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

static SCHEMA_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub struct TestDatabase {
    pub pool: Pool<Postgres>,
    url: String,
    schema: String,
}

impl TestDatabase {
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        };

        let schema = format!(
            "foodgram_test_{}_{}",
            std::process::id(),
            SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst)
        );

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("connect to DATABASE_URL");
        admin
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .expect("create schema");
        admin.close().await;

        let search_path = format!("SET search_path TO {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("connect to test schema");

        pool.execute(SCHEMA).await.expect("load sql/schema.sql");

        Some(Self { pool, url, schema })
    }

    pub async fn close(self) {
        self.pool.close().await;

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.url)
            .await
            .expect("connect to DATABASE_URL");
        admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await
            .expect("drop schema");
        admin.close().await;
    }

    pub async fn user(&self, username: &str, role: UserRole) -> User {
        sqlx::query_as("INSERT INTO users (email, username, role) VALUES ($1, $2, $3) RETURNING *")
            .bind(format!("{username}@example.com"))
            .bind(username)
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .expect("insert user")
    }

    pub async fn tag(&self, slug: &str, color: &str) -> Tag {
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(slug.to_uppercase())
            .bind(color)
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .expect("insert tag")
    }

    pub async fn ingredient(&self, name: &str, measurement_unit: &str) -> Ingredient {
        sqlx::query_as(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(&self.pool)
        .await
        .expect("insert ingredient")
    }
}

pub fn session(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
    }
}

pub fn recipe_form(name: &str, tags: &[Uuid], ingredients: &[(Uuid, i32)]) -> RecipeForm {
    RecipeForm {
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        name: name.to_string(),
        image: PIXEL.to_string(),
        text: String::from("Mix everything."),
        cooking_time: 10,
    }
}

/// Unwraps an action result, panicking with the error message.
pub fn ok<T>(result: Result<T, potion::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("unexpected error {}: {:?}", e.code as u16, e.info),
    }
}

/// Status code and message of a failed action.
pub fn err<T>(result: Result<T, potion::Error>) -> (u16, String) {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => (e.code as u16, e.info.unwrap_or_default()),
    }
}
