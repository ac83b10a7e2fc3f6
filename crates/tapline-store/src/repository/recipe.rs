//! # Recipe Repository
//!
//! Database operations for sellable recipes. Ingredients are stored as one
//! JSON document per recipe; only scalar columns are filtered in SQL.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::repository::{keyword, parse_json, parse_keyword, to_json};
use tapline_core::Recipe;

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: String,
    name: String,
    category: String,
    price_cents: i64,
    ingredients: String,
    serving_size_ml: Option<f64>,
    created_at: DateTime<Utc>,
}

impl RecipeRow {
    fn into_recipe(self) -> StoreResult<Recipe> {
        let category = parse_keyword("Recipe", &self.id, &self.category)?;
        let ingredients = parse_json("Recipe", &self.id, &self.ingredients)?;
        Ok(Recipe {
            id: self.id,
            name: self.name,
            category,
            price_cents: self.price_cents,
            ingredients,
            serving_size_ml: self.serving_size_ml,
            created_at: self.created_at,
        })
    }
}

/// Repository for recipe database operations.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    /// Creates a new RecipeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecipeRepository { pool }
    }

    /// Inserts or replaces a recipe for the given user.
    pub async fn upsert(&self, user_id: &str, recipe: &Recipe) -> StoreResult<()> {
        debug!(user_id = %user_id, recipe_id = %recipe.id, "Upserting recipe");

        let ingredients = to_json("Recipe", &recipe.id, &recipe.ingredients)?;

        sqlx::query(
            r#"
            INSERT INTO recipes
                (user_id, id, name, category, price_cents, ingredients,
                 serving_size_ml, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id, id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price_cents = excluded.price_cents,
                ingredients = excluded.ingredients,
                serving_size_ml = excluded.serving_size_ml
            "#,
        )
        .bind(user_id)
        .bind(&recipe.id)
        .bind(&recipe.name)
        .bind(keyword(&recipe.category))
        .bind(recipe.price_cents)
        .bind(ingredients)
        .bind(recipe.serving_size_ml)
        .bind(recipe.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a recipe by id.
    pub async fn get(&self, user_id: &str, id: &str) -> StoreResult<Option<Recipe>> {
        let row: Option<RecipeRow> = sqlx::query_as(
            r#"
            SELECT id, name, category, price_cents, ingredients,
                   serving_size_ml, created_at
            FROM recipes
            WHERE user_id = ?1 AND id = ?2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RecipeRow::into_recipe).transpose()
    }

    /// Lists all recipes for a user, ordered by name.
    pub async fn list(&self, user_id: &str) -> StoreResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            r#"
            SELECT id, name, category, price_cents, ingredients,
                   serving_size_ml, created_at
            FROM recipes
            WHERE user_id = ?1
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecipeRow::into_recipe).collect()
    }

    /// Deletes a recipe.
    pub async fn delete(&self, user_id: &str, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE user_id = ?1 AND id = ?2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Recipe", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
