use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT},
    error::ApiError,
    image::EncodedImage,
};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: Vec<u8>,
    pub image_type: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeRow {
    pub fn image_uri(&self) -> String {
        EncodedImage::to_data_uri(&self.image_type, &self.image)
    }
}

/// A recipe tag joined with the recipe it belongs to.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedRecipeTag {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(value: LinkedRecipeTag) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
            slug: value.slug,
        }
    }
}

/// An ingredient line joined with the recipe it belongs to.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipePart {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipePartNoId {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipePartNoId {
    fn from(value: RecipePart) -> Self {
        Self {
            id: value.id,
            name: value.name,
            measurement_unit: value.measurement_unit,
            amount: value.amount,
        }
    }
}

// Wire representations

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Short recipe view used by favorites, the shopping cart and subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&RecipeRow> for RecipeSummary {
    fn from(value: &RecipeRow) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
            image: value.image_uri(),
            cooking_time: value.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipePartNoId>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

// Write payloads

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// A recipe payload that passed field validation, with its image decoded.
#[derive(Debug, Clone)]
pub struct ValidRecipe {
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
    pub name: String,
    pub image: EncodedImage,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ValidRecipePatch {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub image: Option<EncodedImage>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeForm {
    pub fn validate(self) -> Result<ValidRecipe, ApiError> {
        validate_tags(&self.tags)?;
        validate_ingredients(&self.ingredients)?;
        validate_name(&self.name)?;
        validate_cooking_time(self.cooking_time)?;
        let image = EncodedImage::from_data_uri(&self.image)?;

        Ok(ValidRecipe {
            tags: self.tags,
            ingredients: self.ingredients,
            name: self.name.trim().to_string(),
            image,
            text: self.text,
            cooking_time: self.cooking_time,
        })
    }
}

impl RecipePatch {
    pub fn validate(self) -> Result<ValidRecipePatch, ApiError> {
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        if let Some(ingredients) = &self.ingredients {
            validate_ingredients(ingredients)?;
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            validate_cooking_time(cooking_time)?;
        }
        let image = self
            .image
            .as_deref()
            .map(EncodedImage::from_data_uri)
            .transpose()?;

        Ok(ValidRecipePatch {
            tags: self.tags,
            ingredients: self.ingredients,
            name: self.name.map(|name| name.trim().to_string()),
            image,
            text: self.text,
            cooking_time: self.cooking_time,
        })
    }
}

fn validate_tags(tags: &[Uuid]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("Add at least one tag"));
    }
    let unique: HashSet<&Uuid> = tags.iter().collect();
    if unique.len() != tags.len() {
        return Err(ApiError::validation("Tags must not repeat"));
    }
    Ok(())
}

fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Err(ApiError::validation("Add at least one ingredient"));
    }
    if ingredients
        .iter()
        .any(|ingredient| ingredient.amount < MIN_INGREDIENT_AMOUNT)
    {
        return Err(ApiError::validation("Amount must be greater than zero"));
    }
    let unique: HashSet<Uuid> = ingredients.iter().map(|ingredient| ingredient.id).collect();
    if unique.len() != ingredients.len() {
        return Err(ApiError::validation("Ingredients must not repeat"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Recipe name must not be empty"));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i32) -> Result<(), ApiError> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(ApiError::validation("Cooking time must be at least 1 minute"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl NewTag {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Tag name must not be empty"));
        }

        let hex = self.color.strip_prefix('#').unwrap_or("");
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ApiError::validation("Color must be a hex code like #E26C2D"));
        }

        if self.slug.is_empty()
            || !self
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ApiError::validation(
                "Slug may only contain letters, digits, '-' and '_'",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

impl NewIngredient {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.measurement_unit.trim().is_empty() {
            return Err(ApiError::validation(
                "Ingredient name and measurement unit are required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn form() -> RecipeForm {
        RecipeForm {
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 10, amount: 200 },
                IngredientAmount { id: 11, amount: 1 },
            ],
            name: String::from(" Pancakes "),
            image: String::from(PIXEL),
            text: String::from("Mix and fry."),
            cooking_time: 20,
        }
    }

    #[test]
    fn valid_form_passes_and_decodes_image() {
        let recipe = form().validate().expect("valid recipe");
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.image.mime_type, "image/png");
        assert_eq!(recipe.ingredients.len(), 2);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [0, -5] {
            let mut recipe = form();
            recipe.ingredients[1].amount = amount;
            assert_eq!(
                recipe.validate().err(),
                Some(ApiError::validation("Amount must be greater than zero"))
            );
        }
    }

    #[test]
    fn empty_tags_and_ingredients_are_rejected() {
        let mut recipe = form();
        recipe.tags.clear();
        assert_eq!(
            recipe.validate().err(),
            Some(ApiError::validation("Add at least one tag"))
        );

        let mut recipe = form();
        recipe.ingredients.clear();
        assert_eq!(
            recipe.validate().err(),
            Some(ApiError::validation("Add at least one ingredient"))
        );
    }

    #[test]
    fn repeated_references_are_rejected() {
        let mut recipe = form();
        recipe.tags = vec![3, 3];
        assert!(recipe.validate().is_err());

        let mut recipe = form();
        recipe.ingredients[1].id = 10;
        assert_eq!(
            recipe.validate().err(),
            Some(ApiError::validation("Ingredients must not repeat"))
        );
    }

    #[test]
    fn cooking_time_must_be_positive() {
        let mut recipe = form();
        recipe.cooking_time = 0;
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn patch_only_checks_supplied_fields() {
        let patch = RecipePatch {
            name: Some(String::from("Waffles")),
            ..Default::default()
        };
        let patch = patch.validate().expect("valid patch");
        assert_eq!(patch.name.as_deref(), Some("Waffles"));
        assert!(patch.tags.is_none());
        assert!(patch.ingredients.is_none());

        let patch = RecipePatch {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 0 }]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = RecipePatch {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn recipe_form_rejects_fractional_amounts() {
        let body = r#"{
            "tags": [1],
            "ingredients": [{"id": 1, "amount": 1.5}],
            "name": "Tea",
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "text": "Steep.",
            "cooking_time": 3
        }"#;
        assert!(serde_json::from_str::<RecipeForm>(body).is_err());
    }

    #[test]
    fn new_tag_checks_color_and_slug() {
        let tag = NewTag {
            name: String::from("Breakfast"),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        };
        assert!(tag.validate().is_ok());

        let bad_color = NewTag {
            color: String::from("orange"),
            ..tag.clone()
        };
        assert!(bad_color.validate().is_err());

        let bad_slug = NewTag {
            slug: String::from("early breakfast"),
            ..tag
        };
        assert!(bad_slug.validate().is_err());
    }

    #[test]
    fn follow_profile_flattens_the_user() {
        let profile = FollowProfile {
            profile: UserProfile {
                id: 3,
                email: String::from("cook@example.com"),
                username: String::from("cook"),
                first_name: String::from("Ada"),
                last_name: String::from("Cook"),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 4,
        };

        let value = serde_json::to_value(&profile).expect("serializable");
        assert_eq!(value["username"], "cook");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 4);
    }
}
