use sqlx::{Postgres, QueryBuilder};

use crate::{error::ApiError, schema::Uuid};

/// Restrictions a recipe listing can be narrowed down with.
///
/// Built from the raw query pairs so that repeated keys (`?tags=a&tags=b`)
/// survive. The favorite and shopping cart flags only apply to a known
/// viewer; anonymous listings ignore them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let author = value
                        .parse::<Uuid>()
                        .map_err(|_| ApiError::validation("Author must be a user id"))?;
                    filter.author = Some(author);
                }
                "tags" => {
                    if !value.is_empty() && !filter.tags.contains(value) {
                        filter.tags.push(value.to_owned());
                    }
                }
                "is_favorited" | "is_favourite" | "is_favoure" => {
                    filter.is_favorited = parse_flag(key, value)?;
                }
                "is_in_shopping_cart" | "is_in_cart" => {
                    filter.is_in_shopping_cart = parse_flag(key, value)?;
                }
                _ => (),
            }
        }

        Ok(filter)
    }

    pub fn query_builder(&self, viewer: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");

        if let Some(author) = self.author {
            query_builder.push(" AND r.author_id = ").push_bind(author);
        }

        if !self.tags.is_empty() {
            query_builder
                .push(
                    " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                     WHERE rt.recipe_id = r.id AND t.slug = ANY(",
                )
                .push_bind(self.tags.clone())
                .push("))");
        }

        if let Some(viewer) = viewer {
            if self.is_favorited {
                query_builder
                    .push(
                        " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
                    )
                    .push_bind(viewer)
                    .push(")");
            }

            if self.is_in_shopping_cart {
                query_builder
                    .push(
                        " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
                    )
                    .push_bind(viewer)
                    .push(")");
            }
        }

        query_builder.push(" ORDER BY r.id DESC");
        query_builder
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        _ => Err(ApiError::Validation(format!("{key} must be 0, 1, true or false"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_repeated_tags_and_flags() {
        let filter = RecipeFilter::from_query(&pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("tags", "breakfast"),
            ("author", "4"),
            ("is_favorited", "1"),
            ("is_in_cart", "false"),
            ("page", "2"),
        ]))
        .expect("valid query");

        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(4));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(RecipeFilter::from_query(&pairs(&[("author", "me")])).is_err());
        assert!(RecipeFilter::from_query(&pairs(&[("is_in_shopping_cart", "maybe")])).is_err());
    }

    #[test]
    fn empty_filter_selects_everything() {
        let filter = RecipeFilter::default();
        let query_builder = filter.query_builder(Some(1));

        assert_eq!(
            query_builder.sql(),
            "SELECT r.* FROM recipes r WHERE TRUE ORDER BY r.id DESC"
        );
    }

    #[test]
    fn tag_filter_matches_any_slug() {
        let filter = RecipeFilter {
            author: Some(2),
            tags: vec![String::from("dinner")],
            ..Default::default()
        };
        let query_builder = filter.query_builder(None);
        let sql = query_builder.sql();

        assert!(sql.contains("r.author_id = $1"));
        assert!(sql.contains("t.slug = ANY($2)"));
    }

    #[test]
    fn anonymous_viewers_skip_relation_flags() {
        let filter = RecipeFilter {
            is_favorited: true,
            is_in_shopping_cart: true,
            ..Default::default()
        };

        let anonymous = filter.query_builder(None);
        assert!(!anonymous.sql().contains("favorites"));
        assert!(!anonymous.sql().contains("shopping_cart"));

        let known = filter.query_builder(Some(9));
        assert!(known.sql().contains("f.user_id = $1"));
        assert!(known.sql().contains("c.user_id = $2"));
    }
}
