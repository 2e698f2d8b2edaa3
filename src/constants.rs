pub const SHOPPING_LIST_FILENAME: &str = "to_buy_list.txt";
pub const SHOPPING_LIST_HEADER: &str = "Shopping list";

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 1;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

/// Recipe payloads carry base64 images.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Tag and ingredient payloads are a few short strings.
pub const MAX_FORM_SIZE: u64 = 16 * 1024;
