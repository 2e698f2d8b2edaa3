mod database {
    pub mod actions;
    pub mod error;
    pub mod filter;
    pub mod image;
    pub mod schema;
    pub mod shopping_list;
    #[cfg(test)]
    pub mod testing;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api;
pub mod config;
mod constants;

pub use authentication::*;
pub use constants::*;
pub use database::*;
