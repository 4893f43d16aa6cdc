//! Storefront automation: a rotating product auto-poster, a static site
//! generator for the same catalog and a theme pass over published pages.

pub mod compose;
pub mod config;
pub mod error;
pub mod feed;
pub mod history;
pub mod oauth;
pub mod post;
pub mod poster;
pub mod selector;
pub mod shortener;
pub mod site;
pub mod sitemap;
pub mod slug;
pub mod tracker;

pub use config::Config;
pub use error::{BotError, Result};
