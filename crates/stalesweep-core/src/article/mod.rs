mod models;

pub use models::{Article, ArticleStatus};
