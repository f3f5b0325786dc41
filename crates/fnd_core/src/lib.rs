pub mod error;
pub mod models;
pub mod pagination;
pub mod source;
pub mod storage;
pub mod types;

pub use error::Error;
pub use models::{Classifier, ClassifierSource, Prediction};
pub use pagination::{Page, PageRequest};
pub use source::{ImageResolver, NewsSource, RawArticle, RawFields};
pub use storage::ArticleStorage;
pub use types::{
    parse_publication_date, Article, Category, ContentType, NewArticle, Stats, DEFAULT_CATEGORY, DEFAULT_CONFIDENCE,
    GUARDIAN_SECTIONS, NO_IMAGE, RESET_CATEGORIES,
};

pub type Result<T> = std::result::Result<T, Error>;
