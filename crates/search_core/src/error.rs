pub use errors::SearchError;

pub type Result<T> = std::result::Result<T, SearchError>;
