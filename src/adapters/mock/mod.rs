pub mod catalog_service;
pub mod user_directory;

pub use catalog_service::CatalogService;
pub use user_directory::UserDirectory;
