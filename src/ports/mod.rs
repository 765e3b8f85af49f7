pub mod catalog_service;
pub mod loan_repository;
pub mod policy_repository;
pub mod user_directory;

pub use catalog_service::CatalogService;
pub use loan_repository::{InsertOutcome, LoanRepository};
pub use policy_repository::PolicyRepository;
pub use user_directory::UserDirectory;
