pub mod loan;
pub mod settings;
