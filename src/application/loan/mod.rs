mod errors;
mod loan_service;

pub use errors::{ErrorKind, LoanApplicationError, Result};
pub use loan_service::{
    ServiceDependencies, get_loan, insert_loan, return_book, return_books,
    set_extensions_for_loan,
};
