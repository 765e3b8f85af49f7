use thiserror::Error;

use crate::domain::eligibility::BorrowRule;
use crate::domain::{CopyId, ExtendLoanError, LoanShapeError, ReturnBookError};

/// エラーの分類
///
/// API層のステータスコード決定とテストでの判定に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 構造・項目の検証エラー
    StructuralInvalid,
    /// 参照先（読者・職員・蔵書・貸出・明細）が見つからない
    ReferenceMissing,
    /// 貸出ルール違反
    PolicyViolation,
    /// 返却済み（1冊返却のみ）
    AlreadyReturned,
    /// 履歴の読み取り後に他の貸出が保存された
    Conflict,
    /// 外部依存の障害
    Infrastructure,
}

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 貸出の構造が不正
    #[error("Invalid loan: {0}")]
    InvalidLoan(String),

    /// 読者が存在しない、または読者の役割を持たない
    #[error("Reader not found")]
    ReaderNotFound,

    /// 職員が存在しない、または職員の役割を持たない
    #[error("Staff member not found")]
    StaffNotFound,

    /// 蔵書が存在しない
    #[error("Copy not found: {0}")]
    CopyNotFound(CopyId),

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 貸出明細が見つからない
    #[error("Loan item not found")]
    LoanItemNotFound,

    /// 貸出に明細がない
    #[error("Loan has no items")]
    LoanHasNoItems,

    /// 指定した書籍が貸出に含まれていない
    #[error("Book is not part of this loan")]
    BookNotInLoan,

    /// 貸出ルール違反（メッセージはルールの文言そのもの）
    #[error("{0}")]
    PolicyViolation(BorrowRule),

    /// 延長の上限に達している
    #[error("exceeded maximum allowed extensions in the last three months")]
    ExtensionLimitExceeded,

    /// 既に返却済み
    #[error("Book has already been returned")]
    AlreadyReturned,

    /// 判定後に同じ読者の貸出が保存された
    #[error("Reader's loans changed while the loan was being checked")]
    ConcurrentLoanModification,

    /// LoanRepositoryのエラー
    #[error("Loan repository error")]
    LoanRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// UserDirectoryのエラー
    #[error("User directory error")]
    UserDirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// CatalogServiceのエラー
    #[error("Catalog service error")]
    CatalogServiceError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LoanApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanApplicationError::InvalidLoan(_) => ErrorKind::StructuralInvalid,
            LoanApplicationError::ReaderNotFound
            | LoanApplicationError::StaffNotFound
            | LoanApplicationError::CopyNotFound(_)
            | LoanApplicationError::LoanNotFound
            | LoanApplicationError::LoanItemNotFound
            | LoanApplicationError::LoanHasNoItems
            | LoanApplicationError::BookNotInLoan => ErrorKind::ReferenceMissing,
            LoanApplicationError::PolicyViolation(_)
            | LoanApplicationError::ExtensionLimitExceeded => ErrorKind::PolicyViolation,
            LoanApplicationError::AlreadyReturned => ErrorKind::AlreadyReturned,
            LoanApplicationError::ConcurrentLoanModification => ErrorKind::Conflict,
            LoanApplicationError::LoanRepositoryError(_)
            | LoanApplicationError::UserDirectoryError(_)
            | LoanApplicationError::CatalogServiceError(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<BorrowRule> for LoanApplicationError {
    fn from(rule: BorrowRule) -> Self {
        LoanApplicationError::PolicyViolation(rule)
    }
}

impl From<LoanShapeError> for LoanApplicationError {
    fn from(err: LoanShapeError) -> Self {
        let reason = match err {
            LoanShapeError::NoItems => "loan must contain at least one item".to_string(),
            LoanShapeError::CountMismatch { declared, actual } => format!(
                "declared {} books but {} items were given",
                declared, actual
            ),
            LoanShapeError::DueDateNotAfterLoanDate => {
                "expected return date must be after the loan date".to_string()
            }
            LoanShapeError::InvalidExtensionCount => "invalid extension count".to_string(),
        };
        LoanApplicationError::InvalidLoan(reason)
    }
}

impl From<ReturnBookError> for LoanApplicationError {
    fn from(err: ReturnBookError) -> Self {
        match err {
            ReturnBookError::NoItems => LoanApplicationError::LoanHasNoItems,
            ReturnBookError::BookNotInLoan => LoanApplicationError::BookNotInLoan,
            ReturnBookError::AlreadyReturned => LoanApplicationError::AlreadyReturned,
            ReturnBookError::ReturnedBeforeLoan => LoanApplicationError::InvalidLoan(
                "return date must be after the loan date".to_string(),
            ),
        }
    }
}

impl From<ExtendLoanError> for LoanApplicationError {
    fn from(err: ExtendLoanError) -> Self {
        match err {
            ExtendLoanError::ItemNotInLoan => LoanApplicationError::LoanItemNotFound,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
