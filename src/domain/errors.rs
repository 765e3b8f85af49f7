use super::ExtensionError;

/// 貸出の構造エラー（冊数や日付の形の不正）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanShapeError {
    /// 明細が1件もない
    NoItems,
    /// 申告冊数と明細数が一致しない
    CountMismatch { declared: u32, actual: usize },
    /// 返却予定日が貸出日より後でない
    DueDateNotAfterLoanDate,
    /// 延長回数が不正
    InvalidExtensionCount,
}

impl From<ExtensionError> for LoanShapeError {
    fn from(_: ExtensionError) -> Self {
        LoanShapeError::InvalidExtensionCount
    }
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 貸出に明細がない
    NoItems,
    /// 指定した書籍が貸出に含まれていない
    BookNotInLoan,
    /// 既に返却済み（1冊返却のみで発生）
    AlreadyReturned,
    /// 返却日時が貸出日時より後でない
    ReturnedBeforeLoan,
}

/// 延長のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendLoanError {
    /// 明細が親の貸出に含まれていない
    ItemNotInLoan,
}
