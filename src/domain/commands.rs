use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, CopyId, LoanId, LoanItemId, UserId};

/// 貸出する蔵書1冊分の指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowItem {
    pub copy_id: CopyId,
    /// 返却予定日（省略時は貸出日 + 14日）
    pub due_date: Option<DateTime<Utc>>,
}

/// コマンド：書籍を貸し出す（複数冊を1回の貸出として）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBooks {
    pub reader_id: UserId,
    pub staff_id: UserId,
    pub declared_count: u32,
    pub items: Vec<BorrowItem>,
    pub extensions_granted: u32,
    pub loaned_at: DateTime<Utc>,
}

/// コマンド：貸出中の書籍をすべて返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBooks {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：貸出から指定タイトルを1冊返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：貸出明細を延長する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendLoanItem {
    pub item_id: LoanItemId,
    pub extended_at: DateTime<Utc>,
}
