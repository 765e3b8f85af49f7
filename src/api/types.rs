use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::commands::{BorrowBooks, BorrowItem};
use crate::domain::loan::{Loan, LoanLineItem};
use crate::domain::value_objects::{CopyId, UserId};

/// 貸出する蔵書1冊分（POST /loans）
#[derive(Debug, Deserialize)]
pub struct BorrowItemRequest {
    pub copy_id: Uuid,
    /// 省略時は貸出日 + 14日
    pub due_date: Option<DateTime<Utc>>,
}

/// 貸出作成リクエスト（POST /loans）
#[derive(Debug, Deserialize)]
pub struct BorrowBooksRequest {
    pub reader_id: Uuid,
    pub staff_id: Uuid,
    pub declared_count: u32,
    pub items: Vec<BorrowItemRequest>,
    #[serde(default)]
    pub extensions_granted: u32,
}

impl BorrowBooksRequest {
    pub fn to_command(&self, loaned_at: DateTime<Utc>) -> BorrowBooks {
        BorrowBooks {
            reader_id: UserId::from_uuid(self.reader_id),
            staff_id: UserId::from_uuid(self.staff_id),
            declared_count: self.declared_count,
            items: self
                .items
                .iter()
                .map(|item| BorrowItem {
                    copy_id: CopyId::from_uuid(item.copy_id),
                    due_date: item.due_date,
                })
                .collect(),
            extensions_granted: self.extensions_granted,
            loaned_at,
        }
    }
}

/// 貸出明細レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanItemResponse {
    pub item_id: Uuid,
    pub copy_id: Uuid,
    pub edition_id: Uuid,
    pub book_id: Uuid,
    pub domain_ids: Vec<Uuid>,
    pub loaned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub extended_at: Option<DateTime<Utc>>,
}

impl From<&LoanLineItem> for LoanItemResponse {
    fn from(item: &LoanLineItem) -> Self {
        Self {
            item_id: item.item_id.value(),
            copy_id: item.copy_id.value(),
            edition_id: item.edition_id.value(),
            book_id: item.book_id.value(),
            domain_ids: item.domain_ids.iter().map(|d| d.value()).collect(),
            loaned_at: item.loaned_at,
            due_date: item.due_date,
            returned_at: item.returned_at,
            extended_at: item.extended_at,
        }
    }
}

/// 貸出レスポンス（すべての貸出エンドポイント共通）
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub reader_id: Uuid,
    pub staff_id: Uuid,
    pub loaned_at: DateTime<Utc>,
    pub extensions_granted: u32,
    pub declared_count: u32,
    pub fully_returned: bool,
    pub items: Vec<LoanItemResponse>,
}

impl From<&Loan> for LoanResponse {
    fn from(loan: &Loan) -> Self {
        Self {
            loan_id: loan.loan_id.value(),
            reader_id: loan.reader_id.value(),
            staff_id: loan.staff_id.value(),
            loaned_at: loan.loaned_at,
            extensions_granted: loan.extensions_granted.value(),
            declared_count: loan.declared_count,
            fully_returned: loan.is_fully_returned(),
            items: loan.items.iter().map(LoanItemResponse::from).collect(),
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
