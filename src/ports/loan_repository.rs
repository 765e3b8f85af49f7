use crate::domain::loan::{Loan, LoanLineItem};
use crate::domain::value_objects::{LoanId, LoanItemId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 新規貸出の保存結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 貸出と全明細を保存した
    Inserted,
    /// 判定に使った履歴が古い（他の貸出が先に保存された）ため保存しなかった
    StaleHistory,
}

/// 貸出リポジトリポート
///
/// 貸出と明細の永続化を抽象化する。
/// 履歴の読み取りは明細（非正規化済みの分野を含む）込みで返すこと。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 貸出と全明細を1つの作業単位として保存する
    ///
    /// 保存直前の読者の貸出件数が`expected_prior_loans`と異なる場合は
    /// 何も書き込まずに`InsertOutcome::StaleHistory`を返す（楽観的排他）。
    async fn insert(&self, loan: &Loan, expected_prior_loans: usize) -> Result<InsertOutcome>;

    /// IDで貸出を明細込みで取得する
    ///
    /// 明細は保存時の順序で返す。
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 読者の貸出履歴を明細込みで取得する
    ///
    /// `since`を指定した場合は、その日時以降に貸し出されたものだけを返す。
    /// 貸出日の新しい順。
    async fn find_by_reader(
        &self,
        reader_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Loan>>;

    /// 職員が指定日に貸し出した冊数（明細数）を数える
    async fn count_items_lent_by_staff(&self, staff_id: UserId, day: NaiveDate) -> Result<u32>;

    /// IDで貸出明細を取得する
    async fn find_line_item(&self, item_id: LoanItemId) -> Result<Option<LoanLineItem>>;

    /// 貸出（明細を除く）を更新する
    ///
    /// 対象の貸出が存在しない場合はエラーを返す。
    async fn update_loan(&self, loan: &Loan) -> Result<()>;

    /// 貸出明細を更新する
    ///
    /// 対象の明細が存在しない場合はエラーを返す。
    async fn update_line_item(&self, item: &LoanLineItem) -> Result<()>;
}
