use crate::domain::loan::{Loan, LoanLineItem};
use crate::domain::value_objects::{
    BookId, CopyId, DomainId, EditionId, ExtensionCount, LoanId, LoanItemId, UserId,
};
use crate::ports::loan_repository::{InsertOutcome, LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::collections::HashMap;
use uuid::Uuid;

/// シリアライズ失敗を示すSQLSTATE
const SERIALIZATION_FAILURE: &str = "40001";

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// PostgreSQLの行データをLoanLineItemに変換する
fn map_row_to_line_item(row: &PgRow) -> LoanLineItem {
    let domain_ids: Vec<Uuid> = row.get("domain_ids");

    LoanLineItem {
        item_id: LoanItemId::from_uuid(row.get("item_id")),
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        copy_id: CopyId::from_uuid(row.get("copy_id")),
        edition_id: EditionId::from_uuid(row.get("edition_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        domain_ids: domain_ids.into_iter().map(DomainId::from_uuid).collect(),
        loaned_at: row.get("loaned_at"),
        due_date: row.get("due_date"),
        returned_at: row.get("returned_at"),
        extended_at: row.get("extended_at"),
    }
}

/// PostgreSQLの行データと明細からLoanを組み立てる
///
/// extensions_grantedとdeclared_countのi32からの変換で
/// エラーハンドリングを行う。
fn map_row_to_loan(row: &PgRow, items: Vec<LoanLineItem>) -> Result<Loan> {
    let extensions_i32: i32 = row.get("extensions_granted");
    let extensions_granted = ExtensionCount::try_from(extensions_i32).map_err(|e| {
        invalid_data(format!("extensions_granted out of range: {:?}", e))
    })?;

    let declared_i32: i32 = row.get("declared_count");
    let declared_count = u32::try_from(declared_i32)
        .map_err(|_| invalid_data(format!("declared_count out of range: {}", declared_i32)))?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        reader_id: UserId::from_uuid(row.get("reader_id")),
        staff_id: UserId::from_uuid(row.get("staff_id")),
        loaned_at: row.get("loaned_at"),
        extensions_granted,
        declared_count,
        items,
    })
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(SERIALIZATION_FAILURE),
        _ => false,
    }
}

/// LoanRepositoryのPostgreSQL実装
///
/// `loans`と`loan_items`の2テーブルに保存する。
/// 明細の分野は貸出時点の値を`UUID[]`として非正規化して持つ。
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// PostgreSQLコネクションプールから新しいLoanRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 複数の貸出の明細をまとめて読み込み、貸出IDごとにまとめる
    ///
    /// 明細は貸出時に保存した`position`の順に並ぶ。
    async fn load_items(&self, loan_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<LoanLineItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT
                item_id,
                loan_id,
                copy_id,
                edition_id,
                book_id,
                domain_ids,
                loaned_at,
                due_date,
                returned_at,
                extended_at
            FROM loan_items
            WHERE loan_id = ANY($1)
            ORDER BY loan_id, position
            "#,
        )
        .bind(loan_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<LoanLineItem>> = HashMap::new();
        for row in &rows {
            let item = map_row_to_line_item(row);
            grouped.entry(item.loan_id.value()).or_default().push(item);
        }
        Ok(grouped)
    }

    /// 貸出の行に明細を付けてLoanのリストにする
    async fn attach_items(&self, rows: Vec<PgRow>) -> Result<Vec<Loan>> {
        let loan_ids: Vec<Uuid> = rows.iter().map(|row| row.get("loan_id")).collect();
        let mut items = self.load_items(&loan_ids).await?;

        rows.iter()
            .map(|row| {
                let loan_id: Uuid = row.get("loan_id");
                map_row_to_loan(row, items.remove(&loan_id).unwrap_or_default())
            })
            .collect()
    }

    /// 件数確認と書き込みをトランザクション内で行う
    async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        loan: &Loan,
        expected_prior_loans: usize,
    ) -> std::result::Result<InsertOutcome, sqlx::Error> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await?;

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE reader_id = $1")
            .bind(loan.reader_id.value())
            .fetch_one(&mut **tx)
            .await?;

        if usize::try_from(current).ok() != Some(expected_prior_loans) {
            return Ok(InsertOutcome::StaleHistory);
        }

        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                reader_id,
                staff_id,
                loaned_at,
                extensions_granted,
                declared_count
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.reader_id.value())
        .bind(loan.staff_id.value())
        .bind(loan.loaned_at)
        .bind(loan.extensions_granted.value() as i32)
        .bind(loan.declared_count as i32)
        .execute(&mut **tx)
        .await?;

        // 明細ごとに分野の配列を持つためUNNESTではなく1行ずつ挿入する
        for (position, item) in loan.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            let domain_ids: Vec<Uuid> = item.domain_ids.iter().map(DomainId::value).collect();

            sqlx::query(
                r#"
                INSERT INTO loan_items (
                    item_id,
                    loan_id,
                    copy_id,
                    edition_id,
                    book_id,
                    domain_ids,
                    loaned_at,
                    due_date,
                    returned_at,
                    extended_at,
                    position
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(item.item_id.value())
            .bind(loan.loan_id.value())
            .bind(item.copy_id.value())
            .bind(item.edition_id.value())
            .bind(item.book_id.value())
            .bind(&domain_ids)
            .bind(item.loaned_at)
            .bind(item.due_date)
            .bind(item.returned_at)
            .bind(item.extended_at)
            .bind(position)
            .execute(&mut **tx)
            .await?;
        }

        Ok(InsertOutcome::Inserted)
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    /// 貸出と全明細を保存する
    ///
    /// SERIALIZABLEトランザクション内で読者の貸出件数を再確認してから書き込む。
    /// 件数の不一致、またはコミット時のシリアライズ失敗は`StaleHistory`になる。
    async fn insert(&self, loan: &Loan, expected_prior_loans: usize) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let outcome = match Self::insert_in_tx(&mut tx, loan, expected_prior_loans).await {
            Ok(outcome) => outcome,
            Err(err) if is_serialization_failure(&err) => {
                tx.rollback().await?;
                return Ok(InsertOutcome::StaleHistory);
            }
            Err(err) => return Err(err.into()),
        };

        if outcome == InsertOutcome::StaleHistory {
            tx.rollback().await?;
            return Ok(outcome);
        }

        match tx.commit().await {
            Ok(()) => Ok(InsertOutcome::Inserted),
            Err(err) if is_serialization_failure(&err) => Ok(InsertOutcome::StaleHistory),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT
                loan_id,
                reader_id,
                staff_id,
                loaned_at,
                extensions_granted,
                declared_count
            FROM loans
            WHERE loan_id = $1
            "#,
        )
        .bind(loan_id.value())
        .fetch_all(&self.pool)
        .await?;

        Ok(self.attach_items(rows).await?.into_iter().next())
    }

    /// 読者の貸出履歴を取得
    ///
    /// (reader_id, loaned_at)のインデックスを使用する。
    async fn find_by_reader(
        &self,
        reader_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT
                loan_id,
                reader_id,
                staff_id,
                loaned_at,
                extensions_granted,
                declared_count
            FROM loans
            WHERE reader_id = $1
              AND ($2::timestamptz IS NULL OR loaned_at >= $2)
            ORDER BY loaned_at DESC
            "#,
        )
        .bind(reader_id.value())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// 職員が指定日（UTC）に貸し出した明細数
    async fn count_items_lent_by_staff(&self, staff_id: UserId, day: NaiveDate) -> Result<u32> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loan_items i
            JOIN loans l ON l.loan_id = i.loan_id
            WHERE l.staff_id = $1
              AND l.loaned_at >= $2
              AND l.loaned_at < $3
            "#,
        )
        .bind(staff_id.value())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(count)
            .map_err(|_| invalid_data(format!("item count out of range: {}", count)))
    }

    async fn find_line_item(&self, item_id: LoanItemId) -> Result<Option<LoanLineItem>> {
        let row = sqlx::query(
            r#"
            SELECT
                item_id,
                loan_id,
                copy_id,
                edition_id,
                book_id,
                domain_ids,
                loaned_at,
                due_date,
                returned_at,
                extended_at
            FROM loan_items
            WHERE item_id = $1
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_row_to_line_item))
    }

    /// 貸出の延長回数を更新
    async fn update_loan(&self, loan: &Loan) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET extensions_granted = $2
            WHERE loan_id = $1
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.extensions_granted.value() as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_data(format!("loan not found: {}", loan.loan_id.value())));
        }
        Ok(())
    }

    /// 明細の返却予定日・返却日時・延長マーカーを更新
    async fn update_line_item(&self, item: &LoanLineItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE loan_items
            SET due_date = $2,
                returned_at = $3,
                extended_at = $4
            WHERE item_id = $1
            "#,
        )
        .bind(item.item_id.value())
        .bind(item.due_date)
        .bind(item.returned_at)
        .bind(item.extended_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_data(format!(
                "loan item not found: {}",
                item.item_id.value()
            )));
        }
        Ok(())
    }
}
