use crate::domain::policy::Policy;
use crate::ports::policy_repository::{PolicyRepository as PolicyRepositoryTrait, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

/// 整数列を非負のu32として読む
fn get_u32(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.get(column);
    u32::try_from(value).map_err(|_| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} out of range: {}", column, value),
        )) as Box<dyn std::error::Error + Send + Sync>
    })
}

/// PostgreSQLの行データをPolicyに変換する
fn map_row_to_policy(row: &PgRow) -> Result<Policy> {
    Ok(Policy {
        max_domains_per_book: get_u32(row, "max_domains_per_book")?,
        max_books_per_period: get_u32(row, "max_books_per_period")?,
        period_days: get_u32(row, "period_days")?,
        max_books_per_loan: get_u32(row, "max_books_per_loan")?,
        max_books_per_domain: get_u32(row, "max_books_per_domain")?,
        domain_window_months: get_u32(row, "domain_window_months")?,
        max_extensions: get_u32(row, "max_extensions")?,
        reborrow_cooldown_days: get_u32(row, "reborrow_cooldown_days")?,
        reader_daily_limit: get_u32(row, "reader_daily_limit")?,
        staff_daily_lend_limit: get_u32(row, "staff_daily_lend_limit")?,
    })
}

/// PolicyRepositoryのPostgreSQL実装
///
/// `lending_policies`のうち`is_active`な1行を読む。
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepositoryTrait for PolicyRepository {
    async fn get_active_policy(&self) -> Result<Option<Policy>> {
        let row = sqlx::query(
            r#"
            SELECT
                max_domains_per_book,
                max_books_per_period,
                period_days,
                max_books_per_loan,
                max_books_per_domain,
                domain_window_months,
                max_extensions,
                reborrow_cooldown_days,
                reader_daily_limit,
                staff_daily_lend_limit
            FROM lending_policies
            WHERE is_active
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_policy).transpose()
    }
}
