pub mod loan_repository;
pub mod policy_repository;

// パブリックに型を再エクスポート
pub use loan_repository::LoanRepository as PostgresLoanRepository;
pub use policy_repository::PolicyRepository as PostgresPolicyRepository;

/// 埋め込みマイグレーションを適用する
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
