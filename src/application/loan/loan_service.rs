use crate::domain::commands::*;
use crate::domain::eligibility::{self, BorrowContext};
use crate::domain::loan::{self, Loan, User};
use crate::domain::policy::Policy;
use crate::domain::value_objects::*;
use crate::ports::*;
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;

use super::errors::{ErrorKind, LoanApplicationError, Result};

/// 延長回数を数える遡及期間（月）
const EXTENSION_WINDOW_MONTHS: u32 = 3;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
///
/// `policy`は起動時に一度だけ読み込んだスナップショット。
/// 役割係数はここには持たず、判定のたびに利用者から計算する。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_repository: Arc<dyn LoanRepository>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub catalog_service: Arc<dyn CatalogService>,
    pub policy: Policy,
}

/// 失敗をログに残す（呼び出し元へはそのまま返す）
fn log_failure<T>(operation: &'static str, result: &Result<T>) {
    if let Err(err) = result {
        match err.kind() {
            ErrorKind::Infrastructure => {
                tracing::error!(operation = operation, error = ?err, "Loan operation failed");
            }
            _ => {
                tracing::warn!(operation = operation, error = %err, "Loan operation rejected");
            }
        }
    }
}

/// 貸出をIDで読み込むヘルパー関数
async fn load_loan(loan_repository: &Arc<dyn LoanRepository>, loan_id: LoanId) -> Result<Loan> {
    loan_repository
        .find_by_id(loan_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 読者を解決する（存在し、読者の役割を持つこと）
async fn resolve_reader(deps: &ServiceDependencies, reader_id: UserId) -> Result<User> {
    deps.user_directory
        .find_user(reader_id)
        .await
        .map_err(LoanApplicationError::UserDirectoryError)?
        .filter(User::is_reader)
        .ok_or(LoanApplicationError::ReaderNotFound)
}

/// 職員を解決する（存在し、職員の役割を持つこと）
async fn resolve_staff(deps: &ServiceDependencies, staff_id: UserId) -> Result<User> {
    deps.user_directory
        .find_user(staff_id)
        .await
        .map_err(LoanApplicationError::UserDirectoryError)?
        .filter(User::is_staff)
        .ok_or(LoanApplicationError::StaffNotFound)
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 明細が1件以上あり、申告冊数と一致すること
/// - 読者・職員がそれぞれの役割で存在すること
/// - すべての蔵書がカタログで解決できること
/// - 貸出ルール（`check_borrow_eligibility`）をすべて満たすこと
///
/// # 一貫性保証
///
/// 貸出と明細は`LoanRepository::insert`で1つの作業単位として保存される。
/// 判定に使った履歴の件数を渡し、保存時点で件数が変わっていれば
/// `ConcurrentLoanModification`を返す（同じ読者への同時貸出の競合対策）。
///
/// # 戻り値
/// 保存された貸出（明細込み）
pub async fn insert_loan(deps: &ServiceDependencies, cmd: BorrowBooks) -> Result<Loan> {
    let reader_id = cmd.reader_id;
    let result = try_insert_loan(deps, cmd).await;
    log_failure("insert_loan", &result);

    if let Ok(loan) = &result {
        tracing::info!(
            loan_id = %loan.loan_id,
            reader_id = %reader_id,
            items = loan.item_count(),
            "Loan created"
        );
    }
    result
}

async fn try_insert_loan(deps: &ServiceDependencies, cmd: BorrowBooks) -> Result<Loan> {
    let loaned_at = cmd.loaned_at;

    // 1. 構造の検証
    loan::validate_shape(cmd.declared_count, cmd.items.len())?;

    // 2. 読者・職員の解決
    let reader = resolve_reader(deps, cmd.reader_id).await?;
    let staff = resolve_staff(deps, cmd.staff_id).await?;

    // 3. 蔵書の解決と明細の作成
    let loan_id = LoanId::new();
    let mut items = Vec::with_capacity(cmd.items.len());
    for requested in &cmd.items {
        let copy = deps
            .catalog_service
            .resolve_copy(requested.copy_id)
            .await
            .map_err(LoanApplicationError::CatalogServiceError)?
            .ok_or(LoanApplicationError::CopyNotFound(requested.copy_id))?;

        items.push(loan::new_line_item(
            loan_id,
            &copy,
            loaned_at,
            requested.due_date,
        )?);
    }

    let candidate = loan::open_loan(
        loan_id,
        reader.user_id,
        staff.user_id,
        loaned_at,
        cmd.declared_count,
        ExtensionCount::from(cmd.extensions_granted),
        items,
    )?;

    // 4. 履歴と職員の本日の貸出冊数を取得
    let (prior_loans, staff_lend_count_today) = futures::try_join!(
        deps.loan_repository.find_by_reader(reader.user_id, None),
        deps.loan_repository
            .count_items_lent_by_staff(staff.user_id, loaned_at.date_naive()),
    )
    .map_err(LoanApplicationError::LoanRepositoryError)?;

    // 5. 貸出ルールの判定（最初の違反で打ち切り）
    eligibility::check_borrow_eligibility(
        &deps.policy,
        &BorrowContext {
            actor: &reader,
            candidate: &candidate,
            prior_loans: &prior_loans,
            staff_lend_count_today,
            now: loaned_at,
        },
    )?;

    // 6. 貸出と明細を保存
    let outcome = deps
        .loan_repository
        .insert(&candidate, prior_loans.len())
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    match outcome {
        InsertOutcome::Inserted => Ok(candidate),
        InsertOutcome::StaleHistory => Err(LoanApplicationError::ConcurrentLoanModification),
    }
}

/// 貸出中の書籍をすべて返却する
///
/// ビジネスルール：
/// - 貸出が存在し、明細があること
/// - 返却済みの明細はスキップする（2回呼んでも返却日時は変わらない）
pub async fn return_books(deps: &ServiceDependencies, cmd: ReturnBooks) -> Result<Loan> {
    let result = try_return_books(deps, cmd).await;
    log_failure("return_books", &result);
    result
}

async fn try_return_books(deps: &ServiceDependencies, cmd: ReturnBooks) -> Result<Loan> {
    let loan = load_loan(&deps.loan_repository, cmd.loan_id).await?;

    let (returned_loan, returned_items) = loan::return_all(&loan, cmd.returned_at)?;

    for item in &returned_items {
        deps.loan_repository
            .update_line_item(item)
            .await
            .map_err(LoanApplicationError::LoanRepositoryError)?;
    }

    tracing::info!(
        loan_id = %cmd.loan_id,
        returned = returned_items.len(),
        "Books returned"
    );
    Ok(returned_loan)
}

/// 貸出から指定タイトルを1冊返却する
///
/// ビジネスルール：
/// - 貸出が存在し、明細があること
/// - タイトルが貸出に含まれていること
/// - 該当明細が返却済みならエラー（一括返却と異なりスキップしない）
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<Loan> {
    let result = try_return_book(deps, cmd).await;
    log_failure("return_book", &result);
    result
}

async fn try_return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<Loan> {
    let loan = load_loan(&deps.loan_repository, cmd.loan_id).await?;

    let (returned_loan, item) = loan::return_title(&loan, cmd.book_id, cmd.returned_at)?;

    deps.loan_repository
        .update_line_item(&item)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    tracing::info!(
        loan_id = %cmd.loan_id,
        book_id = %cmd.book_id,
        "Book returned"
    );
    Ok(returned_loan)
}

/// 貸出明細を延長する
///
/// ビジネスルール：
/// - 明細と親の貸出が存在すること
/// - 読者の直近3か月の延長回数の合計がLIM未満であること
/// - 返却予定日は延長した時点になり、親の貸出の延長回数が1増える
pub async fn set_extensions_for_loan(
    deps: &ServiceDependencies,
    cmd: ExtendLoanItem,
) -> Result<Loan> {
    let result = try_set_extensions_for_loan(deps, cmd).await;
    log_failure("set_extensions_for_loan", &result);
    result
}

async fn try_set_extensions_for_loan(
    deps: &ServiceDependencies,
    cmd: ExtendLoanItem,
) -> Result<Loan> {
    // 1. 明細と親の貸出を取得
    let item = deps
        .loan_repository
        .find_line_item(cmd.item_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?
        .ok_or(LoanApplicationError::LoanItemNotFound)?;

    let loan = load_loan(&deps.loan_repository, item.loan_id).await?;
    let reader = resolve_reader(deps, loan.reader_id).await?;

    // 2. 直近3か月の延長回数を合計
    let since = cmd
        .extended_at
        .checked_sub_months(Months::new(EXTENSION_WINDOW_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let recent_loans = deps
        .loan_repository
        .find_by_reader(loan.reader_id, Some(since))
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;
    let recent_extensions = recent_loans
        .iter()
        .fold(0u32, |acc, l| acc.saturating_add(l.extensions_granted.value()));

    // 3. 延長可否の判定
    if !eligibility::check_extension_eligibility(&deps.policy, &reader, recent_extensions) {
        return Err(LoanApplicationError::ExtensionLimitExceeded);
    }

    // 4. 延長して保存
    let (extended_loan, extended_item) = loan::extend_item(&loan, item.item_id, cmd.extended_at)?;

    deps.loan_repository
        .update_loan(&extended_loan)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;
    deps.loan_repository
        .update_line_item(&extended_item)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    tracing::info!(
        loan_id = %extended_loan.loan_id,
        item_id = %cmd.item_id,
        extensions = extended_loan.extensions_granted.value(),
        "Loan item extended"
    );
    Ok(extended_loan)
}

/// IDで貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    load_loan(&deps.loan_repository, loan_id).await
}
