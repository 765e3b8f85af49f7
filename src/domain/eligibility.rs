//! 貸出可否の判定ルール
//!
//! 貸出（および延長）の候補を、ポリシーと利用者の貸出履歴に照らして判定する。
//! ルールは固定の順序で評価し、最初に違反したルールだけを返す。
//! 後のルールは前のルールで絞り込まれた状態を前提にしているため、
//! 順序の入れ替えや並列評価はしない。

use std::collections::HashSet;

use chrono::{DateTime, Duration, Months, Utc};

use super::loan::{Loan, LoanLineItem, User};
use super::policy::{Policy, RoleFactor, Thresholds};

/// 貸出ルール（評価順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorrowRule {
    StaffDailyLendLimit,
    PeriodLimit,
    PerLoanLimit,
    CategoryDiversity,
    DomainSaturation,
    ExtensionBudget,
    ReborrowCooldown,
    ReaderDailyLimit,
}

impl BorrowRule {
    /// 利用者に返すメッセージ（文言は外部契約の一部）
    pub fn message(&self) -> &'static str {
        match self {
            BorrowRule::StaffDailyLendLimit => "staff exceeded lend limit for today",
            BorrowRule::PeriodLimit => "exceeded maximum books borrowed in the specified period",
            BorrowRule::PerLoanLimit => "exceeded maximum books borrowed per time",
            BorrowRule::CategoryDiversity => {
                "at least 2 distinct categories are required for borrowing 3 or more books"
            }
            BorrowRule::DomainSaturation => {
                "exceeded maximum allowed books from the same domain in the specified period"
            }
            BorrowRule::ExtensionBudget => {
                "exceeded maximum allowed extensions in the last three months"
            }
            BorrowRule::ReborrowCooldown => {
                "cannot borrow the same book within the specified interval"
            }
            BorrowRule::ReaderDailyLimit => "reader exceeds limit for today",
        }
    }

    /// APIのエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            BorrowRule::StaffDailyLendLimit => "STAFF_DAILY_LEND_LIMIT",
            BorrowRule::PeriodLimit => "PERIOD_LIMIT",
            BorrowRule::PerLoanLimit => "PER_LOAN_LIMIT",
            BorrowRule::CategoryDiversity => "CATEGORY_DIVERSITY",
            BorrowRule::DomainSaturation => "DOMAIN_SATURATION",
            BorrowRule::ExtensionBudget => "EXTENSION_BUDGET",
            BorrowRule::ReborrowCooldown => "REBORROW_COOLDOWN",
            BorrowRule::ReaderDailyLimit => "READER_DAILY_LIMIT",
        }
    }
}

impl std::fmt::Display for BorrowRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// 判定に必要な入力一式
///
/// 履歴は判定前に取得済みであること。判定自体はI/Oを行わない。
#[derive(Debug, Clone, Copy)]
pub struct BorrowContext<'a> {
    /// 借りる利用者（役割係数の決定に使う）
    pub actor: &'a User,
    pub candidate: &'a Loan,
    pub prior_loans: &'a [Loan],
    /// 処理する職員が今日すでに貸し出した冊数
    pub staff_lend_count_today: u32,
    pub now: DateTime<Utc>,
}

impl BorrowContext<'_> {
    fn prior_items(&self) -> impl Iterator<Item = &LoanLineItem> {
        self.prior_loans.iter().flat_map(|loan| loan.items.iter())
    }

    fn candidate_count(&self) -> u64 {
        self.candidate.items.len() as u64
    }
}

/// 違反していればtrueを返す判定関数
type Violation = fn(&BorrowContext<'_>, &Thresholds) -> bool;

/// 評価順に並べたルール表
const BORROW_RULES: [(BorrowRule, Violation); 8] = [
    (BorrowRule::StaffDailyLendLimit, staff_daily_lend_limit_exceeded),
    (BorrowRule::PeriodLimit, period_limit_exceeded),
    (BorrowRule::PerLoanLimit, per_loan_limit_exceeded),
    (BorrowRule::CategoryDiversity, too_few_categories),
    (BorrowRule::DomainSaturation, domain_saturated),
    (BorrowRule::ExtensionBudget, extension_budget_exceeded),
    (BorrowRule::ReborrowCooldown, within_reborrow_cooldown),
    (BorrowRule::ReaderDailyLimit, reader_daily_limit_exceeded),
];

/// 純粋関数：貸出可否を判定する
///
/// ルール表を先頭から評価し、最初に違反したルールを`Err`で返す。
/// 役割係数は呼び出しごとに`actor`から計算する。
pub fn check_borrow_eligibility(
    policy: &Policy,
    ctx: &BorrowContext<'_>,
) -> Result<(), BorrowRule> {
    let thresholds = policy.thresholds_for(RoleFactor::of(ctx.actor));

    match BORROW_RULES
        .iter()
        .find(|(_, violated)| violated(ctx, &thresholds))
    {
        Some((rule, _)) => Err(*rule),
        None => Ok(()),
    }
}

/// 純粋関数：延長可否を判定する
///
/// 直近3か月の延長回数が（役割係数適用後の）LIM未満なら延長できる。
pub fn check_extension_eligibility(
    policy: &Policy,
    actor: &User,
    extensions_in_last_3_months: u32,
) -> bool {
    let thresholds = policy.thresholds_for(RoleFactor::of(actor));
    extensions_in_last_3_months < thresholds.max_extensions
}

// ============================================================================
// 個別ルール
// ============================================================================

fn staff_daily_lend_limit_exceeded(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    ctx.staff_lend_count_today > t.staff_daily_lend_limit
}

/// 冊数ではなく貸出件数で数える
fn period_limit_exceeded(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    let period = Duration::days(i64::from(t.period_days));
    let recent = ctx
        .prior_loans
        .iter()
        .filter(|loan| ctx.now - loan.loaned_at <= period)
        .count() as u64;

    recent + 1 > u64::from(t.max_books_per_period)
}

fn per_loan_limit_exceeded(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    ctx.candidate_count() > u64::from(t.max_books_per_loan)
}

/// タイトルごとの分野集合をそのまま1つのカテゴリとして数える（平坦化しない）
fn too_few_categories(ctx: &BorrowContext<'_>, _: &Thresholds) -> bool {
    if ctx.candidate.items.len() < 3 {
        return false;
    }

    let groupings: HashSet<_> = ctx
        .candidate
        .items
        .iter()
        .map(|item| &item.domain_ids)
        .collect();

    groupings.len() < 2
}

/// 候補の先頭の明細の分野だけを比較キーにする
fn domain_saturated(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    let Some(first) = ctx.candidate.items.first() else {
        return false;
    };

    let window_start = ctx
        .now
        .checked_sub_months(Months::new(t.domain_window_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let prior = ctx
        .prior_items()
        .filter(|item| item.loaned_at >= window_start)
        .filter(|item| item.shares_domain_with(&first.domain_ids))
        .count() as u64;

    prior + ctx.candidate_count() > u64::from(t.max_books_per_domain)
}

fn extension_budget_exceeded(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    let granted: u64 = ctx
        .prior_loans
        .iter()
        .map(|loan| u64::from(loan.extensions_granted.value()))
        .sum();

    granted + u64::from(ctx.candidate.extensions_granted.value()) > u64::from(t.max_extensions)
}

/// 同じタイトルではなく、全履歴で最も新しい明細と比較する
fn within_reborrow_cooldown(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    ctx.prior_items()
        .max_by_key(|item| item.loaned_at)
        .is_some_and(|latest| {
            (ctx.now - latest.loaned_at).num_days() < i64::from(t.reborrow_cooldown_days)
        })
}

/// 職員には適用しない
fn reader_daily_limit_exceeded(ctx: &BorrowContext<'_>, t: &Thresholds) -> bool {
    if ctx.actor.is_staff() {
        return false;
    }

    let today = ctx.now.date_naive();
    let loaned_today = ctx
        .prior_items()
        .filter(|item| item.loaned_at.date_naive() == today)
        .count() as u64;
    let limit = u64::from(t.reader_daily_limit);

    ctx.candidate_count() > limit || loaned_today + ctx.candidate_count() > limit
}
