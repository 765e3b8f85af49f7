use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookId, CopyId, DomainId, EditionId, ExtendLoanError, ExtensionCount, LoanId, LoanItemId,
    LoanShapeError, ReturnBookError, UserId,
};

/// 返却予定日の既定値（貸出日からの日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

// ============================================================================
// 利用者とカタログ参照
// ============================================================================

/// 利用者の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Reader,
    Staff,
}

/// 利用者（読者・職員）
///
/// 職員が読者の役割も持ち、自分で借りることもある。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl User {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_staff(&self) -> bool {
        self.roles.contains(&Role::Staff)
    }

    pub fn is_reader(&self) -> bool {
        self.roles.contains(&Role::Reader)
    }
}

/// カタログが解決した蔵書の情報
///
/// 蔵書 → 版 → タイトル → 分野 の参照をまとめたもの。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyDetails {
    pub copy_id: CopyId,
    pub edition_id: EditionId,
    pub book_id: BookId,
    pub domain_ids: BTreeSet<DomainId>,
}

// ============================================================================
// Loan集約
// ============================================================================

/// 貸出明細 - 貸出内の1冊分の記録
///
/// 状態は`returned_at`の有無で表す（None: 貸出中、Some: 返却済み）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLineItem {
    pub item_id: LoanItemId,
    pub loan_id: LoanId,

    // カタログへの参照（貸出時点の値を非正規化して保持）
    pub copy_id: CopyId,
    pub edition_id: EditionId,
    pub book_id: BookId,
    pub domain_ids: BTreeSet<DomainId>,

    pub loaned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    /// 延長された日時（延長マーカー）
    pub extended_at: Option<DateTime<Utc>>,
}

impl LoanLineItem {
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// 他の明細と分野が1つでも重なるか
    pub fn shares_domain_with(&self, domain_ids: &BTreeSet<DomainId>) -> bool {
        !self.domain_ids.is_disjoint(domain_ids)
    }
}

/// Loan集約 - 1回の貸出取引
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub reader_id: UserId,
    /// 貸出処理を行った職員
    pub staff_id: UserId,
    pub loaned_at: DateTime<Utc>,
    pub extensions_granted: ExtensionCount,
    /// 申告された冊数（作成時に明細数と一致している必要がある）
    pub declared_count: u32,
    pub items: Vec<LoanLineItem>,
}

impl Loan {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_fully_returned(&self) -> bool {
        self.items.iter().all(LoanLineItem::is_returned)
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：貸出の構造を検証する
///
/// ビジネスルール：
/// - 明細が1件以上あること
/// - 申告冊数と明細数が一致すること（補正はしない）
pub fn validate_shape(declared_count: u32, item_count: usize) -> Result<(), LoanShapeError> {
    if item_count == 0 {
        return Err(LoanShapeError::NoItems);
    }
    if declared_count as usize != item_count {
        return Err(LoanShapeError::CountMismatch {
            declared: declared_count,
            actual: item_count,
        });
    }
    Ok(())
}

/// 純粋関数：貸出明細を作る
///
/// 返却予定日の指定がなければ貸出日 + 14日。
/// 返却予定日は貸出日より後でなければならない。
pub fn new_line_item(
    loan_id: LoanId,
    copy: &CopyDetails,
    loaned_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
) -> Result<LoanLineItem, LoanShapeError> {
    let due_date = due_date.unwrap_or(loaned_at + Duration::days(LOAN_PERIOD_DAYS));
    if due_date <= loaned_at {
        return Err(LoanShapeError::DueDateNotAfterLoanDate);
    }

    Ok(LoanLineItem {
        item_id: LoanItemId::new(),
        loan_id,
        copy_id: copy.copy_id,
        edition_id: copy.edition_id,
        book_id: copy.book_id,
        domain_ids: copy.domain_ids.clone(),
        loaned_at,
        due_date,
        returned_at: None,
        extended_at: None,
    })
}

/// 純粋関数：貸出を開始する
///
/// 明細は`new_line_item`で同じ`loan_id`を使って作られていること。
pub fn open_loan(
    loan_id: LoanId,
    reader_id: UserId,
    staff_id: UserId,
    loaned_at: DateTime<Utc>,
    declared_count: u32,
    extensions_granted: ExtensionCount,
    items: Vec<LoanLineItem>,
) -> Result<Loan, LoanShapeError> {
    validate_shape(declared_count, items.len())?;

    Ok(Loan {
        loan_id,
        reader_id,
        staff_id,
        loaned_at,
        extensions_granted,
        declared_count,
        items,
    })
}

/// 純粋関数：貸出中の明細をすべて返却する
///
/// ビジネスルール：
/// - 明細がない貸出は返却できない
/// - 返却済みの明細は黙ってスキップする（冪等）
///
/// 新しいLoanと、今回返却した明細だけを返す。
pub fn return_all(
    loan: &Loan,
    returned_at: DateTime<Utc>,
) -> Result<(Loan, Vec<LoanLineItem>), ReturnBookError> {
    if loan.items.is_empty() {
        return Err(ReturnBookError::NoItems);
    }

    let mut new_loan = loan.clone();
    let mut returned = Vec::new();
    for item in new_loan.items.iter_mut().filter(|i| !i.is_returned()) {
        if returned_at <= item.loaned_at {
            return Err(ReturnBookError::ReturnedBeforeLoan);
        }
        item.returned_at = Some(returned_at);
        returned.push(item.clone());
    }

    Ok((new_loan, returned))
}

/// 純粋関数：指定タイトルの明細を1冊返却する
///
/// ビジネスルール：
/// - タイトルが貸出に含まれていること
/// - 該当明細が返却済みの場合はエラー（一括返却とは異なる）
///
/// 同じタイトルが複数冊ある場合は、貸出中の最初の明細を対象にする。
pub fn return_title(
    loan: &Loan,
    book_id: BookId,
    returned_at: DateTime<Utc>,
) -> Result<(Loan, LoanLineItem), ReturnBookError> {
    if loan.items.is_empty() {
        return Err(ReturnBookError::NoItems);
    }

    let mut new_loan = loan.clone();
    let mut matching = new_loan
        .items
        .iter_mut()
        .filter(|i| i.book_id == book_id)
        .peekable();

    if matching.peek().is_none() {
        return Err(ReturnBookError::BookNotInLoan);
    }

    let item = matching
        .find(|i| !i.is_returned())
        .ok_or(ReturnBookError::AlreadyReturned)?;

    if returned_at <= item.loaned_at {
        return Err(ReturnBookError::ReturnedBeforeLoan);
    }
    item.returned_at = Some(returned_at);
    let returned = item.clone();

    Ok((new_loan, returned))
}

/// 純粋関数：貸出明細を延長する
///
/// ビジネスルール：
/// - 返却予定日は延長した時点に置き換える（固定日数の加算ではない）
/// - 親の貸出の延長回数を1増やす
///
/// 延長可否（LIM）は事前に`check_extension_eligibility`で判定済みであること。
pub fn extend_item(
    loan: &Loan,
    item_id: LoanItemId,
    extended_at: DateTime<Utc>,
) -> Result<(Loan, LoanLineItem), ExtendLoanError> {
    let mut new_loan = Loan {
        extensions_granted: loan.extensions_granted.increment(),
        ..loan.clone()
    };

    let item = new_loan
        .items
        .iter_mut()
        .find(|i| i.item_id == item_id)
        .ok_or(ExtendLoanError::ItemNotInLoan)?;

    item.due_date = extended_at;
    item.extended_at = Some(extended_at);
    let extended = item.clone();

    Ok((new_loan, extended))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy(domains: &[DomainId]) -> CopyDetails {
        CopyDetails {
            copy_id: CopyId::new(),
            edition_id: EditionId::new(),
            book_id: BookId::new(),
            domain_ids: domains.iter().copied().collect(),
        }
    }

    fn loan_with(copies: &[CopyDetails], loaned_at: DateTime<Utc>) -> Loan {
        let loan_id = LoanId::new();
        let items = copies
            .iter()
            .map(|c| new_line_item(loan_id, c, loaned_at, None).unwrap())
            .collect::<Vec<_>>();
        open_loan(
            loan_id,
            UserId::new(),
            UserId::new(),
            loaned_at,
            items.len() as u32,
            ExtensionCount::new(),
            items,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_shape_rejects_empty_loan() {
        assert_eq!(validate_shape(0, 0), Err(LoanShapeError::NoItems));
    }

    #[test]
    fn test_validate_shape_rejects_count_mismatch() {
        assert_eq!(
            validate_shape(3, 2),
            Err(LoanShapeError::CountMismatch {
                declared: 3,
                actual: 2
            })
        );
        assert!(validate_shape(2, 2).is_ok());
    }

    #[test]
    fn test_new_line_item_defaults_due_date() {
        let now = Utc::now();
        let c = copy(&[DomainId::new()]);
        let item = new_line_item(LoanId::new(), &c, now, None).unwrap();

        assert_eq!(item.due_date, now + Duration::days(LOAN_PERIOD_DAYS));
        assert_eq!(item.book_id, c.book_id);
        assert_eq!(item.edition_id, c.edition_id);
        assert_eq!(item.domain_ids, c.domain_ids);
        assert!(!item.is_returned());
    }

    #[test]
    fn test_new_line_item_rejects_due_date_not_after_loan_date() {
        let now = Utc::now();
        let result = new_line_item(LoanId::new(), &copy(&[]), now, Some(now));
        assert_eq!(result, Err(LoanShapeError::DueDateNotAfterLoanDate));
    }

    #[test]
    fn test_open_loan_items_share_loan_id() {
        let now = Utc::now();
        let loan = loan_with(&[copy(&[]), copy(&[])], now);

        assert_eq!(loan.item_count(), 2);
        assert!(loan.items.iter().all(|i| i.loan_id == loan.loan_id));
    }

    #[test]
    fn test_return_all_skips_returned_items() {
        let loaned_at = Utc::now() - Duration::days(3);
        let loan = loan_with(&[copy(&[]), copy(&[])], loaned_at);
        let first_return = loaned_at + Duration::days(1);

        let (loan, returned) = return_all(&loan, first_return).unwrap();
        assert_eq!(returned.len(), 2);
        assert!(loan.is_fully_returned());

        let (again, returned) = return_all(&loan, first_return + Duration::days(1)).unwrap();
        assert!(returned.is_empty());
        assert!(
            again
                .items
                .iter()
                .all(|i| i.returned_at == Some(first_return))
        );
    }

    #[test]
    fn test_return_all_rejects_empty_loan() {
        let mut loan = loan_with(&[copy(&[])], Utc::now());
        loan.items.clear();
        assert_eq!(
            return_all(&loan, Utc::now()).unwrap_err(),
            ReturnBookError::NoItems
        );
    }

    #[test]
    fn test_return_all_rejects_return_before_loan() {
        let loaned_at = Utc::now();
        let loan = loan_with(&[copy(&[])], loaned_at);
        assert_eq!(
            return_all(&loan, loaned_at - Duration::hours(1)).unwrap_err(),
            ReturnBookError::ReturnedBeforeLoan
        );
    }

    #[test]
    fn test_return_title_returns_only_matching_item() {
        let loaned_at = Utc::now() - Duration::days(2);
        let target = copy(&[]);
        let loan = loan_with(&[target.clone(), copy(&[])], loaned_at);
        let at = loaned_at + Duration::days(1);

        let (loan, item) = return_title(&loan, target.book_id, at).unwrap();
        assert_eq!(item.book_id, target.book_id);
        assert_eq!(item.returned_at, Some(at));
        assert_eq!(loan.items.iter().filter(|i| i.is_returned()).count(), 1);
    }

    #[test]
    fn test_return_title_twice_is_an_error() {
        let loaned_at = Utc::now() - Duration::days(2);
        let target = copy(&[]);
        let loan = loan_with(&[target.clone()], loaned_at);
        let at = loaned_at + Duration::days(1);

        let (loan, _) = return_title(&loan, target.book_id, at).unwrap();
        assert_eq!(
            return_title(&loan, target.book_id, at).unwrap_err(),
            ReturnBookError::AlreadyReturned
        );
    }

    #[test]
    fn test_return_title_rejects_unknown_book() {
        let loan = loan_with(&[copy(&[])], Utc::now() - Duration::days(1));
        assert_eq!(
            return_title(&loan, BookId::new(), Utc::now()).unwrap_err(),
            ReturnBookError::BookNotInLoan
        );
    }

    #[test]
    fn test_extend_item_moves_due_date_to_extension_time() {
        let loaned_at = Utc::now() - Duration::days(5);
        let loan = loan_with(&[copy(&[])], loaned_at);
        let item_id = loan.items[0].item_id;
        let at = loaned_at + Duration::days(4);

        let (loan, item) = extend_item(&loan, item_id, at).unwrap();
        assert_eq!(loan.extensions_granted.value(), 1);
        assert_eq!(item.due_date, at);
        assert_eq!(item.extended_at, Some(at));
        assert_eq!(loan.items[0], item);
    }

    #[test]
    fn test_extend_item_rejects_foreign_item() {
        let loan = loan_with(&[copy(&[])], Utc::now());
        assert_eq!(
            extend_item(&loan, LoanItemId::new(), Utc::now()).unwrap_err(),
            ExtendLoanError::ItemNotInLoan
        );
    }

    #[test]
    fn test_user_roles() {
        let staff = User::new(UserId::new(), vec![Role::Staff, Role::Reader]);
        assert!(staff.is_staff());
        assert!(staff.is_reader());

        let reader = User::new(UserId::new(), vec![Role::Reader]);
        assert!(!reader.is_staff());
    }
}
