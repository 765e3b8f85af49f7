use serde::{Deserialize, Serialize};

use super::loan::User;

/// 貸出ポリシー（有効なポリシー行1件分）
///
/// 括弧内は運用上の略号。値はすべて職員（係数1）を基準とした基本単位で、
/// 読者向けの値は`thresholds_for`で係数を適用して得る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// 1タイトルが属せる分野の最大数
    pub max_domains_per_book: u32,
    /// 期間内の最大貸出数（NMC）
    pub max_books_per_period: u32,
    /// 期間の日数（PER）
    pub period_days: u32,
    /// 1回の貸出での最大冊数（C）
    pub max_books_per_loan: u32,
    /// 同一分野からの最大冊数（D）
    pub max_books_per_domain: u32,
    /// 同一分野判定の遡及月数（L）
    pub domain_window_months: u32,
    /// 3か月間の最大延長回数（LIM）
    pub max_extensions: u32,
    /// 再貸出までの最小日数（DELTA）
    pub reborrow_cooldown_days: u32,
    /// 読者の1日あたり最大冊数（NCZ）
    pub reader_daily_limit: u32,
    /// 職員が1日に貸し出せる最大冊数（PERSIMP）
    pub staff_daily_lend_limit: u32,
}

/// 役割係数
///
/// 職員は基本単位（1）、読者は2。しきい値ごとに乗算・除算のどちらに使うかは
/// `scaling_of`で決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFactor {
    Staff,
    Reader,
}

impl RoleFactor {
    /// 利用者の役割から係数を決める
    pub fn of(user: &User) -> Self {
        if user.is_staff() {
            RoleFactor::Staff
        } else {
            RoleFactor::Reader
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            RoleFactor::Staff => 1,
            RoleFactor::Reader => 2,
        }
    }
}

/// ポリシーのしきい値の名前
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    MaxDomainsPerBook,
    MaxBooksPerPeriod,
    PeriodDays,
    MaxBooksPerLoan,
    MaxBooksPerDomain,
    DomainWindowMonths,
    MaxExtensions,
    ReborrowCooldownDays,
    ReaderDailyLimit,
    StaffDailyLendLimit,
}

/// 係数の適用方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// 係数を適用しない
    Fixed,
    /// 基本値 × 係数
    MultiplyByFactor,
    /// 基本値 ÷ 係数（切り捨て）
    DivideByFactor,
}

/// しきい値ごとの係数適用表
///
/// 読者は冊数・延長の許容量が半分になり、期間カウントの日数は倍になる。
pub fn scaling_of(threshold: Threshold) -> Scaling {
    match threshold {
        Threshold::MaxDomainsPerBook => Scaling::Fixed,
        Threshold::MaxBooksPerPeriod => Scaling::DivideByFactor,
        Threshold::PeriodDays => Scaling::MultiplyByFactor,
        Threshold::MaxBooksPerLoan => Scaling::DivideByFactor,
        Threshold::MaxBooksPerDomain => Scaling::DivideByFactor,
        Threshold::DomainWindowMonths => Scaling::Fixed,
        Threshold::MaxExtensions => Scaling::DivideByFactor,
        Threshold::ReborrowCooldownDays => Scaling::Fixed,
        Threshold::ReaderDailyLimit => Scaling::Fixed,
        Threshold::StaffDailyLendLimit => Scaling::Fixed,
    }
}

impl Scaling {
    pub fn apply(&self, base: u32, factor: RoleFactor) -> u32 {
        match self {
            Scaling::Fixed => base,
            Scaling::MultiplyByFactor => base.saturating_mul(factor.value()),
            Scaling::DivideByFactor => base / factor.value(),
        }
    }
}

/// 役割係数を適用済みのしきい値一式
///
/// 1回のチェックごとに計算され、呼び出し間で共有されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub max_domains_per_book: u32,
    pub max_books_per_period: u32,
    pub period_days: u32,
    pub max_books_per_loan: u32,
    pub max_books_per_domain: u32,
    pub domain_window_months: u32,
    pub max_extensions: u32,
    pub reborrow_cooldown_days: u32,
    pub reader_daily_limit: u32,
    pub staff_daily_lend_limit: u32,
}

impl Policy {
    /// 係数適用前の基本値
    pub fn base_value(&self, threshold: Threshold) -> u32 {
        match threshold {
            Threshold::MaxDomainsPerBook => self.max_domains_per_book,
            Threshold::MaxBooksPerPeriod => self.max_books_per_period,
            Threshold::PeriodDays => self.period_days,
            Threshold::MaxBooksPerLoan => self.max_books_per_loan,
            Threshold::MaxBooksPerDomain => self.max_books_per_domain,
            Threshold::DomainWindowMonths => self.domain_window_months,
            Threshold::MaxExtensions => self.max_extensions,
            Threshold::ReborrowCooldownDays => self.reborrow_cooldown_days,
            Threshold::ReaderDailyLimit => self.reader_daily_limit,
            Threshold::StaffDailyLendLimit => self.staff_daily_lend_limit,
        }
    }

    /// 係数を適用したしきい値
    pub fn threshold(&self, threshold: Threshold, factor: RoleFactor) -> u32 {
        scaling_of(threshold).apply(self.base_value(threshold), factor)
    }

    /// 役割係数を適用したしきい値一式を計算する
    pub fn thresholds_for(&self, factor: RoleFactor) -> Thresholds {
        Thresholds {
            max_domains_per_book: self.threshold(Threshold::MaxDomainsPerBook, factor),
            max_books_per_period: self.threshold(Threshold::MaxBooksPerPeriod, factor),
            period_days: self.threshold(Threshold::PeriodDays, factor),
            max_books_per_loan: self.threshold(Threshold::MaxBooksPerLoan, factor),
            max_books_per_domain: self.threshold(Threshold::MaxBooksPerDomain, factor),
            domain_window_months: self.threshold(Threshold::DomainWindowMonths, factor),
            max_extensions: self.threshold(Threshold::MaxExtensions, factor),
            reborrow_cooldown_days: self.threshold(Threshold::ReborrowCooldownDays, factor),
            reader_daily_limit: self.threshold(Threshold::ReaderDailyLimit, factor),
            staff_daily_lend_limit: self.threshold(Threshold::StaffDailyLendLimit, factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy {
            max_domains_per_book: 3,
            max_books_per_period: 10,
            period_days: 30,
            max_books_per_loan: 4,
            max_books_per_domain: 5,
            domain_window_months: 2,
            max_extensions: 3,
            reborrow_cooldown_days: 2,
            reader_daily_limit: 7,
            staff_daily_lend_limit: 20,
        }
    }

    #[test]
    fn test_staff_gets_base_values() {
        let t = policy().thresholds_for(RoleFactor::Staff);
        assert_eq!(t.max_books_per_period, 10);
        assert_eq!(t.period_days, 30);
        assert_eq!(t.max_books_per_loan, 4);
        assert_eq!(t.max_books_per_domain, 5);
        assert_eq!(t.max_extensions, 3);
        assert_eq!(t.reborrow_cooldown_days, 2);
    }

    #[test]
    fn test_reader_halves_allowances_and_doubles_period() {
        let t = policy().thresholds_for(RoleFactor::Reader);
        assert_eq!(t.max_books_per_period, 5);
        assert_eq!(t.period_days, 60);
        assert_eq!(t.max_books_per_loan, 2);
        // 5 / 2 は切り捨て
        assert_eq!(t.max_books_per_domain, 2);
        assert_eq!(t.max_extensions, 1);
    }

    #[test]
    fn test_fixed_thresholds_ignore_factor() {
        let p = policy();
        let staff = p.thresholds_for(RoleFactor::Staff);
        let reader = p.thresholds_for(RoleFactor::Reader);
        assert_eq!(staff.max_domains_per_book, reader.max_domains_per_book);
        assert_eq!(staff.domain_window_months, reader.domain_window_months);
        assert_eq!(staff.reborrow_cooldown_days, reader.reborrow_cooldown_days);
        assert_eq!(staff.reader_daily_limit, reader.reader_daily_limit);
        assert_eq!(staff.staff_daily_lend_limit, reader.staff_daily_lend_limit);
    }

    #[test]
    fn test_scaling_of_each_threshold() {
        let expected = [
            (Threshold::MaxDomainsPerBook, Scaling::Fixed),
            (Threshold::MaxBooksPerPeriod, Scaling::DivideByFactor),
            (Threshold::PeriodDays, Scaling::MultiplyByFactor),
            (Threshold::MaxBooksPerLoan, Scaling::DivideByFactor),
            (Threshold::MaxBooksPerDomain, Scaling::DivideByFactor),
            (Threshold::DomainWindowMonths, Scaling::Fixed),
            (Threshold::MaxExtensions, Scaling::DivideByFactor),
            (Threshold::ReborrowCooldownDays, Scaling::Fixed),
            (Threshold::ReaderDailyLimit, Scaling::Fixed),
            (Threshold::StaffDailyLendLimit, Scaling::Fixed),
        ];
        for (threshold, scaling) in expected {
            assert_eq!(scaling_of(threshold), scaling, "{:?}", threshold);
        }
    }

    #[test]
    fn test_scaling_apply() {
        assert_eq!(Scaling::Fixed.apply(7, RoleFactor::Reader), 7);
        assert_eq!(Scaling::MultiplyByFactor.apply(7, RoleFactor::Reader), 14);
        assert_eq!(Scaling::DivideByFactor.apply(7, RoleFactor::Reader), 3);
        assert_eq!(Scaling::DivideByFactor.apply(7, RoleFactor::Staff), 7);
    }
}
