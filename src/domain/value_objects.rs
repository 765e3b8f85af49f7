use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UUIDをラップしたID型を定義する
///
/// すべてのIDは同じ形（new / from_uuid / value / Default）を持つため、
/// 手書きの重複を避けてマクロで生成する。
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// 貸出ID - 1回の貸出取引（複数冊）を識別する
    LoanId
);

uuid_id!(
    /// 貸出明細ID - 貸出内の1冊分の記録を識別する
    LoanItemId
);

uuid_id!(
    /// 利用者ID - 読者・職員の両方を表す（役割はUserのrolesで区別）
    UserId
);

uuid_id!(
    /// 蔵書ID - 物理的な1冊（コピー）への参照
    CopyId
);

uuid_id!(
    /// 版ID - カタログ管理コンテキストへの参照
    EditionId
);

uuid_id!(
    /// 書籍（タイトル）ID - カタログ管理コンテキストへの参照
    BookId
);

uuid_id!(
    /// 分野ID - 書籍が属する主題カテゴリ
    DomainId
);

/// 延長回数エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// 負の値など、延長回数として不正な値
    InvalidValue(i64),
}

/// 延長回数
///
/// 上限はポリシー（LIM）で決まるため、型としては非負であることだけを保証する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ExtensionCount(u32);

impl ExtensionCount {
    /// 新規作成（0回）
    pub fn new() -> Self {
        Self(0)
    }

    /// 延長回数を1増やす
    pub fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// 現在の回数
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ExtensionCount {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl TryFrom<i32> for ExtensionCount {
    type Error = ExtensionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ExtensionError::InvalidValue(value.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_count_new() {
        let count = ExtensionCount::new();
        assert_eq!(count.value(), 0);
    }

    #[test]
    fn test_extension_count_increment() {
        let count = ExtensionCount::new().increment().increment();
        assert_eq!(count.value(), 2);
    }

    #[test]
    fn test_extension_count_try_from_rejects_negative() {
        assert_eq!(ExtensionCount::try_from(3).unwrap().value(), 3);
        assert_eq!(
            ExtensionCount::try_from(-1).unwrap_err(),
            ExtensionError::InvalidValue(-1)
        );
    }

    #[test]
    fn test_loan_id_creation() {
        let id1 = LoanId::new();
        let id2 = LoanId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_user_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        assert_eq!(id.value(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
