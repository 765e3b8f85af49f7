use crate::domain::loan::User;
use crate::domain::value_objects::UserId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 利用者ディレクトリポート
///
/// 貸出コンテキストと利用者管理コンテキストの境界を維持する。
/// 貸出コンテキストは利用者のIDと役割だけを知る。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 利用者を役割込みで取得する
    ///
    /// 読者・職員の解決（存在と役割の確認）に使用される。
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>>;
}
