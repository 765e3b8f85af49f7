use crate::domain::policy::Policy;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出ポリシーリポジトリポート
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// 有効なポリシー行を取得する
    ///
    /// 有効な行がない場合は`None`。
    async fn get_active_policy(&self) -> Result<Option<Policy>>;
}
