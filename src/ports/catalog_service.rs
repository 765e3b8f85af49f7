use crate::domain::loan::CopyDetails;
use crate::domain::value_objects::CopyId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// カタログサービスポート
///
/// 貸出コンテキストとカタログコンテキストの境界を維持する。
/// 貸出コンテキストは蔵書から版・タイトル・分野への参照だけを知る。
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// 蔵書を版・タイトル・分野まで解決する
    ///
    /// 蔵書が存在しない場合は`None`。
    async fn resolve_copy(&self, copy_id: CopyId) -> Result<Option<CopyDetails>>;
}
