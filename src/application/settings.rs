use thiserror::Error;

use crate::domain::policy::Policy;
use crate::ports::PolicyRepository;

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum SettingsError {
    /// 有効なポリシー行がない（起動を中止する）
    #[error("No active lending policy is configured")]
    NoActivePolicy,

    /// PolicyRepositoryのエラー
    #[error("Policy repository error")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 有効な貸出ポリシーを読み込む
///
/// 起動時に一度だけ呼ばれ、結果は`ServiceDependencies`に格納される。
/// 実行中の変更は再起動まで反映されない。
pub async fn load_policy(repository: &dyn PolicyRepository) -> Result<Policy, SettingsError> {
    let policy = repository
        .get_active_policy()
        .await
        .map_err(SettingsError::Repository)?
        .ok_or(SettingsError::NoActivePolicy)?;

    tracing::info!(?policy, "Lending policy loaded");
    Ok(policy)
}
