//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{ChatId, ErrorCode, ProcessError};

/// ユースケース実行時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseCaseError {
    /// 送信者が対象チャットのルームに参加していない
    #[error("not a member of chat {0}")]
    NotMember(ChatId),

    /// ChatAccess がルームへの参加を拒否した
    #[error("access to chat {0} denied")]
    AccessDenied(ChatId),

    /// MessageProcessor が処理を拒否または失敗した
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl UseCaseError {
    /// クライアントへ返す `error` エンベロープのコード
    pub fn code(&self) -> ErrorCode {
        match self {
            UseCaseError::NotMember(_) | UseCaseError::AccessDenied(_) => ErrorCode::Forbidden,
            UseCaseError::Process(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        // テスト項目: 各エラーがクライアント向けのエラーコードに対応付けられる
        // given (前提条件):
        let chat_id = ChatId::new(7);

        // when (操作):
        let not_member = UseCaseError::NotMember(chat_id);
        let denied = UseCaseError::AccessDenied(chat_id);
        let invalid = UseCaseError::from(ProcessError::Validation("empty".to_string()));

        // then (期待する結果):
        assert_eq!(not_member.code(), ErrorCode::Forbidden);
        assert_eq!(denied.code(), ErrorCode::Forbidden);
        assert_eq!(invalid.code(), ErrorCode::ValidationFailed);
        assert_eq!(invalid.to_string(), "validation failed: empty");
    }
}
