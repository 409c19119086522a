/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が token を検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - token の decode / role mapping は services::auth の責務
 * - Identity は session cache と共有するので Arc で持つ
 */
use std::sync::Arc;

use crate::services::auth::{Identity, SessionKey};

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `identity` は subject と authority set (ROLE_*) を持つ。途中状態は存在しない
/// - `session_key` は logout 時に session を破棄するためのキー (token の digest)
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub identity: Arc<Identity>,
    pub session_key: SessionKey,
}

impl AuthCtx {
    pub fn new(identity: Arc<Identity>, session_key: SessionKey) -> Self {
        Self {
            identity,
            session_key,
        }
    }
}
