/*
 * Responsibility
 * - /public, /private, /private/admin
 * - アクセス判定は gate middleware が済ませている。handler は定数を返すだけ
 */
use crate::api::extractors::AuthCtxExtractor;

pub async fn public() -> &'static str {
    "public"
}

pub async fn private(AuthCtxExtractor(ctx): AuthCtxExtractor) -> &'static str {
    tracing::debug!(subject = ctx.identity.subject(), "private");
    "private"
}

pub async fn private_admin(AuthCtxExtractor(ctx): AuthCtxExtractor) -> &'static str {
    tracing::debug!(subject = ctx.identity.subject(), "private admin");
    "private"
}
