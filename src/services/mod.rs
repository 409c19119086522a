/*
 * Responsibility
 * - ドメインロジック (token → identity, access policy, provider registration)
 * - HTTP / axum には依存しない
 */
pub mod auth;
pub mod policy;
pub mod provider;
