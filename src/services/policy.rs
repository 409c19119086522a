/*
 * Responsibility
 * - ルートごとのアクセス要件 (public / authenticated / authority) を明示的な値として持つ
 * - 起動時に一度だけ組み立て、以後は read-only
 * - 判定 (allow / 401 / 403) は純粋関数。HTTP への変換は middleware 側
 */
use std::collections::HashMap;

use crate::services::auth::{Authority, Identity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    Public,
    Authenticated,
    HasAuthority(Authority),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No identity (or authentication failed). Maps to 401.
    Unauthenticated,
    /// Authenticated but missing the required authority. Maps to 403.
    Forbidden,
}

impl AccessRule {
    pub fn has_role(role: &str) -> Self {
        Self::HasAuthority(Authority::from_role(role))
    }

    pub fn decide(&self, identity: Option<&Identity>) -> Decision {
        match (self, identity) {
            (Self::Public, _) => Decision::Allow,
            (_, None) => Decision::Unauthenticated,
            (Self::Authenticated, Some(_)) => Decision::Allow,
            (Self::HasAuthority(required), Some(identity)) => {
                if identity.has_authority(required) {
                    Decision::Allow
                } else {
                    Decision::Forbidden
                }
            }
        }
    }
}

/// Route path → access rule. Paths not listed fall back to `default_rule`.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    rules: HashMap<String, AccessRule>,
    default_rule: AccessRule,
}

impl SecurityPolicy {
    pub fn new(default_rule: AccessRule) -> Self {
        Self {
            rules: HashMap::new(),
            default_rule,
        }
    }

    pub fn with_rule(mut self, path: impl Into<String>, rule: AccessRule) -> Self {
        self.rules.insert(path.into(), rule);
        self
    }

    /// Routes served by this application. Anything else requires a login.
    pub fn standard() -> Self {
        Self::new(AccessRule::Authenticated)
            .with_rule("/health", AccessRule::Public)
            .with_rule("/public", AccessRule::Public)
            .with_rule("/logout", AccessRule::Public)
            .with_rule("/private", AccessRule::Authenticated)
            .with_rule("/private/admin", AccessRule::has_role("admin"))
    }

    pub fn rule_for(&self, path: &str) -> &AccessRule {
        self.rules.get(path).unwrap_or(&self.default_rule)
    }

    pub fn decide(&self, path: &str, identity: Option<&Identity>) -> Decision {
        self.rule_for(path).decide(identity)
    }
}
