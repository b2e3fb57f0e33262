//! ScopeNameResolver port - optional labelling of new customer records.

use async_trait::async_trait;

/// Port for resolving a human-readable name for a scope.
///
/// Used only to label newly created provider customers; failures and
/// absences are non-fatal.
#[async_trait]
pub trait ScopeNameResolver: Send + Sync {
    async fn get_name(&self, scope_id: &str) -> Option<String>;
}

/// Default resolver that labels nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNameResolver;

#[async_trait]
impl ScopeNameResolver for NoOpNameResolver {
    async fn get_name(&self, _scope_id: &str) -> Option<String> {
        None
    }
}
