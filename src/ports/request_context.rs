//! RequestContext port - ambient correlation id for outbound tracing.

/// Port for the ambient request context.
///
/// Supplies a correlation id attached to every outbound provider call.
/// This affects traceability only, never retry or idempotency semantics.
pub trait RequestContext: Send + Sync {
    fn correlation_id(&self) -> Option<String>;
}

/// Default context with no ambient correlation id; the transport
/// generates a fresh one per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRequestContext;

impl RequestContext for NoOpRequestContext {
    fn correlation_id(&self) -> Option<String> {
        None
    }
}
