use ulid::Ulid;

/// Source of the trace identifiers attached to every data-plane call for
/// end-to-end correlation. One identifier is drawn per call and discarded
/// afterwards.
pub trait TraceIds: Send + Sync {
    fn next_trace_id(&self) -> String;
}

/// Draws a fresh ULID per call.
#[derive(Debug, Clone, Default)]
pub struct UlidTraceIds;

impl TraceIds for UlidTraceIds {
    fn next_trace_id(&self) -> String {
        Ulid::new().to_string()
    }
}
