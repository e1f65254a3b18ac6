//! Optional observability helpers for token acquisition and Store Services calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ms_store_services.op` with the `op`
//!   (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `ms_store_services_op_total` counter for every
//!   attempt/success/failure/retry, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

pub(crate) use tracing::{debug_event, warn_event};

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-credentials exchange against the token endpoint.
	TokenFetch,
	/// Cache lookup and refresh decision inside the token manager.
	TokenRefresh,
	/// Collections entitlement query.
	CollectionsQuery,
	/// Collections consume (fulfillment).
	CollectionsConsume,
	/// Partner Center submissions call.
	Submissions,
	/// User Store ID refresh.
	UserStoreIdRefresh,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::TokenFetch => "token_fetch",
			OpKind::TokenRefresh => "token_refresh",
			OpKind::CollectionsQuery => "collections_query",
			OpKind::CollectionsConsume => "collections_consume",
			OpKind::Submissions => "submissions",
			OpKind::UserStoreIdRefresh => "user_store_id_refresh",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Throttled request re-issued after a delay.
	Retry,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::Retry => "retry",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the outcome of `result` for `kind` and hands it back unchanged.
pub(crate) fn record_result<T>(kind: OpKind, result: Result<T>) -> Result<T> {
	record_op_outcome(kind, if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure });

	result
}
