// self
use crate::{
	_prelude::*,
	obs::{OpKind, OpOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"ms_store_services_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a throttled Submissions call that will be re-issued after `wait`.
///
/// The `call` label keeps only the method name of a description such as
/// `add_on(9NBLGGH4R315)` so product ids do not inflate label cardinality.
pub fn record_throttle_retry(description: &str, wait: Duration) {
	record_op_outcome(OpKind::Submissions, OpOutcome::Retry);

	#[cfg(feature = "metrics")]
	{
		let call = call_label(description).to_owned();

		metrics::counter!("ms_store_services_throttle_retry_total", "call" => call.clone())
			.increment(1);
		metrics::histogram!("ms_store_services_throttle_wait_seconds", "call" => call)
			.record(wait.as_seconds_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (description, wait);
	}
}

/// Method name of a `name(args)` call description.
pub fn call_label(description: &str) -> &str {
	description.split_once('(').map_or(description, |(name, _)| name).trim()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_is_safe_without_recorder() {
		record_op_outcome(OpKind::CollectionsConsume, OpOutcome::Failure);
		record_op_outcome(OpKind::Submissions, OpOutcome::Retry);
		record_throttle_retry("add_on(9NBLGGH4R315)", Duration::seconds(3));
	}

	#[test]
	fn call_label_strips_arguments() {
		assert_eq!(
			call_label("add_on_submission(9NBLGGH4R315, 1152921505687848012)"),
			"add_on_submission"
		);
		assert_eq!(call_label("application_add_ons_by_link"), "application_add_ons_by_link");
	}
}
