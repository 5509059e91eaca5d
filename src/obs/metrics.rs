// self
use crate::obs::{GateKind, GateOutcome};

/// Records a gate outcome via the global metrics recorder (when enabled).
pub fn record_gate_outcome(kind: GateKind, outcome: GateOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"floodgate_gate_total",
			"gate" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_gate_outcome_noop_without_metrics() {
		record_gate_outcome(GateKind::Token, GateOutcome::Rejected);
	}
}
