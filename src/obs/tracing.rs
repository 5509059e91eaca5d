// self
use crate::{_prelude::*, obs::GateKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedGate<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedGate<F> = F;

/// A span builder used by admission gates.
#[derive(Clone, Debug)]
pub struct GateSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GateSpan {
	/// Creates a new span tagged with the provided gate kind + stage.
	pub fn new(kind: GateKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("floodgate.gate", gate = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> GateSpanGuard {
		#[cfg(feature = "tracing")]
		{
			GateSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			GateSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	///
	/// Useful for wrapping jobs before handing them to the queue so their execution
	/// stays attached to the submitting span.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedGate<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`GateSpan::entered`].
pub struct GateSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for GateSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GateSpanGuard(..)")
	}
}

/// Emits a debug event describing a rejected admission (when tracing is enabled).
pub fn note_rejection(kind: GateKind, reason: &str, detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(gate = kind.as_str(), reason, %detail, "admission rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, reason, detail);
	}
}
