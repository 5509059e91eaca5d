//! Demonstrates wiring all three admission primitives behind one simulated route: a burst
//! rate limit in front, a bounded grading queue behind it, and a signed regrade pass handed
//! back with every completed job.

// std
use std::time::Duration as StdDuration;
// crates.io
use color_eyre::Result;
// self
use floodgate::{
	queue::{JobQueue, QueueConfig, QueueError},
	rate_limit::{RateLimiter, RatePolicy},
	time::Duration,
	token::{self, GrantRequest, SigningSecret},
};

const ROUTE_POLICY: RatePolicy = RatePolicy::new("grade_route", 3, Duration::minutes(1));

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let limiter = RateLimiter::new();
	let queue = JobQueue::new(QueueConfig::from_env());
	let secret = SigningSecret::new("demo-signing-secret")?;

	println!("Queue limits: {:?}.", queue.config());

	// Five rapid-fire requests from the same client: the policy admits three per minute.
	for attempt in 1..=5 {
		let decision = limiter.check("client-42", &ROUTE_POLICY);

		if let Some(retry_after) = decision.retry_after() {
			println!(
				"Request {attempt}: throttled, Retry-After {} s.",
				retry_after.whole_seconds()
			);

			continue;
		}

		let submission = match queue.submit(async move {
			tokio::time::sleep(StdDuration::from_millis(25)).await;

			format!("essay-{attempt} graded")
		}) {
			Ok(submission) => submission,
			Err(QueueError::Full { limit }) => {
				println!("Request {attempt}: queue backlog full at {limit}.");

				continue;
			},
			Err(e) => return Err(e.into()),
		};

		println!("Request {attempt}: queued at position {}.", submission.position);

		let outcome = submission.handle.join().await?;
		let grant =
			GrantRequest::new("client-42", "regrade", "fp-demo", 1, Duration::minutes(10));
		let pass = token::issue(&secret, &grant)?;
		let verdict = token::verify(&secret, &pass);

		println!(
			"Request {attempt}: {outcome}; regrade pass valid = {}, claims = {:?}.",
			verdict.is_valid(),
			verdict.claims().map(|claims| (&claims.sub, claims.remaining)),
		);
	}

	println!("Snapshot after the burst: {:?}.", queue.snapshot());
	println!(
		"Queue metrics: submitted {}, rejected {}, settled {}.",
		queue.metrics().submitted(),
		queue.metrics().rejected(),
		queue.metrics().settled(),
	);

	Ok(())
}
