//! Behavioral coverage for the documented default queue limits under load.

// std
use std::time::Duration;
// self
use floodgate::queue::{JobQueue, QueueConfig, QueueError};

async fn slow_job(tag: u32) -> u32 {
	tokio::time::sleep(Duration::from_millis(30)).await;

	tag
}

#[tokio::test]
async fn defaults_admit_five_and_refuse_the_sixth() {
	let queue = JobQueue::new(QueueConfig::default());
	let mut handles = Vec::new();

	for tag in 0..5 {
		let submission = queue.submit(slow_job(tag)).expect("Defaults admit five slow jobs.");

		handles.push(submission.handle);
	}

	let snapshot = queue.snapshot();

	assert_eq!(snapshot.active, 2);
	assert_eq!(snapshot.queued, 3);
	assert_eq!(snapshot.max_concurrency, 2);
	assert_eq!(snapshot.max_queue_length, 3);
	assert!(matches!(queue.submit(slow_job(5)), Err(QueueError::Full { limit: 3 })));

	for (tag, handle) in handles.into_iter().enumerate() {
		let output = handle.join().await.expect("Admitted job must settle.");

		assert_eq!(output as usize, tag);
	}

	let drained = queue.snapshot();

	assert_eq!(drained.active, 0);
	assert_eq!(drained.queued, 0);
	assert_eq!(queue.metrics().submitted(), 6);
	assert_eq!(queue.metrics().rejected(), 1);
	assert_eq!(queue.metrics().settled(), 5);
}

#[tokio::test]
async fn freed_backlog_accepts_new_work() {
	let queue = JobQueue::new(QueueConfig::default());
	let mut handles = Vec::new();

	for tag in 0..5 {
		handles.push(queue.submit(slow_job(tag)).expect("Defaults admit five slow jobs.").handle);
	}

	assert!(queue.submit(slow_job(5)).is_err());

	for handle in handles {
		handle.join().await.expect("Admitted job must settle.");
	}

	// The backlog drained, so admission works again.
	let late = queue.submit(slow_job(6)).expect("Drained queue must admit new work.");

	assert_eq!(late.position, 1);
	assert_eq!(late.handle.join().await.expect("Late job must settle."), 6);
}
