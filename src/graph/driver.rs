//! Paced, cancellable consumption of a step iterator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::info;

use super::{Algorithm, Graph, Traversal, TraversalEvent};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub delivered: usize,
    pub cancelled: bool,
}

/// Pulls one item at a time with a fixed delay in between. `running` is
/// checked before each pull and again after each delay; an item produced
/// before a stop but still waiting out its delay is dropped.
pub struct StepDriver {
    delay: Duration,
    running: Arc<AtomicBool>,
}

impl StepDriver {
    pub fn new(delay: Duration, running: Arc<AtomicBool>) -> Self {
        Self { delay, running }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Feed items to `sink` until the iterator ends, the flag drops, or the
    /// sink returns false.
    pub fn run<I, F>(&self, iter: I, mut sink: F) -> DriveSummary
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> bool,
    {
        let mut summary = DriveSummary::default();
        let mut iter = iter.into_iter();
        loop {
            if !self.is_running() {
                summary.cancelled = true;
                break;
            }
            let Some(item) = iter.next() else {
                break;
            };
            if summary.delivered > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            if !self.is_running() {
                summary.cancelled = true;
                break;
            }
            if !sink(item) {
                break;
            }
            summary.delivered += 1;
        }
        summary
    }
}

/// Run a traversal on its own thread, forwarding each event. The thread
/// owns `graph`; dropping the receiver ends it at the next step.
pub fn spawn_traversal(
    graph: Graph,
    algorithm: Algorithm,
    start: usize,
    goal: usize,
    delay: Duration,
    running: Arc<AtomicBool>,
) -> (thread::JoinHandle<DriveSummary>, mpsc::Receiver<TraversalEvent>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let driver = StepDriver::new(delay, running);
        let traversal = Traversal::new(&graph, algorithm, start, goal);
        let summary = driver.run(traversal, |event| tx.send(event).is_ok());
        info!(
            algorithm = algorithm.name(),
            delivered = summary.delivered,
            cancelled = summary.cancelled,
            "traversal worker finished"
        );
        summary
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn test_runs_to_completion() {
        let driver = StepDriver::new(Duration::ZERO, flag());
        let mut got = Vec::new();
        let summary = driver.run(0..5, |x| {
            got.push(x);
            true
        });
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert_eq!(summary, DriveSummary { delivered: 5, cancelled: false });
    }

    #[test]
    fn test_cancel_from_sink_stops_next_step() {
        let driver = StepDriver::new(Duration::ZERO, flag());
        let running = driver.running_flag();
        let mut got = Vec::new();
        let summary = driver.run(0..10, |x| {
            got.push(x);
            if x == 2 {
                running.store(false, Ordering::SeqCst);
            }
            true
        });
        assert_eq!(got, vec![0, 1, 2]);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_item_in_flight_is_discarded() {
        let driver = StepDriver::new(Duration::from_millis(1), flag());
        let running = driver.running_flag();
        // The stop lands while item 2 is being produced, before its delay.
        let source = (0..10).inspect(|&x| {
            if x == 2 {
                running.store(false, Ordering::SeqCst);
            }
        });
        let mut got = Vec::new();
        let summary = driver.run(source, |x| {
            got.push(x);
            true
        });
        assert_eq!(got, vec![0, 1]);
        assert_eq!(summary.delivered, 2);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_precancelled_delivers_nothing() {
        let driver = StepDriver::new(Duration::ZERO, flag());
        driver.cancel();
        let summary = driver.run(0..3, |_| true);
        assert_eq!(summary, DriveSummary { delivered: 0, cancelled: true });
    }

    #[test]
    fn test_sink_refusal_ends_run() {
        let driver = StepDriver::new(Duration::ZERO, flag());
        let summary = driver.run(0..10, |x| x < 3);
        assert_eq!(summary, DriveSummary { delivered: 3, cancelled: false });
    }

    #[test]
    fn test_spawn_traversal_streams_events() {
        let graph = Graph::grid(3, 3, &[]);
        let (handle, rx) = spawn_traversal(graph, Algorithm::Bfs, 0, 8, Duration::ZERO, flag());
        let events: Vec<TraversalEvent> = rx.iter().collect();
        let summary = handle.join().expect("worker panicked");
        assert_eq!(summary.delivered, events.len());
        match events.last() {
            Some(TraversalEvent::PathFound { path, cost }) => {
                assert_eq!(path.len(), 5);
                assert_eq!(*cost, 4.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spawn_traversal_cancelled() {
        let running = flag();
        running.store(false, Ordering::SeqCst);
        let graph = Graph::grid(3, 3, &[]);
        let (handle, rx) = spawn_traversal(graph, Algorithm::Dfs, 0, 8, Duration::ZERO, running);
        assert_eq!(rx.iter().count(), 0);
        assert!(handle.join().expect("worker panicked").cancelled);
    }
}
