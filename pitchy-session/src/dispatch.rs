//! Pitch worker pool
//!
//! The audio callback hands each frame block to [`PitchDispatcher::submit`],
//! which copies it into a bounded job queue without blocking. A full queue
//! skips the block (pitch only; capture is unaffected). Workers estimate the
//! pitch and publish [`PitchEvent`]s into a bounded event channel that evicts
//! its oldest entry when the consumer falls behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use pitchy_audio::{FrameBlock, PitchDetector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::events::PitchEvent;

/// Dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Blocks skipped because the job queue was full
    pub dropped_jobs: u64,
    /// Events discarded to make room for newer ones
    pub evicted_events: u64,
    /// Events published
    pub emitted_events: u64,
}

#[derive(Default)]
struct Counters {
    dropped_jobs: AtomicU64,
    evicted_events: AtomicU64,
    emitted_events: AtomicU64,
}

struct PitchJob {
    samples: Vec<f32>,
    sample_rate: u32,
    sequence: u64,
    generation: u64,
}

/// Drop-oldest sender
///
/// Keeps a receiver of its own so it can evict the oldest event when full.
#[derive(Clone)]
struct EventSender {
    tx: Sender<PitchEvent>,
    rx: Receiver<PitchEvent>,
}

impl EventSender {
    /// Returns `false` once every consumer is gone
    fn send(&self, mut event: PitchEvent, counters: &Counters) -> bool {
        loop {
            match self.tx.try_send(event) {
                Ok(()) => {
                    counters.emitted_events.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                Err(TrySendError::Full(rejected)) => {
                    if self.rx.try_recv().is_ok() {
                        let evicted = counters.evicted_events.fetch_add(1, Ordering::Relaxed) + 1;
                        if evicted == 1 || evicted % 100 == 0 {
                            warn!("Pitch consumer is lagging, {} event(s) evicted", evicted);
                        }
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

struct Shared {
    detector: PitchDetector,
    min_volume: f32,
    generation: AtomicU64,
    // Held while checking the generation and publishing
    publish: Mutex<()>,
    counters: Counters,
}

/// Worker pool turning frame blocks into pitch events
pub struct PitchDispatcher {
    job_tx: Option<Sender<PitchJob>>,
    job_rx: Receiver<PitchJob>,
    event_rx: Receiver<PitchEvent>,
    sequence: AtomicU64,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl PitchDispatcher {
    /// Spawn `workers` threads
    pub fn new(
        detector: PitchDetector,
        min_volume: f32,
        workers: usize,
        queue_capacity: usize,
        event_capacity: usize,
    ) -> Result<Self> {
        let (job_tx, job_rx) = bounded::<PitchJob>(queue_capacity.max(1));
        let (event_tx, event_rx) = bounded::<PitchEvent>(event_capacity.max(1));
        let events = EventSender {
            tx: event_tx,
            rx: event_rx.clone(),
        };

        let shared = Arc::new(Shared {
            detector,
            min_volume,
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
            counters: Counters::default(),
        });

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let jobs = job_rx.clone();
            let events = events.clone();
            let shared = Arc::clone(&shared);

            let handle = thread::Builder::new()
                .name(format!("pitchy-pitch-{}", index))
                .spawn(move || run_worker(jobs, events, shared))
                .map_err(|e| SessionError::source(format!("Failed to spawn pitch worker: {}", e)))?;
            handles.push(handle);
        }

        debug!("Pitch dispatcher started with {} worker(s)", handles.len());

        Ok(Self {
            job_tx: Some(job_tx),
            job_rx,
            event_rx,
            sequence: AtomicU64::new(0),
            shared,
            workers: handles,
        })
    }

    /// Current session generation
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Queue a copy of `block` for estimation without blocking
    ///
    /// Returns `false` if the block was skipped.
    pub fn submit(&self, block: FrameBlock<'_>, generation: u64) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let Some(job_tx) = &self.job_tx else {
            return false;
        };

        let job = PitchJob {
            samples: block.samples.to_vec(),
            sample_rate: block.sample_rate,
            sequence,
            generation,
        };

        match job_tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.shared.counters.dropped_jobs.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Retire the current generation
    ///
    /// Queued jobs are discarded, and once this returns no worker will
    /// publish an event computed for an older generation.
    pub fn invalidate(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        // Wait out a worker that passed the generation check before the bump
        drop(self.shared.publish.lock());

        let mut discarded = 0usize;
        while self.job_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} queued pitch job(s)", discarded);
        }
    }

    /// Consumer end of the event channel
    pub fn subscribe(&self) -> Receiver<PitchEvent> {
        self.event_rx.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        let counters = &self.shared.counters;
        DispatchStats {
            dropped_jobs: counters.dropped_jobs.load(Ordering::Relaxed),
            evicted_events: counters.evicted_events.load(Ordering::Relaxed),
            emitted_events: counters.emitted_events.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PitchDispatcher {
    fn drop(&mut self) {
        // Closing the queue ends the worker loops
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Pitch worker panicked");
            }
        }
    }
}

fn run_worker(jobs: Receiver<PitchJob>, events: EventSender, shared: Arc<Shared>) {
    for job in jobs.iter() {
        if job.generation != shared.generation.load(Ordering::SeqCst) {
            continue;
        }

        let Some(pitch) =
            shared
                .detector
                .estimate(&job.samples, job.sample_rate as f32, shared.min_volume)
        else {
            continue;
        };

        let _publish = shared.publish.lock();
        if job.generation != shared.generation.load(Ordering::SeqCst) {
            continue;
        }

        let event = PitchEvent {
            pitch,
            sequence: job.sequence,
        };
        if !events.send(event, &shared.counters) {
            debug!("Pitch event channel closed");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::time::Duration;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_event_sender_evicts_oldest() {
        let (tx, rx) = bounded(2);
        let sender = EventSender { tx, rx: rx.clone() };
        let counters = Counters::default();

        for sequence in 0..5 {
            assert!(sender.send(PitchEvent { pitch: 100.0, sequence }, &counters));
        }

        let kept: Vec<u64> = rx.try_iter().map(|e| e.sequence).collect();
        assert_eq!(kept, vec![3, 4]);
        assert_eq!(counters.evicted_events.load(Ordering::Relaxed), 3);
        assert_eq!(counters.emitted_events.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_worker_emits_pitch() {
        let dispatcher = PitchDispatcher::new(PitchDetector::default(), 0.01, 1, 4, 8).unwrap();
        let events = dispatcher.subscribe();
        let samples = sine(330.0, 44100, 4096);

        let generation = dispatcher.generation();
        assert!(dispatcher.submit(
            FrameBlock {
                samples: &samples,
                sample_rate: 44100,
            },
            generation,
        ));

        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.sequence, 0);
        assert!((event.pitch - 330.0).abs() < 3.3);
    }

    #[test]
    fn test_silence_emits_nothing() {
        let dispatcher = PitchDispatcher::new(PitchDetector::default(), 0.01, 2, 4, 8).unwrap();
        let events = dispatcher.subscribe();
        let silence = vec![0.0; 4096];

        for _ in 0..3 {
            dispatcher.submit(
                FrameBlock {
                    samples: &silence,
                    sample_rate: 44100,
                },
                dispatcher.generation(),
            );
        }

        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let dispatcher = PitchDispatcher::new(PitchDetector::default(), 0.01, 1, 4, 8).unwrap();
        let events = dispatcher.subscribe();
        let samples = sine(440.0, 44100, 4096);

        let stale = dispatcher.generation();
        dispatcher.invalidate();
        dispatcher.submit(
            FrameBlock {
                samples: &samples,
                sample_rate: 44100,
            },
            stale,
        );

        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(dispatcher.stats().emitted_events, 0);
    }

    #[test]
    fn test_drop_joins_workers_and_closes_events() {
        let dispatcher = PitchDispatcher::new(PitchDetector::default(), 0.01, 3, 4, 8).unwrap();
        let events = dispatcher.subscribe();
        drop(dispatcher);

        // Every sender is gone once the workers have exited
        assert!(events.recv().is_err());
    }
}
