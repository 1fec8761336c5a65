//! Thread-generation worker.

use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::WorkerError;
use crate::threads::{generate_worker_threads, GeneratorParams, WorkerThreadInput};

/// How long the orchestrator waits for generated threads before doing it itself.
pub const GENERATOR_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GeneratorRequest {
    #[serde(rename_all = "camelCase")]
    GenerateThreads {
        request_id: u64,
        count: u32,
        params: GeneratorParams,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GeneratorResponse {
    #[serde(rename_all = "camelCase")]
    ThreadsGenerated {
        request_id: u64,
        threads: Vec<WorkerThreadInput>,
    },
}

/// Where a batch of threads came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreadSource {
    Worker,
    MainThreadFallback,
}

/// An outstanding request, polled with [`ThreadGenerationWorker::try_take`].
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    pub request_id: u64,
    pub count: u32,
    pub params: GeneratorParams,
    pub timeout: Duration,
    pub deadline: Instant,
}

impl PendingGeneration {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Produce the same batch on the calling thread.
    pub fn generate_locally(&self) -> Vec<WorkerThreadInput> {
        generate_worker_threads(self.count, &self.params)
    }
}

/// Handle to a generator running on its own thread.
///
/// Every request carries an id; replies to earlier requests are discarded.
pub struct ThreadGenerationWorker {
    request_tx: Sender<GeneratorRequest>,
    response_rx: Receiver<GeneratorResponse>,
    handle: Option<JoinHandle<()>>,
    next_request: Cell<u64>,
}

impl ThreadGenerationWorker {
    pub fn spawn() -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = mpsc::channel::<GeneratorRequest>();
        let (response_tx, response_rx) = mpsc::channel::<GeneratorResponse>();

        let handle = thread::Builder::new()
            .name("timeline-thread-generator".into())
            .spawn(move || worker_loop(request_rx, response_tx))
            .map_err(WorkerError::Spawn)?;

        Ok(Self {
            request_tx,
            response_rx,
            handle: Some(handle),
            next_request: Cell::new(1),
        })
    }

    /// Attach to a generator driven elsewhere (another thread, a test double).
    pub fn from_channels(request_tx: Sender<GeneratorRequest>, response_rx: Receiver<GeneratorResponse>) -> Self {
        Self {
            request_tx,
            response_rx,
            handle: None,
            next_request: Cell::new(1),
        }
    }

    /// Send a request without waiting for the reply.
    pub fn request(
        &self,
        count: u32,
        params: &GeneratorParams,
        timeout: Duration,
    ) -> Result<PendingGeneration, WorkerError> {
        let request_id = self.next_request.get();
        self.next_request.set(request_id + 1);
        self.request_tx
            .send(GeneratorRequest::GenerateThreads {
                request_id,
                count,
                params: params.clone(),
            })
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(PendingGeneration {
            request_id,
            count,
            params: params.clone(),
            timeout,
            deadline: Instant::now() + timeout,
        })
    }

    /// Non-blocking check for the reply to `pending`.
    ///
    /// `Ok(None)` while still waiting, [`WorkerError::Timeout`] once the
    /// deadline has passed without a matching reply.
    pub fn try_take(&self, pending: &PendingGeneration) -> Result<Option<Vec<WorkerThreadInput>>, WorkerError> {
        loop {
            match self.response_rx.try_recv() {
                Ok(response) => {
                    if let Some(threads) = Self::accept(pending, response) {
                        return Ok(Some(threads));
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
        if pending.is_expired(Instant::now()) {
            return Err(WorkerError::Timeout(pending.timeout));
        }
        Ok(None)
    }

    /// Request `count` threads and wait up to `timeout` for them.
    pub fn generate(
        &self,
        count: u32,
        params: &GeneratorParams,
        timeout: Duration,
    ) -> Result<Vec<WorkerThreadInput>, WorkerError> {
        let pending = self.request(count, params, timeout)?;
        loop {
            let remaining = pending.deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(threads) = Self::accept(&pending, response) {
                        return Ok(threads);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Err(WorkerError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
    }

    fn accept(pending: &PendingGeneration, response: GeneratorResponse) -> Option<Vec<WorkerThreadInput>> {
        let GeneratorResponse::ThreadsGenerated { request_id, threads } = response;
        if request_id == pending.request_id {
            Some(threads)
        } else {
            log::debug!(
                "Discarding stale batch of {} threads (request {}, waiting for {})",
                threads.len(),
                request_id,
                pending.request_id
            );
            None
        }
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ThreadGenerationWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(GeneratorRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(requests: Receiver<GeneratorRequest>, responses: Sender<GeneratorResponse>) {
    while let Ok(request) = requests.recv() {
        match request {
            GeneratorRequest::GenerateThreads {
                request_id,
                count,
                params,
            } => {
                let threads = generate_worker_threads(count, &params);
                if responses
                    .send(GeneratorResponse::ThreadsGenerated { request_id, threads })
                    .is_err()
                {
                    break;
                }
            }
            GeneratorRequest::Shutdown => break,
        }
    }
}

/// Generate threads on `worker`, falling back to the calling thread.
///
/// Spawn failure (`worker == None`), a timeout and a dead worker all fall back.
/// Both paths produce identical threads for the same inputs.
pub fn generate_with_fallback(
    worker: Option<&ThreadGenerationWorker>,
    count: u32,
    params: &GeneratorParams,
    timeout: Duration,
) -> (Vec<WorkerThreadInput>, ThreadSource) {
    if let Some(worker) = worker {
        match worker.generate(count, params, timeout) {
            Ok(threads) => return (threads, ThreadSource::Worker),
            Err(e) => log::warn!("Thread generation worker failed ({}), generating on main thread", e),
        }
    } else {
        log::warn!("No thread generation worker, generating on main thread");
    }
    (generate_worker_threads(count, params), ThreadSource::MainThreadFallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_generates_threads() {
        let worker = ThreadGenerationWorker::spawn().unwrap();
        let params = GeneratorParams::default();
        let (threads, source) = generate_with_fallback(Some(&worker), 12, &params, GENERATOR_TIMEOUT);
        assert_eq!(source, ThreadSource::Worker);
        assert_eq!(threads, generate_worker_threads(12, &params));
    }

    #[test]
    fn test_silent_worker_falls_back() {
        let (request_tx, _request_rx) = mpsc::channel();
        let (_response_tx, response_rx) = mpsc::channel();
        let worker = ThreadGenerationWorker::from_channels(request_tx, response_rx);
        let (threads, source) =
            generate_with_fallback(Some(&worker), 5, &GeneratorParams::default(), Duration::from_millis(20));
        assert_eq!(source, ThreadSource::MainThreadFallback);
        assert_eq!(threads.len(), 5);
    }

    #[test]
    fn test_disconnected_worker_falls_back() {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel::<GeneratorResponse>();
        drop(request_rx);
        drop(response_tx);
        let worker = ThreadGenerationWorker::from_channels(request_tx, response_rx);
        assert!(matches!(
            worker.generate(3, &GeneratorParams::default(), GENERATOR_TIMEOUT),
            Err(WorkerError::Disconnected)
        ));
    }

    #[test]
    fn test_missing_worker_falls_back() {
        let (threads, source) = generate_with_fallback(None, 4, &GeneratorParams::default(), GENERATOR_TIMEOUT);
        assert_eq!(source, ThreadSource::MainThreadFallback);
        assert_eq!(threads.len(), 4);
    }

    #[test]
    fn test_request_serializes_with_tag() {
        let json = serde_json::to_string(&GeneratorRequest::GenerateThreads {
            request_id: 9,
            count: 3,
            params: GeneratorParams::default(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"generateThreads\""));
        assert!(json.contains("\"pivotX\""));
        assert!(json.contains("\"requestId\":9"));
    }

    #[test]
    fn test_try_take_is_non_blocking() {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let worker = ThreadGenerationWorker::from_channels(request_tx, response_rx);
        let params = GeneratorParams::default();

        let pending = worker.request(6, &params, GENERATOR_TIMEOUT).unwrap();
        assert!(matches!(worker.try_take(&pending), Ok(None)));

        let Ok(GeneratorRequest::GenerateThreads { request_id, count, .. }) = request_rx.try_recv() else {
            panic!("request not sent");
        };
        assert_eq!((request_id, count), (pending.request_id, 6));
        response_tx
            .send(GeneratorResponse::ThreadsGenerated {
                request_id,
                threads: pending.generate_locally(),
            })
            .unwrap();
        assert_eq!(worker.try_take(&pending).unwrap().unwrap().len(), 6);
    }

    #[test]
    fn test_try_take_expires() {
        let (request_tx, _request_rx) = mpsc::channel();
        let (_response_tx, response_rx) = mpsc::channel::<GeneratorResponse>();
        let worker = ThreadGenerationWorker::from_channels(request_tx, response_rx);
        let pending = worker.request(3, &GeneratorParams::default(), Duration::ZERO).unwrap();
        assert!(matches!(worker.try_take(&pending), Err(WorkerError::Timeout(_))));
    }

    #[test]
    fn test_same_size_reply_to_old_request_is_discarded() {
        let (request_tx, _request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let worker = ThreadGenerationWorker::from_channels(request_tx, response_rx);

        let old_params = GeneratorParams::default();
        let old = worker.request(4, &old_params, Duration::ZERO).unwrap();
        let new_params = GeneratorParams {
            pivot_x: old_params.pivot_x + 0.1,
            ..GeneratorParams::default()
        };
        let current = worker.request(4, &new_params, GENERATOR_TIMEOUT).unwrap();

        response_tx
            .send(GeneratorResponse::ThreadsGenerated {
                request_id: old.request_id,
                threads: old.generate_locally(),
            })
            .unwrap();
        assert!(matches!(worker.try_take(&current), Ok(None)));

        response_tx
            .send(GeneratorResponse::ThreadsGenerated {
                request_id: current.request_id,
                threads: current.generate_locally(),
            })
            .unwrap();
        let threads = worker.try_take(&current).unwrap().unwrap();
        assert_eq!(threads, generate_worker_threads(4, &new_params));
    }
}
