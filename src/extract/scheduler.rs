//! Parallel page scheduler.
//!
//! Fans OCR work for a multi-page document out across a bounded worker
//! pool, enforces a hard per-page timeout, converts per-page failures
//! into outcomes instead of letting them abort siblings, and reassembles
//! results in page order no matter which order workers finish in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use super::engine::{select_device, Device, OcrEngine};
use super::native::PAGE_SEPARATOR;

/// One page of OCR work. Consumed exactly once by a worker.
#[derive(Debug, Clone)]
pub struct PageTask {
    /// 1-based page index; the stable ordering key.
    pub index: u32,
    /// Grayscale raster produced by the rasterizer.
    pub image: PathBuf,
}

/// How a page's processing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Success,
    /// Wall-clock bound exceeded; excluded from the document, not retried.
    Timeout,
    /// Recognition failed terminally; excluded from the document.
    Error,
}

/// Result of one page worker.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub index: u32,
    pub text: String,
    pub elapsed: Duration,
    pub outcome: PageOutcome,
}

impl PageResult {
    fn failed(index: u32, elapsed: Duration, outcome: PageOutcome) -> Self {
        Self {
            index,
            text: String::new(),
            elapsed,
            outcome,
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Hard wall-clock bound per page.
    pub page_timeout: Duration,
    /// Force CPU recognition even when a GPU is available.
    pub force_cpu: bool,
    /// Worker cap when recognition runs on CPU.
    pub max_workers: usize,
    /// Worker cap when recognition runs on GPU (memory contention).
    pub gpu_workers: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(120),
            force_cpu: false,
            max_workers: 8,
            gpu_workers: 2,
        }
    }
}

/// Worker pool size for a batch of pending pages.
///
/// GPU memory contention caps GPU pools hard; CPU pools are bounded
/// because each OCR worker is CPU- and memory-heavy on its own.
pub fn pool_size(gpu: bool, pending: usize, options: &SchedulerOptions) -> usize {
    if gpu {
        options.gpu_workers.max(1)
    } else {
        options.max_workers.min(pending).max(1)
    }
}

/// Run OCR over a set of page tasks and return one result per task,
/// sorted ascending by page index.
///
/// Completion order is arbitrary; the sort before returning is what
/// keeps parallelism out of the final document order.
pub async fn run_pages(
    engine: Arc<dyn OcrEngine>,
    tasks: Vec<PageTask>,
    options: &SchedulerOptions,
) -> Vec<PageResult> {
    let gpu = !options.force_cpu && engine.supports_gpu() && engine.gpu_ready();
    let workers = pool_size(gpu, tasks.len(), options);
    let semaphore = Arc::new(Semaphore::new(workers));

    tracing::debug!(
        "Scheduling {} pages across {} workers (gpu={})",
        tasks.len(),
        workers,
        gpu
    );

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let engine = engine.clone();
        let semaphore = semaphore.clone();
        let timeout = options.page_timeout;
        let force_cpu = options.force_cpu;

        handles.push(tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return PageResult::failed(task.index, Duration::ZERO, PageOutcome::Error)
                }
            };

            let index = task.index;
            let start = Instant::now();
            let work = tokio::task::spawn_blocking(move || {
                // The permit rides with the blocking worker: a page that
                // times out keeps occupying its pool slot until the
                // abandoned OCR process actually exits.
                let _permit = permit;
                recognize_with_fallback(engine.as_ref(), &task, force_cpu)
            });

            match tokio::time::timeout(timeout, work).await {
                Ok(Ok(Ok(text))) => PageResult {
                    index,
                    text,
                    elapsed: start.elapsed(),
                    outcome: PageOutcome::Success,
                },
                Ok(Ok(Err(e))) => {
                    tracing::warn!("Page {} failed terminally: {}", index, e);
                    PageResult::failed(index, start.elapsed(), PageOutcome::Error)
                }
                Ok(Err(join_err)) => {
                    tracing::warn!("Page {} worker panicked: {}", index, join_err);
                    PageResult::failed(index, start.elapsed(), PageOutcome::Error)
                }
                Err(_) => {
                    // Excluded from the document; the index is logged so
                    // an operator can re-run the page later.
                    tracing::warn!(
                        "Page {} timed out after {:?} and was excluded",
                        index,
                        timeout
                    );
                    PageResult::failed(index, start.elapsed(), PageOutcome::Timeout)
                }
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("Page task join failed: {}", e),
        }
    }

    results.sort_by_key(|r| r.index);
    results
}

/// One recognition attempt with the single CPU-forced retry.
///
/// The device is selected fresh for the attempt; after a retryable GPU
/// failure the page retries once on CPU, and a second failure is
/// terminal for that page only.
fn recognize_with_fallback(
    engine: &dyn OcrEngine,
    task: &PageTask,
    force_cpu: bool,
) -> Result<String, super::engine::OcrError> {
    let device = select_device(engine, force_cpu);
    match engine.recognize(&task.image, device) {
        Ok(text) => Ok(text),
        Err(e) if device == Device::Gpu && e.is_retryable() => {
            tracing::warn!(
                "Page {}: GPU recognition failed ({}), retrying on CPU",
                task.index,
                e
            );
            engine.recognize(&task.image, Device::Cpu)
        }
        Err(e) => Err(e),
    }
}

/// Concatenate successful pages in index order with a blank line between
/// pages. Timed-out and errored pages leave a gap with no placeholder.
pub fn merge_results(results: &[PageResult]) -> String {
    let mut ordered: Vec<&PageResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);

    ordered
        .iter()
        .filter(|r| r.outcome == PageOutcome::Success)
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::super::engine::OcrError;

    /// Engine stub keyed by image file name.
    struct StubEngine {
        /// Text per page image name.
        texts: HashMap<String, String>,
        /// Page image names that block past any timeout.
        hang: Vec<String>,
        /// Page image names that fail on every device.
        fail: Vec<String>,
        /// Extra sleep per page, for completion-order shuffling.
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
    }

    impl StubEngine {
        fn new(texts: &[(&str, &str)]) -> Self {
            Self {
                texts: texts
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                hang: Vec::new(),
                fail: Vec::new(),
                delays: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OcrEngine for StubEngine {
        fn recognize(&self, image: &Path, _device: Device) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if self.hang.contains(&name) {
                std::thread::sleep(Duration::from_millis(1500));
            }
            if let Some(delay) = self.delays.get(&name) {
                std::thread::sleep(*delay);
            }
            if self.fail.contains(&name) {
                return Err(OcrError::Recognition(format!("stub failure on {}", name)));
            }
            self.texts
                .get(&name)
                .cloned()
                .ok_or_else(|| OcrError::Recognition(format!("no stub text for {}", name)))
        }
    }

    /// Engine that records how many recognitions run at once.
    struct TrackingEngine {
        running: AtomicUsize,
        peak: AtomicUsize,
        hang: Vec<String>,
    }

    impl OcrEngine for TrackingEngine {
        fn recognize(&self, image: &Path, _device: Device) -> Result<String, OcrError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if self.hang.iter().any(|h| h == name) {
                std::thread::sleep(Duration::from_millis(600));
            } else {
                std::thread::sleep(Duration::from_millis(50));
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok("recognized".to_string())
        }
    }

    /// Engine that fails on GPU and succeeds on CPU.
    struct GpuFlakyEngine {
        calls: AtomicUsize,
        cpu_text: String,
        fail_cpu_too: bool,
    }

    impl OcrEngine for GpuFlakyEngine {
        fn recognize(&self, _image: &Path, device: Device) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match device {
                Device::Gpu => Err(OcrError::Recognition("CUDA out of memory".into())),
                Device::Cpu if self.fail_cpu_too => {
                    Err(OcrError::Recognition("still failing".into()))
                }
                Device::Cpu => Ok(self.cpu_text.clone()),
            }
        }
        fn supports_gpu(&self) -> bool {
            true
        }
        fn gpu_ready(&self) -> bool {
            true
        }
    }

    fn task(index: u32) -> PageTask {
        PageTask {
            index,
            image: PathBuf::from(format!("page-{}.png", index)),
        }
    }

    fn fast_options() -> SchedulerOptions {
        SchedulerOptions {
            page_timeout: Duration::from_millis(300),
            ..SchedulerOptions::default()
        }
    }

    #[test]
    fn test_pool_size_policy() {
        let options = SchedulerOptions::default();
        assert_eq!(pool_size(true, 40, &options), 2);
        assert_eq!(pool_size(false, 40, &options), 8);
        assert_eq!(pool_size(false, 3, &options), 3);
        assert_eq!(pool_size(false, 0, &options), 1);
    }

    #[tokio::test]
    async fn test_merge_preserves_page_order() {
        // Earlier pages sleep longer, so completion order is reversed
        let mut engine = StubEngine::new(&[
            ("page-1.png", "alpha"),
            ("page-2.png", "beta"),
            ("page-3.png", "gamma"),
            ("page-4.png", "delta"),
        ]);
        for (i, name) in ["page-1.png", "page-2.png", "page-3.png", "page-4.png"]
            .iter()
            .enumerate()
        {
            engine
                .delays
                .insert(name.to_string(), Duration::from_millis((4 - i as u64) * 30));
        }

        let results = run_pages(
            Arc::new(engine),
            vec![task(1), task(2), task(3), task(4)],
            &SchedulerOptions::default(),
        )
        .await;

        let indices: Vec<u32> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(merge_results(&results), "alpha\n\nbeta\n\ngamma\n\ndelta");
    }

    #[tokio::test]
    async fn test_timed_out_page_leaves_gap() {
        // Pages 1 and 3 succeed, page 2 exceeds the timeout
        let mut engine = StubEngine::new(&[("page-1.png", "Hello"), ("page-3.png", "World")]);
        engine.hang.push("page-2.png".to_string());

        let start = Instant::now();
        let results = run_pages(
            Arc::new(engine),
            vec![task(1), task(2), task(3)],
            &fast_options(),
        )
        .await;
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].outcome, PageOutcome::Timeout);
        assert_eq!(merge_results(&results), "Hello\n\nWorld");
        // The scheduler stops waiting at the deadline, not when the
        // abandoned worker finishes
        assert!(
            elapsed < Duration::from_millis(1200),
            "scheduler waited past the page timeout: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_pool_cap_holds_across_timeouts() {
        // Page 1 outlives its timeout; page 2 must still wait for the
        // abandoned worker's slot, never overlapping it.
        let engine = Arc::new(TrackingEngine {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            hang: vec!["page-1.png".to_string()],
        });
        let options = SchedulerOptions {
            page_timeout: Duration::from_millis(200),
            force_cpu: true,
            max_workers: 1,
            gpu_workers: 2,
        };

        let results = run_pages(engine.clone(), vec![task(1), task(2)], &options).await;

        assert_eq!(results[0].outcome, PageOutcome::Timeout);
        assert_eq!(results[1].outcome, PageOutcome::Success);
        assert_eq!(engine.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gpu_failure_retries_once_on_cpu() {
        let engine = Arc::new(GpuFlakyEngine {
            calls: AtomicUsize::new(0),
            cpu_text: "recovered".to_string(),
            fail_cpu_too: false,
        });

        let results = run_pages(engine.clone(), vec![task(1)], &fast_options()).await;

        assert_eq!(results[0].outcome, PageOutcome::Success);
        assert_eq!(results[0].text, "recovered");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_double_failure_is_terminal_for_page_only() {
        let engine = Arc::new(GpuFlakyEngine {
            calls: AtomicUsize::new(0),
            cpu_text: String::new(),
            fail_cpu_too: true,
        });

        let results = run_pages(engine.clone(), vec![task(1)], &fast_options()).await;

        assert_eq!(results[0].outcome, PageOutcome::Error);
        assert!(merge_results(&results).is_empty());
        // One GPU attempt plus exactly one CPU retry
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_page_error_does_not_abort_siblings() {
        let mut engine = StubEngine::new(&[("page-1.png", "one"), ("page-3.png", "three")]);
        engine.fail.push("page-2.png".to_string());

        let results = run_pages(
            Arc::new(engine),
            vec![task(1), task(2), task(3)],
            &fast_options(),
        )
        .await;

        assert_eq!(results[0].outcome, PageOutcome::Success);
        assert_eq!(results[1].outcome, PageOutcome::Error);
        assert_eq!(results[2].outcome, PageOutcome::Success);
        assert_eq!(merge_results(&results), "one\n\nthree");
    }

    #[tokio::test]
    async fn test_noncontiguous_indices_sort_numerically() {
        let engine = StubEngine::new(&[
            ("page-2.png", "two"),
            ("page-10.png", "ten"),
            ("page-7.png", "seven"),
        ]);

        let results = run_pages(
            Arc::new(engine),
            vec![task(10), task(2), task(7)],
            &SchedulerOptions::default(),
        )
        .await;

        let indices: Vec<u32> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 7, 10]);
        assert_eq!(merge_results(&results), "two\n\nseven\n\nten");
    }
}
