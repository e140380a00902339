//! Worker model cache: one load per archive regardless of concurrency.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use parking_lot::Mutex;
use pyfunc_core::distributed::{ArchiveRef, ModelCache, SharedDirBroadcast};
use pyfunc_core::frame::{DataFrame, PredictOutput, Value};
use pyfunc_core::models::{
    save_model, LoadContext, LoaderRegistry, Model, ModelLoader, PyfuncLoader, PyfuncModel,
    RuntimeVersion, SaveRequest,
};
use pyfunc_core::PyfuncError;

struct Tagged(usize);

impl PyfuncModel for Tagged {
    fn predict(&self, input: &DataFrame) -> pyfunc_core::error::Result<PredictOutput> {
        Ok(PredictOutput::Series(vec![Value::Int(self.0 as i64); input.num_rows()]))
    }
}

/// Counts invocations and stalls long enough for callers to pile up.
struct CountingLoader {
    calls: Arc<AtomicUsize>,
}

impl PyfuncLoader for CountingLoader {
    fn load_pyfunc(
        &self,
        _data_path: &Path,
        _ctx: &LoadContext<'_>,
    ) -> pyfunc_core::error::Result<Arc<dyn PyfuncModel>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        Ok(Arc::new(Tagged(n)))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    cache: ModelCache,
    calls: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    fixture_with(|_| {})
}

fn fixture_with(extra: impl FnOnce(&LoaderRegistry)) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let calls = Arc::new(AtomicUsize::new(0));

    let registry = Arc::new(LoaderRegistry::new());
    registry
        .register("acme.count", Arc::new(CountingLoader { calls: Arc::clone(&calls) }))
        .unwrap();
    extra(&registry);
    let loader = ModelLoader::new(registry).with_runtime_version(RuntimeVersion::new("1.78.0"));
    let broadcast = SharedDirBroadcast::new(root.join("shared"), root.join("worker"));
    let cache = ModelCache::new(Arc::new(broadcast), Arc::new(loader)).with_suppressed_warnings(true);

    Fixture {
        _dir: dir,
        root,
        cache,
        calls,
    }
}

fn publish(fx: &Fixture, name: &str, payload: &str) -> ArchiveRef {
    publish_with(fx, "acme.count", name, payload)
}

fn publish_with(fx: &Fixture, module: &str, name: &str, payload: &str) -> ArchiveRef {
    let data = fx.root.join(format!("{}.bin", name));
    std::fs::write(&data, payload).unwrap();
    let artifact = fx.root.join(name);
    let request = SaveRequest::new(module).with_data(&data);
    save_model(&artifact, &request, Model::new(), &RuntimeVersion::new("1.78.0")).unwrap();
    fx.cache.add_local_model(&artifact).unwrap()
}

#[test]
fn concurrent_callers_share_one_load() {
    let fx = fixture();
    let archive = publish(&fx, "model", "weights");

    let threads = 8;
    let barrier = Barrier::new(threads);
    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    fx.cache.get_or_load(&archive).unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.cache.load_count(), 1);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
}

#[test]
fn repeated_lookups_hit_the_cache() {
    let fx = fixture();
    let archive = publish(&fx, "model", "weights");

    let first = fx.cache.get_or_load(&archive).unwrap();
    let second = fx.cache.get_or_load(&archive).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    assert!(fx.cache.is_loaded(&archive));
    assert_eq!(fx.cache.len(), 1);
}

#[test]
fn distinct_archives_load_independently() {
    let fx = fixture();
    let a = publish(&fx, "a", "first");
    let b = publish(&fx, "b", "second");
    assert_ne!(a, b);

    let ma = fx.cache.get_or_load(&a).unwrap();
    let mb = fx.cache.get_or_load(&b).unwrap();
    assert!(!Arc::ptr_eq(&ma, &mb));
    assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.cache.len(), 2);
}

/// Signals when a load starts, then blocks until released.
struct GatedLoader {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl PyfuncLoader for GatedLoader {
    fn load_pyfunc(
        &self,
        _data_path: &Path,
        _ctx: &LoadContext<'_>,
    ) -> pyfunc_core::error::Result<Arc<dyn PyfuncModel>> {
        let _ = self.started.lock().send(());
        let _ = self.release.lock().recv_timeout(Duration::from_secs(10));
        Ok(Arc::new(Tagged(usize::MAX)))
    }
}

#[test]
fn slow_load_does_not_block_other_archives() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let fx = fixture_with(|registry| {
        let gated = GatedLoader {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        registry.register("acme.gated", Arc::new(gated)).unwrap();
    });
    let slow = publish_with(&fx, "acme.gated", "slow", "slow");
    let fast = publish(&fx, "fast", "fast");

    std::thread::scope(|s| {
        let pending = s.spawn(|| fx.cache.get_or_load(&slow).unwrap());
        started_rx.recv_timeout(Duration::from_secs(10)).unwrap();

        // The gated load is still in flight.
        fx.cache.get_or_load(&fast).unwrap();
        assert!(fx.cache.is_loaded(&fast));
        assert!(!fx.cache.is_loaded(&slow));

        release_tx.send(()).unwrap();
        pending.join().unwrap();
    });

    assert!(fx.cache.is_loaded(&slow));
    assert_eq!(fx.cache.load_count(), 2);
}

#[test]
fn unknown_archive_is_reported() {
    let fx = fixture();
    let missing = ArchiveRef::parse(&"0".repeat(64)).unwrap();
    let err = fx.cache.get_or_load(&missing).unwrap_err();
    assert!(matches!(err, PyfuncError::ArchiveNotFound(_)), "{:?}", err);
    assert!(!fx.cache.is_loaded(&missing));
}
