//! End-to-end tests of the timeline orchestrator on the CPU renderer.

mod thread_fixtures;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thread_fixtures::{cpu_caps, lit_pixels};
use timeline_threads::animation::FRAME_INTERVAL_MS;
use timeline_threads::config::ThreadControlParams;
use timeline_threads::orchestrator::{
    compute_performance_profile, DeviceSignals, EffectiveConnectionType, MutationReport, OrchestratorState,
    TimelineOptions, TimelineThreads, BASE_THREAD_COUNT, MIN_THREAD_COUNT,
};
use timeline_threads::render::{FactoryOptions, OffscreenSurface, RendererConfig, RendererKind};
use timeline_threads::workers::{ThreadGenerationWorker, ThreadSource};

const WAIT: Duration = Duration::from_secs(5);

fn options() -> TimelineOptions {
    TimelineOptions {
        capabilities: Some(cpu_caps()),
        factory: FactoryOptions {
            allow_canvas_fallback: true,
            ..FactoryOptions::default()
        },
        ..TimelineOptions::default()
    }
}

fn recorded(options: TimelineOptions) -> (TimelineOptions, Arc<Mutex<Vec<MutationReport>>>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    (options.with_reporter(move |r| sink.lock().unwrap().push(r.clone())), reports)
}

#[test]
fn test_full_lifecycle_with_generator_worker() {
    let (opts, reports) = recorded(options());
    let mut timeline = TimelineThreads::new(opts);
    timeline.mount(DeviceSignals::viewport(200.0, 100.0, 1.0)).unwrap();
    assert_eq!(timeline.wait_for_renderer(WAIT).unwrap(), RendererKind::Canvas2d);
    assert_eq!(timeline.thread_source(), Some(ThreadSource::Worker));

    timeline.notify_page_ready();
    for i in 0..20 {
        timeline.tick(i as f64 * FRAME_INTERVAL_MS);
    }
    let snap = timeline.snapshot(WAIT).unwrap().unwrap();
    assert_eq!((snap.width, snap.height), (200, 100));
    assert!(lit_pixels(&snap, RendererConfig::default().background, 8) > 0);

    timeline.dispose();
    let states: Vec<OrchestratorState> = reports
        .lock()
        .unwrap()
        .iter()
        .filter_map(|r| match r {
            MutationReport::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            OrchestratorState::GeneratingThreads,
            OrchestratorState::ReadyButNotAnimating,
            OrchestratorState::Animating,
            OrchestratorState::Disposed,
        ]
    );
}

#[test]
fn test_silent_generator_uses_fallback() {
    let (request_tx, _request_rx) = std::sync::mpsc::channel();
    let (_response_tx, response_rx) = std::sync::mpsc::channel();
    let silent = ThreadGenerationWorker::from_channels(request_tx, response_rx);

    let mut timeline = TimelineThreads::new(TimelineOptions {
        generator_timeout: Duration::from_millis(50),
        ..options()
    });
    timeline
        .mount_with(OffscreenSurface::new(64, 32, 1.0), DeviceSignals::viewport(64.0, 32.0, 1.0), Some(silent))
        .unwrap();
    assert_eq!(timeline.state(), OrchestratorState::GeneratingThreads);
    timeline.wait_for_renderer(WAIT).unwrap();
    assert_eq!(timeline.thread_source(), Some(ThreadSource::MainThreadFallback));
    assert!(!timeline.threads().is_empty());
}

#[test]
fn test_overrides_reach_generation() {
    let mut timeline = TimelineThreads::new(TimelineOptions {
        overrides: ThreadControlParams {
            thread_count: Some(7),
            enable_blur: Some(false),
            ..ThreadControlParams::default()
        },
        ..options()
    });
    timeline
        .mount_with(OffscreenSurface::new(64, 32, 1.0), DeviceSignals::default(), None)
        .unwrap();
    assert_eq!(timeline.threads().len(), 7);
    assert!(!timeline.resolved_params().unwrap().enable_blur);
}

#[test]
fn test_gpu_only_machine_without_gpu_hides() {
    let mut timeline = TimelineThreads::new(TimelineOptions {
        capabilities: Some(cpu_caps()),
        ..TimelineOptions::default()
    });
    timeline
        .mount_with(OffscreenSurface::new(64, 32, 1.0), DeviceSignals::default(), None)
        .unwrap();
    assert!(timeline.wait_for_renderer(WAIT).is_err());
    assert_eq!(timeline.state(), OrchestratorState::Disposed);
    assert!(!timeline.is_rendered());
    assert!(!timeline.tick(0.0));
}

#[test]
fn test_resize_burst_applies_latest_signals_once() {
    let (opts, reports) = recorded(options());
    let mut timeline = TimelineThreads::new(opts);
    timeline
        .mount_with(OffscreenSurface::new(300, 200, 1.0), DeviceSignals::viewport(300.0, 200.0, 1.0), None)
        .unwrap();
    timeline.wait_for_renderer(WAIT).unwrap();
    timeline.notify_page_ready();
    let before = reports.lock().unwrap().len();

    for width in [320.0, 340.0, 360.0] {
        timeline.request_profile_update(DeviceSignals::viewport(width, 200.0, 1.0));
    }
    timeline.tick(0.0);
    let snap = timeline.snapshot(WAIT).unwrap().unwrap();
    assert_eq!(snap.width, 360);
    // same thread count and blur: nothing reportable changed
    assert_eq!(reports.lock().unwrap().len(), before);
}

#[test]
fn test_profile_bounds_for_connection_types() {
    let types = [
        None,
        Some(EffectiveConnectionType::Slow2g),
        Some(EffectiveConnectionType::Cellular2g),
        Some(EffectiveConnectionType::Cellular3g),
        Some(EffectiveConnectionType::Cellular4g),
    ];
    for effective_type in types {
        for width in [320.0, 768.0, 1280.0, 2560.0] {
            let p = compute_performance_profile(&DeviceSignals {
                viewport_width: width,
                effective_type,
                ..DeviceSignals::default()
            });
            assert!(p.thread_count >= MIN_THREAD_COUNT && p.thread_count <= BASE_THREAD_COUNT);
            assert!(p.frame_interval_ms >= FRAME_INTERVAL_MS);
        }
    }
}
