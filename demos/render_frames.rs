//! Example: Render a few seconds of timeline threads to PNG files.
//!
//! Drives the full orchestrator (generator worker, animation worker, renderer
//! factory) with a simulated 60 Hz host loop and saves a snapshot every
//! second of animation.
//!
//! Run with:
//!     cargo run --example render_frames -- [output_dir] [overrides.json]
//!
//! Set `TIMELINE_RENDERER=webgl2|webgl|canvas2d` to force a renderer,
//! `TIMELINE_CONNECTION=slow-2g|2g|3g|4g` to simulate a slow network and
//! `RUST_LOG=debug` for flip-level logging.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use timeline_threads::config::ThreadControlParams;
use timeline_threads::orchestrator::{DeviceSignals, EffectiveConnectionType, TimelineOptions, TimelineThreads};
use timeline_threads::render::{FactoryOptions, RendererKind};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Timeline Threads - Frame Export Example");
    println!("=======================================\n");

    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "timeline_frames".to_string()));
    let overrides = match args.next() {
        Some(path) => ThreadControlParams::from_path(&path).with_context(|| format!("loading overrides from {}", path))?,
        None => ThreadControlParams::default(),
    };
    let force = std::env::var("TIMELINE_RENDERER")
        .ok()
        .and_then(|s| s.parse::<RendererKind>().ok());
    let effective_type = match std::env::var("TIMELINE_CONNECTION") {
        Ok(s) => Some(s.parse::<EffectiveConnectionType>()?),
        Err(_) => None,
    };

    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let signals = DeviceSignals {
        hardware_concurrency: std::thread::available_parallelism().ok().map(|n| n.get() as u32),
        effective_type,
        ..DeviceSignals::viewport(960.0, 540.0, 1.0)
    };

    let options = TimelineOptions {
        overrides,
        factory: FactoryOptions {
            force,
            allow_canvas_fallback: true,
            ..FactoryOptions::default()
        },
        ..TimelineOptions::default()
    }
    .with_reporter(|report| println!("  [mutation] {:?}", report));

    let mut timeline = TimelineThreads::new(options);
    timeline.mount(signals).context("mounting timeline threads")?;
    let kind = timeline
        .wait_for_renderer(Duration::from_secs(10))
        .context("waiting for a renderer")?;
    println!("Renderer: {}", kind);
    timeline.notify_page_ready();

    if let Some(profile) = timeline.profile() {
        println!("\nProfile:");
        println!("  Threads: {}", profile.thread_count);
        println!("  Blur: {}", profile.blur_std_deviation);
        println!("  Frame interval: {:.1}ms\n", profile.frame_interval_ms);
    }

    let seconds = 6;
    let host_frame_ms = 1000.0 / 60.0;
    for second in 0..seconds {
        for i in 0..60 {
            let now = (second * 60 + i) as f64 * host_frame_ms;
            timeline.tick(now);
            std::thread::sleep(Duration::from_millis(2));
        }
        let snapshot = timeline
            .snapshot(Duration::from_secs(5))?
            .context("renderer has no surface")?;
        let path = output_dir.join(format!("frame_{:02}.png", second));
        snapshot.save_png(&path)?;
        println!("Saved {}", path.display());
    }

    for event in timeline.poll_events() {
        println!("  [worker] {:?}", event);
    }
    timeline.dispose();

    println!("\nDone! Frames written to {}", output_dir.display());
    Ok(())
}
