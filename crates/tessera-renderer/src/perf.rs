//! Performance monitoring
//!
//! The host calls [`PerformanceMonitor::sample`] once per rendered frame from
//! the engine's render hook. Frame counts are rolled up into metrics once per
//! flush interval, together with the engine's render counters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_assets::EngineAdapter;
use tessera_core::{Clock, EngineKind, SystemClock};
use tessera_platform::RollingTimer;

/// Metrics for the last flush interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub fps: u32,
    pub draw_calls: u64,
    pub triangle_count: u64,
    pub memory_usage: u64,
    pub engine_type: EngineKind,
}

impl PerformanceMetrics {
    /// Zeroed metrics for an engine
    pub fn empty(engine_type: EngineKind) -> Self {
        Self {
            fps: 0,
            draw_calls: 0,
            triangle_count: 0,
            memory_usage: 0,
            engine_type,
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between metric roll-ups (ms)
    pub flush_interval_ms: f64,
    /// Frame rate below which the engine counts as degraded
    pub degraded_fps: u32,
    /// Number of frame times kept for frame-time statistics
    pub frame_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 1000.0,
            degraded_fps: 30,
            frame_window: 60,
        }
    }
}

/// Engine hook the host should drive [`PerformanceMonitor::sample`] from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHook {
    /// Babylon scene before-render observable
    BeforeRender,
    /// Three animation-frame tick
    AnimationFrame,
    /// Cesium scene post-render event
    PostRender,
}

impl RenderHook {
    pub fn for_engine(engine: EngineKind) -> Self {
        match engine {
            EngineKind::Babylon => RenderHook::BeforeRender,
            EngineKind::Three => RenderHook::AnimationFrame,
            EngineKind::Cesium => RenderHook::PostRender,
        }
    }
}

/// Frame-rate state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceEvent {
    Degraded(PerformanceMetrics),
    Recovered(PerformanceMetrics),
}

impl PerformanceEvent {
    pub fn metrics(&self) -> &PerformanceMetrics {
        match self {
            PerformanceEvent::Degraded(m) | PerformanceEvent::Recovered(m) => m,
        }
    }
}

/// Handle returned by [`PerformanceMonitor::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Frame-time statistics over the rolling window (ms)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTimeStats {
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub samples: usize,
}

type Subscriber = Box<dyn FnMut(&PerformanceEvent) + Send>;

/// Per-engine frame-rate monitor
pub struct PerformanceMonitor<A: EngineAdapter> {
    adapter: Arc<A>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    running: bool,
    frame_count: u32,
    last_flush: f64,
    last_frame: Option<f64>,
    metrics: PerformanceMetrics,
    frame_times: RollingTimer,
    degraded: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<A: EngineAdapter> PerformanceMonitor<A> {
    /// Create a monitor on the system clock with default settings
    pub fn new(adapter: Arc<A>) -> Self {
        Self::with_config(adapter, Arc::new(SystemClock::new()), MonitorConfig::default())
    }

    pub fn with_config(adapter: Arc<A>, clock: Arc<dyn Clock>, config: MonitorConfig) -> Self {
        let engine = adapter.kind();
        let frame_times = RollingTimer::new(config.frame_window);
        Self {
            adapter,
            clock,
            config,
            running: false,
            frame_count: 0,
            last_flush: 0.0,
            last_frame: None,
            metrics: PerformanceMetrics::empty(engine),
            frame_times,
            degraded: false,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.adapter.kind()
    }

    /// Hook the host should call [`sample`](Self::sample) from
    pub fn hook(&self) -> RenderHook {
        RenderHook::for_engine(self.engine())
    }

    /// Begin accumulating frames. Calling it while running is a no-op.
    pub fn start_monitoring(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.frame_count = 0;
        self.last_flush = self.clock.monotonic_millis();
        self.last_frame = None;
        self.frame_times.reset();
        log::info!(
            "Performance monitoring started for {} ({:?})",
            self.engine(),
            self.hook()
        );
    }

    /// Stop accumulating. The last metrics stay readable.
    pub fn stop_monitoring(&mut self) {
        if self.running {
            self.running = false;
            log::info!("Performance monitoring stopped for {}", self.engine());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record one rendered frame.
    ///
    /// Returns the new metrics when this frame closed a flush interval.
    pub fn sample(&mut self) -> Option<PerformanceMetrics> {
        if !self.running {
            return None;
        }

        let now = self.clock.monotonic_millis();
        if let Some(previous) = self.last_frame {
            self.frame_times.record(now - previous);
        }
        self.last_frame = Some(now);
        self.frame_count += 1;

        let elapsed = now - self.last_flush;
        if elapsed < self.config.flush_interval_ms || elapsed <= 0.0 {
            return None;
        }

        let stats = self.adapter.frame_stats();
        self.metrics = PerformanceMetrics {
            fps: (f64::from(self.frame_count) * 1000.0 / elapsed).round() as u32,
            draw_calls: stats.draw_calls,
            triangle_count: stats.triangle_count,
            memory_usage: stats.memory_usage,
            engine_type: self.engine(),
        };
        self.frame_count = 0;
        self.last_flush = now;

        self.check_degradation();
        Some(self.metrics)
    }

    fn check_degradation(&mut self) {
        let degraded = self.metrics.fps < self.config.degraded_fps;
        let event = match (self.degraded, degraded) {
            (false, true) => {
                log::warn!(
                    "Low FPS detected: {} ({})",
                    self.metrics.fps,
                    self.metrics.engine_type
                );
                PerformanceEvent::Degraded(self.metrics)
            }
            (true, false) => {
                log::info!(
                    "Frame rate recovered: {} ({})",
                    self.metrics.fps,
                    self.metrics.engine_type
                );
                PerformanceEvent::Recovered(self.metrics)
            }
            _ => return,
        };
        self.degraded = degraded;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&event);
        }
    }

    /// Copy of the last metrics
    pub fn get_metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn frame_time_stats(&self) -> FrameTimeStats {
        FrameTimeStats {
            average_ms: self.frame_times.average(),
            min_ms: self.frame_times.min(),
            max_ms: self.frame_times.max(),
            samples: self.frame_times.count(),
        }
    }

    /// Register a callback for [`PerformanceEvent`]s
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&PerformanceEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tessera_assets::{BabylonAdapter, CesiumAdapter, NativeRuntime};
    use tessera_core::ManualClock;

    fn monitor<A: EngineAdapter>(adapter: A, clock: &Arc<ManualClock>) -> PerformanceMonitor<A> {
        PerformanceMonitor::with_config(Arc::new(adapter), clock.clone(), MonitorConfig::default())
    }

    fn run_frames<A: EngineAdapter>(
        monitor: &mut PerformanceMonitor<A>,
        clock: &ManualClock,
        frames: u32,
        frame_ms: u64,
    ) -> Option<PerformanceMetrics> {
        let mut flushed = None;
        for _ in 0..frames {
            clock.advance(Duration::from_millis(frame_ms));
            if let Some(metrics) = monitor.sample() {
                flushed = Some(metrics);
            }
        }
        flushed
    }

    #[test]
    fn test_fps_rollup() {
        let runtime = Arc::new(NativeRuntime::new(EngineKind::Babylon));
        runtime.create_buffer(4_096);
        runtime.record_frame(12, 5_000);
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::new(runtime), &clock);
        monitor.start_monitoring();

        assert!(run_frames(&mut monitor, &clock, 49, 20).is_none());
        let metrics = run_frames(&mut monitor, &clock, 1, 20).unwrap();

        assert_eq!(metrics.fps, 50);
        assert_eq!(metrics.draw_calls, 12);
        assert_eq!(metrics.triangle_count, 5_000);
        assert_eq!(metrics.memory_usage, 4_096);
        assert_eq!(monitor.get_metrics(), metrics);
        assert_eq!(monitor.hook(), RenderHook::BeforeRender);
    }

    #[test]
    fn test_fps_rounding() {
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::detached(), &clock);
        monitor.start_monitoring();

        // 56 frames over 1008 ms -> 55.56 fps
        let metrics = run_frames(&mut monitor, &clock, 56, 18).unwrap();
        assert_eq!(metrics.fps, 56);
    }

    #[test]
    fn test_cesium_reports_no_draw_calls() {
        let runtime = Arc::new(NativeRuntime::new(EngineKind::Cesium));
        runtime.record_frame(40, 900);
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(CesiumAdapter::new(runtime), &clock);
        monitor.start_monitoring();

        let metrics = run_frames(&mut monitor, &clock, 60, 17).unwrap();
        assert_eq!(metrics.draw_calls, 0);
        assert_eq!(metrics.triangle_count, 900);
        assert_eq!(metrics.engine_type, EngineKind::Cesium);
    }

    #[test]
    fn test_not_running_ignores_samples() {
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::detached(), &clock);

        assert!(run_frames(&mut monitor, &clock, 100, 20).is_none());
        assert_eq!(monitor.get_metrics(), PerformanceMetrics::empty(EngineKind::Babylon));

        monitor.start_monitoring();
        run_frames(&mut monitor, &clock, 60, 20);
        monitor.stop_monitoring();
        let before = monitor.get_metrics();
        assert!(run_frames(&mut monitor, &clock, 100, 5).is_none());
        assert_eq!(monitor.get_metrics(), before);
    }

    #[test]
    fn test_degradation_events() {
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::detached(), &clock);
        let (tx, rx) = mpsc::channel();
        monitor.subscribe(move |event| {
            let _ = tx.send(*event);
        });
        monitor.start_monitoring();

        // 25 fps
        run_frames(&mut monitor, &clock, 25, 40);
        assert!(monitor.is_degraded());
        // Still low: no second event
        run_frames(&mut monitor, &clock, 25, 40);
        // 100 fps
        run_frames(&mut monitor, &clock, 100, 10);
        assert!(!monitor.is_degraded());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PerformanceEvent::Degraded(m) if m.fps == 25));
        assert!(matches!(events[1], PerformanceEvent::Recovered(m) if m.fps == 100));
    }

    #[test]
    fn test_unsubscribe() {
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::detached(), &clock);
        let (tx, rx) = mpsc::channel();
        let id = monitor.subscribe(move |event| {
            let _ = tx.send(*event);
        });

        assert!(monitor.unsubscribe(id));
        assert!(!monitor.unsubscribe(id));

        monitor.start_monitoring();
        run_frames(&mut monitor, &clock, 10, 100);
        assert!(monitor.is_degraded());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_frame_time_stats() {
        let clock = Arc::new(ManualClock::new(0));
        let mut monitor = monitor(BabylonAdapter::detached(), &clock);
        monitor.start_monitoring();

        run_frames(&mut monitor, &clock, 3, 10);
        run_frames(&mut monitor, &clock, 1, 30);

        let stats = monitor.frame_time_stats();
        assert_eq!(stats.samples, 3);
        assert!((stats.min_ms - 10.0).abs() < 1e-9);
        assert!((stats.max_ms - 30.0).abs() < 1e-9);
        assert!((stats.average_ms - 50.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_json() {
        let value = serde_json::to_value(PerformanceMetrics::empty(EngineKind::Three)).unwrap();
        assert_eq!(value["engineType"], "3D_ENGINE_THREE");
        assert_eq!(value["drawCalls"], 0);
    }
}
