use std::time::Duration;

/// Tunable thresholds for the monitoring engine.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Detection tick cadence
    pub tick_interval: Duration,

    /// Attention snapshot cadence
    pub snapshot_interval: Duration,

    /// Faces analyzed per frame; extra detections are ignored
    pub max_faces: usize,

    /// Iris offset thresholds (fraction of eye width/height)
    pub iris_horizontal_threshold: f64,
    pub iris_vertical_threshold: f64,

    /// Head pose thresholds in degrees
    pub head_yaw_threshold: f64,
    pub head_pitch_threshold: f64,

    /// Eye-closure blend-shape score above which a frame counts as a blink
    pub blink_threshold: f64,

    /// Seconds without a face before a no-face violation fires
    pub no_face_grace_secs: f64,

    /// Per-kind cool-down between repeat violation emissions
    pub debounce_window_secs: i64,

    /// Event buffer flush triggers
    pub event_batch_size: usize,
    pub flush_delay: Duration,
}

impl MonitorConfig {
    /// Default thresholds, with denser snapshot sampling when
    /// VIGIL_DEBUG is set.
    pub fn from_env() -> Self {
        let debug_mode = std::env::var("VIGIL_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = Self::default();
        if debug_mode {
            config.snapshot_interval = Duration::from_secs(2);
        }
        config
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            snapshot_interval: Duration::from_secs(10),
            max_faces: 2,
            iris_horizontal_threshold: 0.15,
            iris_vertical_threshold: 0.20,
            head_yaw_threshold: 20.0,
            head_pitch_threshold: 15.0,
            blink_threshold: 0.70,
            no_face_grace_secs: 2.0,
            debounce_window_secs: 3,
            event_batch_size: 5,
            flush_delay: Duration::from_secs(10),
        }
    }
}
