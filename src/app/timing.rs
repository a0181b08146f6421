use std::time::{Duration, Instant};
use winit::window::Window;

const FALLBACK_FRAME: Duration = Duration::from_millis(16);

/// Frame delta for camera motion plus an fps readout in the window title.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: FALLBACK_FRAME.as_secs_f32(),
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => FALLBACK_FRAME,
        };
        self.last_frame_time = Some(now);
        // Long stalls (window drag, breakpoint) should not fling the camera.
        self.frame_dt = dt.as_secs_f32().min(0.1);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&format!(
                    "{} - {:.0} fps ({:.2} ms GPU submit)",
                    self.base_title, fps, self.render_ms
                ));
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }
}

/// One frame at the monitor's refresh rate, 60 Hz when unknown.
pub fn target_frame_duration(window: &Window) -> Duration {
    window
        .current_monitor()
        .and_then(|monitor| monitor.refresh_rate_millihertz())
        .map(|millihz| millihz as f32 / 1000.0)
        .filter(|hz| *hz > 1.0)
        .map(|hz| Duration::from_secs_f32(1.0 / hz))
        .unwrap_or(FALLBACK_FRAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_dt_tracks_elapsed_time() {
        let mut timing = FrameTiming::new("viewer".into());
        let start = Instant::now();
        timing.update(None, start);
        timing.update(None, start + Duration::from_millis(20));
        assert!((timing.frame_dt - 0.02).abs() < 1e-4);
    }

    #[test]
    fn frame_dt_is_capped_after_a_stall() {
        let mut timing = FrameTiming::new("viewer".into());
        let start = Instant::now();
        timing.update(None, start);
        timing.update(None, start + Duration::from_secs(3));
        assert!((timing.frame_dt - 0.1).abs() < 1e-6);
    }
}
