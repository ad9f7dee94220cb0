//! Splash screen state, geometry and presentation loop
//!
//! The window itself is drawn by a [`SplashRenderer`]. The state model here
//! owns progress, status text and the two timers (auto-progress and
//! auto-close) so that any renderer behaves the same way.

use log::{debug, info};
use std::time::Duration;

use crate::exceptions::Result;
use crate::format::SplashLayout;

pub const DEFAULT_STATUS: &str = "Initializing...";

/// Auto-progress timer period
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(20);

/// Substituted for a non-positive launch time
pub const DEFAULT_LAUNCH_TIME_MS: i32 = 10_000;

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 200;

// Fractions of the window height
const PROGRESS_HEIGHT_PERCENT: f32 = 0.02;
const BASE_MARGIN_PERCENT: f32 = 0.05;
const TITLE_HEIGHT_PERCENT: f32 = 0.25;
const VERSION_HEIGHT_PERCENT: f32 = 0.15;
const STATUS_HEIGHT_PERCENT: f32 = 0.12;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy)]
struct AutoProgress {
    step: f64,
    interval: Duration,
    pending: Duration,
}

/// Splash state driven by elapsed time
#[derive(Debug, Clone)]
pub struct SplashScreen {
    title: String,
    version: String,
    show_progress: bool,
    show_progress_text: bool,
    progress: f64,
    status: String,
    auto_progress: Option<AutoProgress>,
    auto_close: Option<Duration>,
    elapsed: Duration,
    open: bool,
}

impl SplashScreen {
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        show_progress: bool,
        show_progress_text: bool,
    ) -> Self {
        SplashScreen {
            title: title.into(),
            version: version.into(),
            show_progress,
            show_progress_text,
            progress: 0.0,
            status: DEFAULT_STATUS.to_string(),
            auto_progress: None,
            auto_close: None,
            elapsed: Duration::ZERO,
            open: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn show_progress_text(&self) -> bool {
        self.show_progress_text
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn status_text(&self) -> &str {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_auto_progressing(&self) -> bool {
        self.auto_progress.is_some()
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 100.0);
    }

    pub fn set_status_text(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }

    /// Set an integral progress value and, optionally, the status text
    pub fn update_progress(&mut self, progress: i32, text: Option<&str>) {
        self.progress = f64::from(progress.clamp(0, 100));
        if let Some(text) = text {
            self.status = text.to_string();
        }
    }

    /// Add `step` percent every `interval` until 100 is reached
    pub fn start_auto_progress(&mut self, step: f64, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        self.auto_progress = Some(AutoProgress {
            step,
            interval,
            pending: Duration::ZERO,
        });
    }

    pub fn stop_auto_progress(&mut self) {
        self.auto_progress = None;
    }

    /// Close once this much time has passed since the splash was shown
    pub fn set_auto_close_delay(&mut self, delay: Duration) {
        self.auto_close = Some(delay);
    }

    pub fn close(&mut self) {
        self.stop_auto_progress();
        self.open = false;
    }

    /// Let `delta` of wall time pass, firing any timers that fall due
    pub fn advance(&mut self, delta: Duration) {
        if !self.open {
            return;
        }
        self.elapsed += delta;

        if let Some(mut auto) = self.auto_progress {
            auto.pending += delta;
            let mut finished = false;
            while auto.pending >= auto.interval && !finished {
                auto.pending -= auto.interval;
                if self.progress < 100.0 {
                    self.progress = (self.progress + auto.step).min(100.0);
                    self.status = format!("Loading... {:>6.2}%", self.progress);
                }
                finished = self.progress >= 100.0;
            }
            self.auto_progress = (!finished).then_some(auto);
        }

        if self.auto_close.is_some_and(|delay| self.elapsed >= delay) {
            debug!("🖼️ Splash auto-close after {:?}", self.elapsed);
            self.close();
        }
    }
}

/// Auto-progress timing for an estimated launch time:
/// `(step, interval, auto-close delay)`
pub fn progress_schedule(launch_time_ms: i32) -> (f64, Duration, Duration) {
    let launch_time = if launch_time_ms <= 0 {
        DEFAULT_LAUNCH_TIME_MS
    } else {
        launch_time_ms
    };
    let interval_ms = PROGRESS_INTERVAL.as_millis() as f64;
    let step = 100.0 * interval_ms / f64::from(launch_time);
    let close_after = Duration::from_millis(launch_time as u64 * 3 / 2);
    (step, PROGRESS_INTERVAL, close_after)
}

/// Axis-aligned rectangle in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    fn centered(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Rect {
            x: center_x - width / 2.0,
            y: center_y - height / 2.0,
            width,
            height,
        }
    }
}

/// Where the splash texts and the progress bar go
#[derive(Debug, Clone, PartialEq)]
pub struct SplashGeometry {
    pub width: u32,
    pub height: u32,
    pub title: Rect,
    pub version: Rect,
    pub status: Rect,
    pub progress: Rect,
    pub title_font: f32,
    pub version_font: f32,
    pub status_font: f32,
}

impl SplashGeometry {
    /// Lay out a `width` x `height` window from percentage anchors
    pub fn compute(width: u32, height: u32, layout: &SplashLayout) -> Self {
        let w = width as f32;
        let h = height as f32;
        let margin = h * BASE_MARGIN_PERCENT;
        let text_width = w - 2.0 * margin;
        let progress_height = (h * PROGRESS_HEIGHT_PERCENT).trunc();
        let anchor = |x: f32, y: f32| (w * x / 100.0, h * y / 100.0);

        let (title_x, title_y) = anchor(layout.title_x, layout.title_y);
        let (version_x, version_y) = anchor(layout.version_x, layout.version_y);
        let (status_x, status_y) = anchor(layout.status_x, layout.status_y);

        SplashGeometry {
            width,
            height,
            title: Rect::centered(title_x, title_y, text_width, h * TITLE_HEIGHT_PERCENT),
            version: Rect::centered(version_x, version_y, text_width, h * VERSION_HEIGHT_PERCENT),
            status: Rect::centered(status_x, status_y, text_width, h * STATUS_HEIGHT_PERCENT),
            progress: Rect {
                x: 0.0,
                y: h - progress_height,
                width: w,
                height: progress_height,
            },
            title_font: h * layout.title_font / 100.0,
            version_font: h * layout.version_font / 100.0,
            status_font: h * layout.status_font / 100.0,
        }
    }

    /// Filled part of the progress bar
    pub fn progress_fill(&self, progress: f64) -> Rect {
        Rect {
            width: self.progress.width * (progress.clamp(0.0, 100.0) as f32) / 100.0,
            ..self.progress
        }
    }
}

/// Width and height from a PNG's IHDR chunk
pub fn png_dimensions(image: &[u8]) -> Option<(u32, u32)> {
    if image.len() < 24 || !image.starts_with(PNG_SIGNATURE) || &image[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(image[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(image[20..24].try_into().ok()?);
    (width > 0 && height > 0).then_some((width, height))
}

/// Window size for a splash image, falling back to 600x200
pub fn window_size(image: &[u8]) -> (u32, u32) {
    png_dimensions(image).unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT))
}

/// Draws a [`SplashScreen`]
pub trait SplashRenderer {
    fn show(&mut self, image: &[u8], geometry: &SplashGeometry) -> Result<()>;
    fn render(&mut self, screen: &SplashScreen);
    fn close(&mut self);
}

/// Renderer that reports splash progress through the log
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    last_decile: Option<u32>,
    frames: u64,
}

impl LoggingRenderer {
    pub fn new() -> Self {
        LoggingRenderer::default()
    }

    /// Number of `render` calls so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl SplashRenderer for LoggingRenderer {
    fn show(&mut self, image: &[u8], geometry: &SplashGeometry) -> Result<()> {
        info!(
            "🖼️ Splash {}x{} ({} byte image)",
            geometry.width,
            geometry.height,
            image.len()
        );
        Ok(())
    }

    fn render(&mut self, screen: &SplashScreen) {
        self.frames += 1;
        let decile = (screen.progress() / 10.0).floor() as u32;
        if self.last_decile != Some(decile) {
            self.last_decile = Some(decile);
            debug!(
                "🖼️ {} {} | {}",
                screen.title(),
                screen.version(),
                screen.status_text()
            );
        }
    }

    fn close(&mut self) {
        debug!("🖼️ Splash closed after {} frames", self.frames);
    }
}

/// Show the splash and run it until it closes itself, or until
/// `interrupted` returns true.
///
/// `sleep` is called once per timer period; the launcher passes
/// `std::thread::sleep`. `interrupted` is polled after every period.
pub fn present<R, S, I>(
    renderer: &mut R,
    screen: &mut SplashScreen,
    image: &[u8],
    layout: &SplashLayout,
    launch_time_ms: i32,
    mut sleep: S,
    mut interrupted: I,
) -> Result<()>
where
    R: SplashRenderer + ?Sized,
    S: FnMut(Duration),
    I: FnMut() -> bool,
{
    let (width, height) = window_size(image);
    let geometry = SplashGeometry::compute(width, height, layout);
    renderer.show(image, &geometry)?;

    let (step, interval, close_after) = progress_schedule(launch_time_ms);
    screen.start_auto_progress(step, interval);
    screen.set_auto_close_delay(close_after);

    renderer.render(screen);
    while screen.is_open() {
        sleep(interval);
        if interrupted() {
            debug!("Splash interrupted at {:.2}%", screen.progress());
            screen.close();
            break;
        }
        screen.advance(interval);
        renderer.render(screen);
    }
    renderer.close();
    Ok(())
}
