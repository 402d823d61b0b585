//! What the page shows: the live animation or a frozen capture, and the
//! clock driving the animation.

use crate::export::ExportedImage;

/// The preview either shows the live canvas or an exported still laid over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewMode {
    #[default]
    Live,
    Captured(ExportedImage),
}

impl PreviewMode {
    pub fn is_live(&self) -> bool {
        matches!(self, PreviewMode::Live)
    }

    pub fn captured(&self) -> Option<&ExportedImage> {
        match self {
            PreviewMode::Captured(image) => Some(image),
            PreviewMode::Live => None,
        }
    }
}

/// Longest step a single frame may advance, in seconds. Keeps the animation
/// from jumping after the tab was in the background.
pub const MAX_FRAME_STEP: f64 = 0.1;

/// Time accumulator advanced once per animation frame, scaled by the
/// user's speed setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    time: f32,
    speed: f32,
    last_frame_ms: Option<f64>,
}

impl AnimationClock {
    pub fn new(speed: f32) -> Self {
        Self {
            time: 0.0,
            speed,
            last_frame_ms: None,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Advances to the frame timestamp `now_ms` (milliseconds, as passed to
    /// `requestAnimationFrame` callbacks) and returns the new time. The first
    /// frame only records the timestamp.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        if let Some(last) = self.last_frame_ms {
            let step = ((now_ms - last) / 1000.0).clamp(0.0, MAX_FRAME_STEP);
            self.time += (step * f64::from(self.speed)) as f32;
        }
        self.last_frame_ms = Some(now_ms);
        self.time
    }
}
