use std::path::PathBuf;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

/// How the next wallpaper is picked from the current image set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationOrder {
    #[default]
    Random,
    Sequential,
}

impl std::fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationOrder::Random => write!(f, "random"),
            RotationOrder::Sequential => write!(f, "sequential"),
        }
    }
}

/// Loop-local rotation state. Created when the loop starts, dropped when it
/// ends; nothing here outlives the process.
#[derive(Debug, Clone, Default)]
pub struct RotationCursor {
    current_index: usize,
    empty_folder_streak: u32,
    failure_streak: u32,
}

impl RotationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the image for this tick. `images` must not be empty.
    ///
    /// Sequential mode walks the set by index and wraps to 0 when the index
    /// runs past the end, including when the folder shrank since last tick.
    /// The index is not re-derived from the previous image, so files added or
    /// removed mid-rotation can shift which image comes next.
    pub fn select<'a, R: Rng + ?Sized>(
        &mut self,
        order: RotationOrder,
        images: &'a [PathBuf],
        rng: &mut R,
    ) -> Option<&'a PathBuf> {
        match order {
            RotationOrder::Random => images.choose(rng),
            RotationOrder::Sequential => {
                if images.is_empty() {
                    return None;
                }
                if self.current_index >= images.len() {
                    self.current_index = 0;
                }
                let image = &images[self.current_index];
                self.current_index += 1;
                Some(image)
            }
        }
    }

    /// Records an empty poll. Returns true only on the first one of a streak.
    pub fn record_empty(&mut self) -> bool {
        self.empty_folder_streak = self.empty_folder_streak.saturating_add(1);
        self.empty_folder_streak == 1
    }

    /// Records a non-empty poll, ending any empty streak.
    pub fn record_images_found(&mut self) {
        if self.empty_folder_streak > 0 {
            log::info!(
                "Wallpaper folder has images again after {} empty polls",
                self.empty_folder_streak
            );
            self.empty_folder_streak = 0;
        }
    }

    /// Records a failed application. Returns true only on the first failure of a streak.
    pub fn record_failure(&mut self) -> bool {
        self.failure_streak = self.failure_streak.saturating_add(1);
        self.failure_streak == 1
    }

    pub fn record_success(&mut self) {
        self.failure_streak = 0;
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn empty_folder_streak(&self) -> u32 {
        self.empty_folder_streak
    }
}
