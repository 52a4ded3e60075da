//! Duration inference
//!
//! The keyword table is a heuristic. It never fails: a name matching no
//! category gets [`DEFAULT_FRAMES`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Frame rate the category table is expressed in
pub const TABLE_FPS: u32 = 30;

/// Fallback when no keyword matches
pub const DEFAULT_FRAMES: u32 = 300;

/// Keyword categories, checked in order against the lowercased module name
const CATEGORIES: &[(&[&str], u32)] = &[
    (&["showcase", "demo"], 600),
    (&["intro", "outro", "title"], 150),
    (&["transition"], 60),
    (&["loading", "loader", "spinner"], 180),
    (&["test"], 90),
    (&["background", "loop"], 300),
];

static DECLARED_RE: Lazy<Regex> = Lazy::new(|| {
    crate::pattern(r"(?m)^\s*export\s+const\s+durationInFrames\s*(?::\s*number\s*)?=\s*(\d+)")
});

/// Scale a frame count from the table rate to `fps`
fn scale(frames_at_table_fps: u32, fps: u32) -> u32 {
    let scaled = u64::from(frames_at_table_fps) * u64::from(fps) / u64::from(TABLE_FPS);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Guess a duration from keywords in the module name
pub fn infer_frames(module_name: &str, fps: u32) -> u32 {
    let lowered = module_name.to_ascii_lowercase();
    let frames = CATEGORIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, frames)| *frames)
        .unwrap_or(DEFAULT_FRAMES);
    scale(frames, fps)
}

/// Frame count the module source declares for itself, if any
pub fn declared_frames(source: &str) -> Option<u32> {
    DECLARED_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|frames| *frames > 0)
}

/// Convert a duration hint in seconds to frames
pub fn hint_frames(seconds: f64, fps: u32) -> Option<u32> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let frames = (seconds * f64::from(fps)).round();
    (frames >= 1.0 && frames <= f64::from(u32::MAX)).then_some(frames as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories() {
        assert_eq!(infer_frames("ProductShowcase", 30), 600);
        assert_eq!(infer_frames("IntroCard", 30), 150);
        assert_eq!(infer_frames("WipeTransition", 30), 60);
        assert_eq!(infer_frames("LoadingDots", 30), 180);
        assert_eq!(infer_frames("TestPattern", 30), 90);
        assert_eq!(infer_frames("GradientBackground", 30), 300);
        assert_eq!(infer_frames("BouncingBall", 30), DEFAULT_FRAMES);
    }

    #[test]
    fn test_frames_scale_with_fps() {
        assert_eq!(infer_frames("IntroCard", 60), 300);
        assert_eq!(infer_frames("IntroCard", 24), 120);
    }

    #[test]
    fn test_declared_frames() {
        assert_eq!(
            declared_frames("export const durationInFrames = 120;\nexport const X = 1;"),
            Some(120)
        );
        assert_eq!(declared_frames("export const durationInFrames: number = 45"), Some(45));
        assert_eq!(declared_frames("const durationInFrames = 45;"), None);
        assert_eq!(declared_frames("export const durationInFrames = 0;"), None);
    }

    #[test]
    fn test_hint_frames() {
        assert_eq!(hint_frames(8.0, 30), Some(240));
        assert_eq!(hint_frames(2.5, 30), Some(75));
        assert_eq!(hint_frames(0.0, 30), None);
        assert_eq!(hint_frames(f64::NAN, 30), None);
    }
}
