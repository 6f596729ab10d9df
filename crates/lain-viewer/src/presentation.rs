//! Mood to presentation lookup.

use colored::Color;
use lain_core::Mood;

/// How a line in a given mood is shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub label: &'static str,
    pub color: Color,
    /// Strength of the glitch effect, 0.0 to 1.0.
    pub glitch: f32,
    pub idle_animations: &'static [&'static str],
    pub speaking_animations: &'static [&'static str],
}

pub fn presentation(mood: Mood) -> Presentation {
    match mood {
        Mood::Neutral => Presentation {
            label: "neutral",
            color: Color::White,
            glitch: 0.0,
            idle_animations: &["breathing", "blink", "slight_head_tilt"],
            speaking_animations: &["talking_neutral", "mouth_movement"],
        },
        Mood::Curious => Presentation {
            label: "curious",
            color: Color::Cyan,
            glitch: 0.1,
            idle_animations: &["head_tilt", "questioning_look", "eye_movement"],
            speaking_animations: &["talking_curious", "thinking_gesture"],
        },
        Mood::Cryptic => Presentation {
            label: "cryptic",
            color: Color::Magenta,
            glitch: 0.6,
            idle_animations: &["mysterious_stare", "slow_blink", "glitch_effect"],
            speaking_animations: &["talking_cryptic", "eerie_movements", "digital_distortion"],
        },
        Mood::Melancholic => Presentation {
            label: "melancholic",
            color: Color::Blue,
            glitch: 0.2,
            idle_animations: &["downcast_gaze", "slow_blink"],
            speaking_animations: &["talking_soft", "mouth_movement"],
        },
        Mood::Excited => Presentation {
            label: "excited",
            color: Color::Yellow,
            glitch: 0.3,
            idle_animations: &["smile", "cheerful_blink"],
            speaking_animations: &["talking_happy", "excited_gestures"],
        },
        Mood::Distant => Presentation {
            label: "distant",
            color: Color::BrightBlack,
            glitch: 0.8,
            idle_animations: &["vacant_stare", "flicker"],
            speaking_animations: &["talking_distant", "digital_distortion"],
        },
    }
}
