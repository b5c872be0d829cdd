use serde::Serialize;
use crate::models::MoodStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodPreset {
    pub name: &'static str,
    pub emoji: &'static str,
}

pub const MOOD_PRESETS: &[MoodPreset] = &[
    MoodPreset { name: "Happy", emoji: "😊" },
    MoodPreset { name: "Tired", emoji: "😴" },
    MoodPreset { name: "Chill", emoji: "😎" },
    MoodPreset { name: "Curious", emoji: "🤔" },
    MoodPreset { name: "Excited", emoji: "🎉" },
    MoodPreset { name: "Focused", emoji: "📚" },
];

/// Look up a preset by name, case-insensitively
pub fn find_mood(name: &str) -> Option<&'static MoodPreset> {
    MOOD_PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
}

impl MoodPreset {
    /// Build a status stamped with the current time; the preset name is the
    /// status text unless one is given
    pub fn status(&self, text: Option<&str>) -> MoodStatus {
        let status = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.name);

        MoodStatus {
            emoji: self.emoji.to_string(),
            name: self.name.to_string(),
            status: status.to_string(),
            last_updated: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_mood_case_insensitive() {
        assert_eq!(find_mood("chill").map(|m| m.emoji), Some("😎"));
        assert_eq!(find_mood(" FOCUSED ").map(|m| m.name), Some("Focused"));
        assert!(find_mood("grumpy").is_none());
    }

    #[test]
    fn test_status_text_defaults_to_name() {
        let preset = find_mood("tired").unwrap();

        assert_eq!(preset.status(None).status, "Tired");
        assert_eq!(preset.status(Some("  ")).status, "Tired");
        assert_eq!(preset.status(Some("exam week")).status, "exam week");
    }
}
