use crate::types::Time;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub match_points:     u32,
    pub mismatch_penalty: u32,
    /// Consecutive matches at most this far apart escalate the combo.
    pub combo_window:     Time,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_points:     100,
            mismatch_penalty: 25,
            combo_window:     2.0,
        }
    }
}

/// How a restored snapshot rebuilds the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRestore {
    /// Assign the saved score. Combo starts fresh.
    Direct,
    /// Reset, then replay matches at one instant until the saved score is
    /// reached. Reproduces the legacy loader, including its overshoot.
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPreset {
    Small3x3,
    Classic4x4,
    Medium5x5,
    Large5x6,
}

impl LayoutPreset {
    pub const ALL: [LayoutPreset; 4] = [
        Self::Small3x3,
        Self::Classic4x4,
        Self::Medium5x5,
        Self::Large5x6,
    ];

    /// `(rows, cols)`.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Small3x3   => (3, 3),
            Self::Classic4x4 => (4, 4),
            Self::Medium5x5  => (5, 5),
            Self::Large5x6   => (5, 6),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "3x3" | "small3x3"   => Some(Self::Small3x3),
            "4x4" | "classic4x4" => Some(Self::Classic4x4),
            "5x5" | "medium5x5"  => Some(Self::Medium5x5),
            "5x6" | "large5x6"   => Some(Self::Large5x6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub scoring:              ScoringConfig,
    /// Delay before a mismatched pair flips back.
    pub mismatch_close_delay: Time,
    pub flip_duration:        Time,
    pub fade_duration:        Time,
    /// When true the engine completes its own transitions after their
    /// duration. When false a presentation layer must report completion.
    pub self_timed:           bool,
    pub score_restore:        ScoreRestore,
    pub default_layout:       LayoutPreset,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scoring:              ScoringConfig::default(),
            mismatch_close_delay: 0.6,
            flip_duration:        0.25,
            fade_duration:        0.25,
            self_timed:           true,
            score_restore:        ScoreRestore::Direct,
            default_layout:       LayoutPreset::Classic4x4,
        }
    }
}

impl GameConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with instant transitions for use in tests.
    pub fn default_test() -> Self {
        Self {
            flip_duration: 0.0,
            fade_duration: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let durations = [
            ("scoring.combo_window", self.scoring.combo_window),
            ("mismatch_close_delay", self.mismatch_close_delay),
            ("flip_duration", self.flip_duration),
            ("fade_duration", self.fade_duration),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{name} must be a non-negative number, got {value}");
            }
        }
        Ok(())
    }
}
