//! Story-beat data for charge encounters.
//!
//! Each battle part plays one or more scripted story beats between the last
//! volley and the melee. The table is data-driven so the narrative can be
//! edited without touching resolver code, with code-literal defaults as the
//! fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single scripted story beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBeat {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub lines: Vec<String>,
    /// Morale swing applied to the player when the beat plays.
    #[serde(default)]
    pub morale_delta: i32,
}

/// Errors raised while loading story data.
#[derive(Debug, Error)]
pub enum StoryDataError {
    #[error("story data failed to parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("story data contains no beats")]
    NoBeats,
}

/// Container for the charge-encounter beat table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoryData {
    pub beats: Vec<StoryBeat>,
}

impl StoryData {
    /// Create empty story data (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self { beats: Vec::new() }
    }

    /// Load story data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or contains no beats.
    pub fn from_json(json: &str) -> Result<Self, StoryDataError> {
        let data: Self = serde_json::from_str(json)?;
        if data.beats.is_empty() {
            return Err(StoryDataError::NoBeats);
        }
        Ok(data)
    }

    /// Built-in beat table covering the three battle parts.
    #[must_use]
    pub fn default_config() -> Self {
        let beat = |id: &str, title: &str, lines: &[&str], morale_delta: i32| StoryBeat {
            id: id.to_string(),
            title: title.to_string(),
            lines: lines.iter().map(ToString::to_string).collect(),
            morale_delta,
        };
        Self {
            beats: vec![
                beat(
                    "column_advance",
                    "The Column Advances",
                    &[
                        "Drums roll somewhere behind the smoke.",
                        "A column in white crossbelts climbs out of the gully, bayonets forward.",
                    ],
                    -4,
                ),
                beat(
                    "officer_rallies",
                    "The Captain Rides the Line",
                    &[
                        "The captain walks his horse along the front rank as if on parade.",
                        "Someone down the file starts to cheer, and the cheer spreads.",
                    ],
                    6,
                ),
                beat(
                    "guns_fall_silent",
                    "The Guns Fall Silent",
                    &[
                        "The battery behind the orchard stops firing.",
                        "In the sudden quiet you can hear the enemy sergeants shouting cadence.",
                    ],
                    -2,
                ),
            ],
        }
    }

    /// Beat for a 1-based charge-encounter index, clamped to the table.
    #[must_use]
    pub fn beat_for_encounter(&self, encounter: usize) -> Option<&StoryBeat> {
        if self.beats.is_empty() {
            return None;
        }
        let index = encounter.saturating_sub(1).min(self.beats.len() - 1);
        self.beats.get(index)
    }
}
