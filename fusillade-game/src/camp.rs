//! Camp and downtime system surface.
//!
//! The core only owns the camp's data shape and its constructor; camp event
//! resolution lives with the external camp collaborator. Meters stay on the
//! 0-100 percentage scale so the camp-to-battle sync can copy them back
//! into the persistent character directly.

use serde::{Deserialize, Serialize};

use crate::character::PlayerCharacter;
use crate::npc::Npc;

/// Why the company is in camp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampContext {
    /// The very first camp, before any battle. Leaving it does not consume
    /// a campaign battle slot.
    PreBattle,
    #[default]
    PostBattle,
    March,
}

impl CampContext {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreBattle => "pre_battle",
            Self::PostBattle => "post_battle",
            Self::March => "march",
        }
    }
}

/// A camp event surfaced to the player, resolved externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampEvent {
    pub id: String,
    pub text: String,
}

/// State handed to the camp collaborator when the battle phase ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampState {
    pub camp_id: String,
    pub context: CampContext,
    pub location: String,
    pub days: u32,
    /// Player meters, 0-100.
    pub health: i32,
    pub morale: i32,
    pub stamina: i32,
    pub actions_remaining: u8,
    pub actions_total: u8,
    #[serde(default)]
    pub pending_event: Option<CampEvent>,
    pub log: Vec<String>,
    /// Companion morale snapshot, for the camp's fireside scenes.
    #[serde(default)]
    pub npc_morale: Vec<(String, i32)>,
}

/// Number of camp actions a downtime stretch offers per day.
const CAMP_ACTIONS_PER_DAY: u8 = 2;

/// Construct a camp from the persistent character and roster.
#[must_use]
pub fn create_camp_state(
    player: &PlayerCharacter,
    npcs: &[Npc],
    location: &str,
    days: u32,
    context: CampContext,
) -> CampState {
    let actions_total = CAMP_ACTIONS_PER_DAY.saturating_mul(u8::try_from(days.min(7)).unwrap_or(1));
    CampState {
        camp_id: format!("{}-{}", context.as_str(), location.to_lowercase().replace(' ', "-")),
        context,
        location: location.to_string(),
        days,
        health: player.health,
        morale: player.morale,
        stamina: player.stamina,
        actions_remaining: actions_total,
        actions_total,
        pending_event: None,
        log: vec![format!("The company makes camp near {location}.")],
        npc_morale: npcs
            .iter()
            .filter(|npc| npc.alive)
            .map(|npc| (npc.id.clone(), npc.morale))
            .collect(),
    }
}
