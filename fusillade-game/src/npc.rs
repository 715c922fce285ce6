//! Campaign NPC roster and the battle-local projection bridge.
//!
//! The roster is fixed: four companions with literal identities, created
//! once per campaign. Battles consume one-way projections (`Soldier`,
//! `Officer`) recomputed fresh at battle creation; battle outcomes flow
//! back through [`sync_battle_to_npcs`], which is total over every
//! combination of present/absent line slots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::battle::BattleState;
use crate::character::MilitaryRank;
use crate::constants::{NPC_EXPERIENCE_CAP, NPC_EXPERIENCE_PER_BATTLE, NPC_MORALE_MAX};
use crate::tiers::{MoraleThreshold, morale_threshold};

/// Role a companion occupies in the player's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcRole {
    Neighbour,
    Nco,
    Officer,
}

/// Persistent companion record, mutated only by battle sync and camp events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub role: NpcRole,
    pub personality: String,
    pub rank: MilitaryRank,
    pub relationship: i32,
    pub trust: i32,
    pub alive: bool,
    pub wounded: bool,
    pub morale: i32,
    pub morale_max: i32,
    pub valor: i32,
    /// Monotonically non-decreasing while alive, capped at 100.
    pub experience: i32,
}

impl Npc {
    fn new(
        id: &str,
        name: &str,
        role: NpcRole,
        personality: &str,
        rank: MilitaryRank,
        relationship: i32,
        trust: i32,
        morale: i32,
        valor: i32,
        experience: i32,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
            personality: personality.to_string(),
            rank,
            relationship,
            trust,
            alive: true,
            wounded: false,
            morale,
            morale_max: NPC_MORALE_MAX,
            valor,
            experience,
        }
    }
}

/// Create the fixed campaign roster.
///
/// Deterministic: two privates flanking the player, the company sergeant,
/// and the captain. Callable repeatedly for a fresh campaign.
#[must_use]
pub fn create_campaign_npcs() -> Vec<Npc> {
    vec![
        Npc::new(
            "pierre",
            "Pierre Caron",
            NpcRole::Neighbour,
            "steadfast",
            MilitaryRank::Private,
            55,
            50,
            80,
            55,
            20,
        ),
        Npc::new(
            "jean_baptiste",
            "Jean-Baptiste Moreau",
            NpcRole::Neighbour,
            "restless",
            MilitaryRank::Private,
            45,
            40,
            70,
            35,
            5,
        ),
        Npc::new(
            "duval",
            "Honoré Duval",
            NpcRole::Nco,
            "iron",
            MilitaryRank::Sergeant,
            35,
            60,
            90,
            70,
            60,
        ),
        Npc::new(
            "lefebvre",
            "Armand Lefebvre",
            NpcRole::Officer,
            "ambitious",
            MilitaryRank::Captain,
            25,
            45,
            85,
            65,
            75,
        ),
    ]
}

/// Coarsened rank vocabulary carried by a line soldier.
///
/// The mapping from [`MilitaryRank`] is intentionally narrow: anything
/// outside sergeant/corporal coarsens to private, officers included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoldierRank {
    #[default]
    Private,
    Corporal,
    Sergeant,
}

impl SoldierRank {
    #[must_use]
    pub const fn from_military_rank(rank: MilitaryRank) -> Self {
        match rank {
            MilitaryRank::Sergeant => Self::Sergeant,
            MilitaryRank::Corporal => Self::Corporal,
            MilitaryRank::Private
            | MilitaryRank::Lieutenant
            | MilitaryRank::Captain
            | MilitaryRank::Major
            | MilitaryRank::Colonel => Self::Private,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Corporal => "corporal",
            Self::Sergeant => "sergeant",
        }
    }
}

impl fmt::Display for SoldierRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-valued officer condition exposed to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfficerStatus {
    #[default]
    Steady,
    Wounded,
}

impl OfficerStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "Steady",
            Self::Wounded => "Wounded",
        }
    }
}

/// Battle-local projection of a neighbour NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soldier {
    pub npc_id: String,
    pub name: String,
    pub rank: SoldierRank,
    pub morale: i32,
    pub morale_max: i32,
    pub threshold: MoraleThreshold,
    pub alive: bool,
    pub wounded: bool,
    pub routing: bool,
    pub musket_loaded: bool,
    pub relationship: i32,
    pub experience: i32,
}

/// Battle-local projection of the commanding officer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Officer {
    /// Absent for the literal fallback officer substituted when the roster
    /// has no officer NPC.
    #[serde(default)]
    pub npc_id: Option<String>,
    pub name: String,
    pub abbreviation: String,
    pub mounted: bool,
    pub status: OfficerStatus,
    pub alive: bool,
    pub wounded: bool,
}

/// Officer rank abbreviation. Same narrow-mapping caveat as
/// [`SoldierRank::from_military_rank`].
#[must_use]
pub const fn officer_abbreviation(rank: MilitaryRank) -> &'static str {
    match rank {
        MilitaryRank::Captain => "Capt.",
        MilitaryRank::Lieutenant => "Lt.",
        MilitaryRank::Private
        | MilitaryRank::Corporal
        | MilitaryRank::Sergeant
        | MilitaryRank::Major
        | MilitaryRank::Colonel => "Sgt.",
    }
}

/// Project an NPC into the line-neighbour shape consumed by battle.
///
/// A fresh battle always starts with a loaded, non-routing soldier,
/// whatever the NPC's persisted state says.
#[must_use]
pub fn npc_to_soldier(npc: &Npc) -> Soldier {
    Soldier {
        npc_id: npc.id.clone(),
        name: npc.name.clone(),
        rank: SoldierRank::from_military_rank(npc.rank),
        morale: npc.morale,
        morale_max: npc.morale_max,
        threshold: morale_threshold(npc.morale, npc.morale_max),
        alive: npc.alive,
        wounded: npc.wounded,
        routing: false,
        musket_loaded: true,
        relationship: npc.relationship,
        experience: npc.experience,
    }
}

/// Project an NPC into the officer shape consumed by battle.
#[must_use]
pub fn npc_to_officer(npc: &Npc) -> Officer {
    Officer {
        npc_id: Some(npc.id.clone()),
        name: npc.name.clone(),
        abbreviation: officer_abbreviation(npc.rank).to_string(),
        mounted: matches!(npc.rank, MilitaryRank::Captain | MilitaryRank::Lieutenant),
        status: if npc.wounded {
            OfficerStatus::Wounded
        } else {
            OfficerStatus::Steady
        },
        alive: npc.alive,
        wounded: npc.wounded,
    }
}

/// One-way battle-to-roster write-back.
///
/// Null neighbour slots leave the corresponding NPC completely untouched.
/// A routing combatant persists with zero morale regardless of its reported
/// value. The officer slot is never null, so the officer NPC always syncs.
/// Surviving NPCs gain a flat experience increment capped at 100.
pub fn sync_battle_to_npcs(npcs: &mut [Npc], battle: &BattleState) {
    let slots = [
        battle.line.left_neighbour.as_ref(),
        battle.line.right_neighbour.as_ref(),
    ];
    for soldier in slots.into_iter().flatten() {
        if let Some(npc) = npcs.iter_mut().find(|npc| npc.id == soldier.npc_id) {
            npc.alive = soldier.alive;
            npc.wounded = soldier.wounded;
            npc.morale = if soldier.routing { 0 } else { soldier.morale };
        }
    }

    if let Some(officer_id) = battle.line.officer.npc_id.as_ref()
        && let Some(npc) = npcs.iter_mut().find(|npc| &npc.id == officer_id)
    {
        npc.alive = battle.line.officer.alive;
        npc.wounded = battle.line.officer.wounded;
    }

    for npc in npcs.iter_mut().filter(|npc| npc.alive) {
        npc.experience = (npc.experience + NPC_EXPERIENCE_PER_BATTLE).min(NPC_EXPERIENCE_CAP);
    }
}
