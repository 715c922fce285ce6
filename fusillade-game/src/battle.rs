//! Transient battle state and its single construction path.
//!
//! A `BattleState` is derived from the persistent [`PlayerCharacter`] at
//! battle start and lives for exactly one encounter. Percentage meters are
//! scaled onto absolute pools here; the reverse conversion happens in the
//! battle-to-camp sync. All pool writes go through setters that clamp and
//! recompute the cached tier fields atomically, so a tier field is never
//! stale with respect to its pool.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::character::{Attributes, MilitaryRank, PlayerCharacter, Reputation};
use crate::constants::{
    ENEMY_STARTING_INTEGRITY, ENEMY_STARTING_RANGE, ENEMY_STARTING_STRENGTH, HEALTH_POOL_BASE,
    MORALE_SCALE_MAX, STAMINA_POOL_BASE, STAMINA_POOL_MULT,
};
use crate::melee::MeleeState;
use crate::npc::{Npc, NpcRole, Officer, OfficerStatus, Soldier, npc_to_officer, npc_to_soldier};
use crate::numbers::pool_from_pct;
use crate::tiers::{
    FatigueTier, HealthState, MoraleThreshold, fatigue_tier, health_state, morale_threshold,
};

/// Phase of a single battle encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BattlePhase {
    #[default]
    Intro,
    Line,
    Story,
    Melee,
    Ended,
}

/// Four-step cycle a line-combat turn moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrillStep {
    #[default]
    Present,
    Fire,
    Endure,
    Load,
}

impl DrillStep {
    /// Next step in the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Present => Self::Fire,
            Self::Fire => Self::Endure,
            Self::Endure => Self::Load,
            Self::Load => Self::Present,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Fire => "fire",
            Self::Endure => "endure",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for DrillStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a narrative log entry for presentation replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Order,
    Result,
    Action,
    Event,
    Narrative,
}

/// One entry in the append-only battle log.
///
/// This log is the single source of truth the presentation layer replays
/// from; it is never truncated during play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEntry {
    pub turn: u32,
    pub text: String,
    pub kind: EntryKind,
}

/// Terminal classification of a battle. Exactly one variant at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BattleOutcome {
    #[default]
    Pending,
    Victory,
    Defeat,
    Rout,
    Survived,
}

/// Morale adjustment queued during a volley and applied at the Load step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleShift {
    pub amount: i32,
    pub reason: String,
}

/// Expanded in-battle player record with absolute pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattlePlayer {
    pub name: String,
    pub rank: MilitaryRank,
    pub attributes: Attributes,
    pub health: i32,
    pub max_health: i32,
    /// Morale stays on the fixed 0-100 scale even in battle.
    pub morale: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    // Cached tiers, recomputed by the pool setters.
    pub health_state: HealthState,
    pub morale_threshold: MoraleThreshold,
    pub fatigue_tier: FatigueTier,
    pub musket_loaded: bool,
    pub alive: bool,
    pub routing: bool,
    pub fumbled_load: bool,
    pub duck_count: u32,
    pub canteen_uses: u8,
    pub grace: u8,
    pub reputation: Reputation,
    pub nco_approval: i32,
    pub shots_fired: u32,
}

impl BattlePlayer {
    /// Set the health pool, clamping and recomputing the cached tier.
    pub fn set_health(&mut self, value: i32) {
        self.health = value.clamp(0, self.max_health);
        self.health_state = health_state(self.health, self.max_health);
    }

    /// Set morale, clamping to the fixed scale and recomputing the tier.
    pub fn set_morale(&mut self, value: i32) {
        self.morale = value.clamp(0, MORALE_SCALE_MAX);
        self.morale_threshold = morale_threshold(self.morale, MORALE_SCALE_MAX);
    }

    /// Set the stamina pool, clamping and recomputing the fatigue tier.
    pub fn set_stamina(&mut self, value: i32) {
        self.stamina = value.clamp(0, self.max_stamina);
        self.fatigue_tier = fatigue_tier(self.stamina, self.max_stamina);
    }

    /// Fraction of stamina already spent, in `[0, 1]`.
    #[must_use]
    pub fn fatigue_ratio(&self) -> f64 {
        1.0 - crate::numbers::pool_ratio(self.stamina, self.max_stamina)
    }

    #[must_use]
    pub fn morale_ratio(&self) -> f64 {
        crate::numbers::pool_ratio(self.morale, MORALE_SCALE_MAX)
    }
}

/// The player's file: both neighbours, the officer, and line aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineState {
    /// Null only when the corresponding NPC is absent from the roster.
    pub left_neighbour: Option<Soldier>,
    pub right_neighbour: Option<Soldier>,
    pub officer: Officer,
    pub line_integrity: i32,
    pub line_morale: MoraleThreshold,
    pub drums_playing: bool,
    pub nco_present: bool,
    /// Reset at the top of every turn.
    pub casualties_this_turn: u32,
}

/// Quality tier of the opposing force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnemyQuality {
    Conscript,
    #[default]
    Line,
    Veteran,
}

/// Aggregate state of the opposing force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyForce {
    /// Distance to the enemy line in paces.
    pub range: i32,
    /// Remaining effective strength as a percentage.
    pub strength: i32,
    pub quality: EnemyQuality,
    pub morale: MoraleThreshold,
    pub line_integrity: i32,
    pub artillery: bool,
    pub cavalry_threat: bool,
}

impl Default for EnemyForce {
    fn default() -> Self {
        Self {
            range: ENEMY_STARTING_RANGE,
            strength: ENEMY_STARTING_STRENGTH,
            quality: EnemyQuality::Line,
            morale: MoraleThreshold::Steady,
            line_integrity: ENEMY_STARTING_INTEGRITY,
            artillery: false,
            cavalry_threat: false,
        }
    }
}

/// Transient state of one battle encounter.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub phase: BattlePhase,
    pub turn: u32,
    pub drill_step: DrillStep,
    /// 1-based index into the volley table for the current battle part.
    pub scripted_volley: usize,
    /// Campaign-arc stage selector, 1-3.
    pub battle_part: u8,
    /// 1-based index into the story-beat table; 0 before the first beat.
    pub charge_encounter: usize,
    pub player: BattlePlayer,
    pub line: LineState,
    pub enemy: EnemyForce,
    /// Present if and only if `phase == BattlePhase::Melee`.
    #[serde(default)]
    pub melee: Option<MeleeState>,
    #[serde(default)]
    pub wagon_damage: i32,
    #[serde(default)]
    pub wagon_detonated: bool,
    #[serde(default)]
    pub mercy_shown: u32,
    #[serde(default)]
    pub volleys_fired: u32,
    #[serde(default)]
    pub glory_earned: i32,
    pub battle_over: bool,
    pub outcome: BattleOutcome,
    pub log: Vec<NarrativeEntry>,
    #[serde(default)]
    pub available_actions: Vec<String>,
    #[serde(default)]
    pub pending_morale_changes: Vec<MoraleShift>,
}

const fn clamp_stat(value: i32) -> i32 {
    if value < 0 {
        0
    } else if value > 100 {
        100
    } else {
        value
    }
}

/// Absolute health capacity for a constitution score.
#[must_use]
pub const fn health_capacity(constitution: i32) -> i32 {
    HEALTH_POOL_BASE + clamp_stat(constitution)
}

/// Absolute stamina capacity for an endurance score.
///
/// Deliberately much larger than the health pool so a melee's worth of
/// actions fits inside it.
#[must_use]
pub const fn stamina_capacity(endurance: i32) -> i32 {
    (STAMINA_POOL_BASE + clamp_stat(endurance)) * STAMINA_POOL_MULT
}

fn fallback_officer() -> Officer {
    Officer {
        npc_id: None,
        name: "Lucien Brassard".to_string(),
        abbreviation: "Lt.".to_string(),
        mounted: true,
        status: OfficerStatus::Steady,
        alive: true,
        wounded: false,
    }
}

impl BattleState {
    /// Construct a battle from the persistent character and roster.
    ///
    /// This is the only way to produce a valid `BattleState`. Pure given
    /// its inputs; pool percentages are scaled onto absolute capacities and
    /// every cached tier is recomputed from the scaled pools.
    #[must_use]
    pub fn from_character(pc: &PlayerCharacter, npcs: &[Npc]) -> Self {
        let max_health = health_capacity(pc.attributes.constitution);
        let max_stamina = stamina_capacity(pc.attributes.endurance);

        let mut player = BattlePlayer {
            name: pc.name.clone(),
            rank: pc.rank,
            attributes: pc.attributes,
            health: 0,
            max_health,
            morale: 0,
            stamina: 0,
            max_stamina,
            health_state: HealthState::Unhurt,
            morale_threshold: MoraleThreshold::Steady,
            fatigue_tier: FatigueTier::Fresh,
            musket_loaded: true,
            alive: true,
            routing: false,
            fumbled_load: false,
            duck_count: 0,
            canteen_uses: crate::constants::CANTEEN_STARTING_USES,
            grace: pc.grace,
            reputation: pc.reputation,
            nco_approval: pc.nco_approval,
            shots_fired: 0,
        };
        player.set_health(pool_from_pct(pc.health, max_health));
        player.set_morale(pc.morale);
        player.set_stamina(pool_from_pct(pc.stamina, max_stamina));

        let mut neighbours = npcs
            .iter()
            .filter(|npc| npc.role == NpcRole::Neighbour)
            .map(npc_to_soldier);
        let left_neighbour = neighbours.next();
        let right_neighbour = neighbours.next();
        let officer = npcs
            .iter()
            .find(|npc| npc.role == NpcRole::Officer)
            .map_or_else(fallback_officer, npc_to_officer);
        let nco_present = npcs
            .iter()
            .any(|npc| npc.role == NpcRole::Nco && npc.alive);

        let line = LineState {
            left_neighbour,
            right_neighbour,
            officer,
            line_integrity: 100,
            line_morale: MoraleThreshold::Steady,
            drums_playing: true,
            nco_present,
            casualties_this_turn: 0,
        };

        Self {
            phase: BattlePhase::Intro,
            turn: 0,
            drill_step: DrillStep::Present,
            scripted_volley: 1,
            battle_part: 1,
            charge_encounter: 0,
            player,
            line,
            enemy: EnemyForce::default(),
            melee: None,
            wagon_damage: 0,
            wagon_detonated: false,
            mercy_shown: 0,
            volleys_fired: 0,
            glory_earned: 0,
            battle_over: false,
            outcome: BattleOutcome::Pending,
            log: Vec::new(),
            available_actions: Vec::new(),
            pending_morale_changes: Vec::new(),
        }
    }

    /// Stamp the campaign-arc stage onto a fresh battle (clamped 1-3).
    #[must_use]
    pub fn with_battle_part(mut self, part: u8) -> Self {
        self.battle_part = part.clamp(1, 3);
        self
    }

    /// Append a narrative entry at the current turn.
    pub fn push_log(&mut self, kind: EntryKind, text: impl Into<String>) {
        self.log.push(NarrativeEntry {
            turn: self.turn,
            text: text.into(),
            kind,
        });
    }

    /// Queue a morale shift for application at the Load step.
    pub fn queue_morale_shift(&mut self, amount: i32, reason: &str) {
        self.pending_morale_changes.push(MoraleShift {
            amount,
            reason: reason.to_string(),
        });
    }

    /// Apply and drain queued morale shifts.
    pub fn apply_pending_morale(&mut self) {
        let total: i32 = self.pending_morale_changes.iter().map(|s| s.amount).sum();
        if total != 0 {
            self.player.set_morale(self.player.morale + total);
        }
        self.pending_morale_changes.clear();
    }

    /// Shared melee-state accessor.
    ///
    /// # Panics
    ///
    /// Panics if no melee is in progress; calling melee logic outside the
    /// Melee phase is a programmer error.
    #[must_use]
    pub fn melee_state(&self) -> &MeleeState {
        assert_eq!(
            self.phase,
            BattlePhase::Melee,
            "melee state requested outside the Melee phase"
        );
        self.melee
            .as_ref()
            .expect("Melee phase without melee state")
    }

    /// Mutable melee-state accessor. Same panics as [`Self::melee_state`].
    #[must_use]
    pub fn melee_state_mut(&mut self) -> &mut MeleeState {
        assert_eq!(
            self.phase,
            BattlePhase::Melee,
            "melee state requested outside the Melee phase"
        );
        self.melee
            .as_mut()
            .expect("Melee phase without melee state")
    }

    /// Handle a potentially fatal wound, consuming grace if available.
    ///
    /// Returns true when the player actually died. A remaining grace point
    /// instead restores pools to half of max.
    pub fn resolve_fatal_wound(&mut self) -> bool {
        if self.player.health > 0 {
            return false;
        }
        if self.player.grace > 0 {
            self.player.grace -= 1;
            let half_health = self.player.max_health / 2;
            let half_stamina = self.player.max_stamina / 2;
            self.player.set_health(half_health);
            self.player.set_stamina(half_stamina);
            self.player.set_morale(MORALE_SCALE_MAX / 2);
            self.push_log(
                EntryKind::Event,
                "Somehow the blow glances aside. You are still on your feet.",
            );
            return false;
        }
        self.player.alive = false;
        self.battle_over = true;
        self.outcome = BattleOutcome::Defeat;
        self.phase = BattlePhase::Ended;
        self.push_log(EntryKind::Event, "The line closes over the gap you leave.");
        true
    }

    /// Recompute the UI's available-action hint list for the current phase.
    pub fn refresh_available_actions(&mut self) {
        self.available_actions = match self.phase {
            BattlePhase::Intro => vec!["advance".to_string()],
            BattlePhase::Line => {
                if crate::volley::current_volley_is_gorge(self)
                    && self.drill_step == DrillStep::Fire
                {
                    vec![
                        "gorge.column".to_string(),
                        "gorge.officer".to_string(),
                        "gorge.wagon".to_string(),
                        "gorge.mercy".to_string(),
                    ]
                } else {
                    vec!["volley".to_string()]
                }
            }
            BattlePhase::Story => vec!["continue".to_string()],
            BattlePhase::Melee => crate::melee::available_actions(self),
            BattlePhase::Ended => Vec::new(),
        };
    }

    /// Leave the intro and take position in the line.
    pub fn begin_line_phase(&mut self) {
        assert_eq!(
            self.phase,
            BattlePhase::Intro,
            "line phase can only begin from the intro"
        );
        self.phase = BattlePhase::Line;
        self.push_log(EntryKind::Order, "Fall in. The battalion forms line.");
        self.refresh_available_actions();
    }
}
