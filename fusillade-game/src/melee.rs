//! Melee skirmish resolution.
//!
//! When the charge goes home the battle drops out of the volley script and
//! into a per-round action economy: the player holds a stance, picks an
//! action, and the round resolves player → allies → opponents in a fixed
//! order. Every step of the round is recorded in an ordered `RoundEntry`
//! log that the presentation layer replays verbatim.
//!
//! Non-player combatants do not always fight to the death: each opponent
//! kind carries a break threshold, the health ratio below which it
//! withdraws. Sergeants have a threshold of zero and must be killed.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::battle::{BattleOutcome, BattlePhase, BattleState, EntryKind};
use crate::constants::{
    AI_ATTACK_WEIGHT, AI_GUARD_WEIGHT, AI_RESPITE_STAMINA_RATIO, AI_RESPITE_WEIGHT, CANTEEN_HEAL,
    GLORY_PER_KILL, MELEE_ARM_INJURY_PENALTY, MELEE_EXCHANGE_CAP, MELEE_FATIGUE_WEIGHT,
    MELEE_GUARD_BLOCK_CHANCE, MELEE_HEAD_DAMAGE_MULT, MELEE_HEAD_KILL_BONUS,
    MELEE_HEAD_STUN_CHANCE, MELEE_LEG_INJURY_COST_MULT, MELEE_MAX_HIT_CHANCE,
    MELEE_MIN_HIT_CHANCE, MELEE_MORALE_WEIGHT, MELEE_RIPOSTE_BONUS, MELEE_SKILL_WEIGHT,
    MELEE_STANCE_GUARD_BONUS, MELEE_STRENGTH_DAMAGE_DIVISOR, MELEE_STUN_ROUNDS,
    RESPITE_MORALE_RECOVERY, RESPITE_STAMINA_RECOVERY, SECOND_WIND_MORALE_COST,
    SECOND_WIND_STAMINA,
};
use crate::numbers::pool_ratio;
use crate::tiers::MoraleThreshold;

/// Fighting stance. Persists across rounds until changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Aggressive,
    #[default]
    Balanced,
    Defensive,
}

impl Stance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Balanced => "balanced",
            Self::Defensive => "defensive",
        }
    }

    /// Additive hit-chance adjustment for the attacker.
    const fn hit_bonus(self) -> f64 {
        match self {
            Self::Aggressive => 0.05,
            Self::Balanced => 0.0,
            Self::Defensive => -0.05,
        }
    }

    /// Damage multiplier for the attacker.
    const fn damage_mult(self) -> f64 {
        match self {
            Self::Aggressive => 1.25,
            Self::Balanced => 1.0,
            Self::Defensive => 0.8,
        }
    }

    /// Extra stamina an attack costs in this stance.
    const fn attack_cost_bonus(self) -> i32 {
        match self {
            Self::Aggressive => 2,
            Self::Balanced => 0,
            Self::Defensive => 0,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attack variants available to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Thrust,
    Lunge,
    ButtStrike,
    Feint,
    Shoot,
}

impl AttackKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thrust => "thrust",
            Self::Lunge => "lunge",
            Self::ButtStrike => "butt_strike",
            Self::Feint => "feint",
            Self::Shoot => "shoot",
        }
    }

    const fn base_hit_chance(self) -> f64 {
        match self {
            Self::Thrust => 0.55,
            Self::Lunge => 0.45,
            Self::ButtStrike => 0.50,
            Self::Feint => 0.65,
            Self::Shoot => 0.70,
        }
    }

    const fn base_damage(self) -> i32 {
        match self {
            Self::Thrust => 18,
            Self::Lunge => 24,
            Self::ButtStrike => 14,
            Self::Feint => 8,
            Self::Shoot => 30,
        }
    }

    const fn stamina_cost(self) -> i32 {
        match self {
            Self::Thrust => 8,
            Self::Lunge => 14,
            Self::ButtStrike => 10,
            Self::Feint => 6,
            Self::Shoot => 4,
        }
    }
}

/// Body part targeted by an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    Head,
    Torso,
    Arms,
    Legs,
}

impl BodyPart {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::Arms => "arms",
            Self::Legs => "legs",
        }
    }

    const fn hit_modifier(self) -> f64 {
        match self {
            Self::Head => -0.15,
            Self::Torso => 0.0,
            Self::Arms => -0.05,
            Self::Legs => -0.05,
        }
    }
}

/// One player decision per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MeleeAction {
    Attack { kind: AttackKind, target: BodyPart },
    Guard,
    Respite,
    Reload,
    SecondWind,
    Canteen,
    Flee,
}

impl MeleeAction {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Attack { kind, .. } => kind.as_str(),
            Self::Guard => "guard",
            Self::Respite => "respite",
            Self::Reload => "reload",
            Self::SecondWind => "second_wind",
            Self::Canteen => "canteen",
            Self::Flee => "flee",
        }
    }
}

/// Which side of the skirmish an actor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Ally,
    Enemy,
}

/// Authoritative record of one actor's turn within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub actor_name: String,
    pub actor_side: Side,
    pub target_name: String,
    pub action: String,
    pub hit: bool,
    pub blocked: bool,
    pub damage: i32,
    pub special: String,
    pub body_part: Option<BodyPart>,
}

/// Opponent archetypes with their break-threshold policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentKind {
    Conscript,
    LineInfantry,
    Veteran,
    Sergeant,
}

impl OpponentKind {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Conscript => "Conscript",
            Self::LineInfantry => "Line infantryman",
            Self::Veteran => "Veteran",
            Self::Sergeant => "Enemy sergeant",
        }
    }

    /// Health percentage at or below which this kind withdraws.
    /// Sergeants fight to the death.
    #[must_use]
    pub const fn break_threshold_pct(self) -> i32 {
        match self {
            Self::Conscript => 35,
            Self::LineInfantry => 25,
            Self::Veteran => 15,
            Self::Sergeant => 0,
        }
    }

    const fn max_health(self) -> i32 {
        match self {
            Self::Conscript => 55,
            Self::LineInfantry => 70,
            Self::Veteran => 85,
            Self::Sergeant => 95,
        }
    }

    const fn max_stamina(self) -> i32 {
        match self {
            Self::Conscript => 120,
            Self::LineInfantry => 150,
            Self::Veteran => 170,
            Self::Sergeant => 180,
        }
    }

    const fn skill(self) -> i32 {
        match self {
            Self::Conscript => 30,
            Self::LineInfantry => 45,
            Self::Veteran => 60,
            Self::Sergeant => 70,
        }
    }

    const fn base_damage(self) -> i32 {
        match self {
            Self::Conscript => 10,
            Self::LineInfantry => 13,
            Self::Veteran => 16,
            Self::Sergeant => 18,
        }
    }
}

/// One enemy combatant with independent pools and status flags.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeOpponent {
    pub name: String,
    pub kind: OpponentKind,
    pub health: i32,
    pub max_health: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub morale: i32,
    pub guarding: bool,
    pub stunned_rounds: u8,
    pub arm_injured: bool,
    pub leg_injured: bool,
    pub alive: bool,
    pub withdrawn: bool,
}

impl MeleeOpponent {
    #[must_use]
    pub fn new(kind: OpponentKind, ordinal: usize) -> Self {
        Self {
            name: format!("{} {}", kind.display_name(), ordinal),
            kind,
            health: kind.max_health(),
            max_health: kind.max_health(),
            stamina: kind.max_stamina(),
            max_stamina: kind.max_stamina(),
            morale: 70,
            guarding: false,
            stunned_rounds: 0,
            arm_injured: false,
            leg_injured: false,
            alive: true,
            withdrawn: false,
        }
    }

    pub fn set_health(&mut self, value: i32) {
        self.health = value.clamp(0, self.max_health);
    }

    pub fn set_stamina(&mut self, value: i32) {
        self.stamina = value.clamp(0, self.max_stamina);
    }

    #[must_use]
    pub fn fatigue_ratio(&self) -> f64 {
        1.0 - pool_ratio(self.stamina, self.max_stamina)
    }

    /// Whether the combatant has dropped out of the fight.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        !self.alive || self.withdrawn
    }

    /// Break check, in integer arithmetic so the boundary is exact:
    /// at exactly the threshold percentage the combatant withdraws.
    #[must_use]
    pub const fn past_break_threshold(&self) -> bool {
        self.health * 100 <= self.max_health * self.kind.break_threshold_pct()
    }
}

/// A friendly combatant fighting beside the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeAlly {
    pub npc_id: String,
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub alive: bool,
}

impl MeleeAlly {
    pub fn set_health(&mut self, value: i32) {
        self.health = value.clamp(0, self.max_health);
        if self.health == 0 {
            self.alive = false;
        }
    }
}

/// Reinforcement event: opponents exist in the list from the start but are
/// inactive (not targetable, not acting) until their wave triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEvent {
    pub at_exchange: u32,
    pub activate: Vec<usize>,
    #[serde(default)]
    pub triggered: bool,
}

/// Full melee encounter state. Present iff the battle phase is Melee.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeState {
    pub exchange: u32,
    pub exchange_cap: u32,
    pub kills: u32,
    pub stance: Stance,
    pub opponents: Vec<MeleeOpponent>,
    pub allies: Vec<MeleeAlly>,
    /// Indices into `opponents` currently in the fight.
    pub active: SmallVec<[usize; 8]>,
    /// Index of the opponent the player is currently facing.
    pub target: usize,
    pub riposte_armed: bool,
    pub player_guarding: bool,
    pub player_stunned: u8,
    pub player_arm_injured: bool,
    pub player_leg_injured: bool,
    pub reload_progress: u8,
    pub second_wind_used: bool,
    pub waves: Vec<WaveEvent>,
    /// Ordered record of the last resolved round.
    pub round_log: Vec<RoundEntry>,
}

/// Hit chance for one swing.
///
/// Monotonic in `skill`, inversely related to `fatigue_ratio`; stance
/// trades accuracy against damage and defense.
#[must_use]
pub fn hit_chance(
    skill: i32,
    morale_ratio: f64,
    stance: Stance,
    kind: AttackKind,
    part: BodyPart,
    riposte: bool,
    fatigue_ratio: f64,
    arm_injured: bool,
) -> f64 {
    let mut chance = kind.base_hit_chance()
        + f64::from(skill - 50) * MELEE_SKILL_WEIGHT
        + (morale_ratio - 0.5) * MELEE_MORALE_WEIGHT
        + stance.hit_bonus()
        + part.hit_modifier()
        - fatigue_ratio * MELEE_FATIGUE_WEIGHT;
    if riposte {
        chance += MELEE_RIPOSTE_BONUS;
    }
    if arm_injured {
        chance -= MELEE_ARM_INJURY_PENALTY;
    }
    chance.clamp(MELEE_MIN_HIT_CHANCE, MELEE_MAX_HIT_CHANCE)
}

fn weighted_pick<T: Copy, R: Rng>(options: &[(T, u32)], rng: &mut R) -> Option<T> {
    let total: u32 = options.iter().map(|(_, weight)| *weight).sum();
    if total == 0 {
        return None;
    }
    let roll = rng.random_range(0..total);
    let mut cursor = 0;
    for (item, weight) in options {
        cursor += weight;
        if roll < cursor {
            return Some(*item);
        }
    }
    options.first().map(|(item, _)| *item)
}

fn opponents_for_part(part: u8) -> (Vec<MeleeOpponent>, SmallVec<[usize; 8]>, Vec<WaveEvent>) {
    let roster: &[OpponentKind] = match part {
        2 => &[
            OpponentKind::LineInfantry,
            OpponentKind::LineInfantry,
            OpponentKind::Conscript,
            OpponentKind::Veteran,
        ],
        3 => &[
            OpponentKind::LineInfantry,
            OpponentKind::Veteran,
            OpponentKind::Veteran,
            OpponentKind::Sergeant,
        ],
        _ => &[
            OpponentKind::Conscript,
            OpponentKind::Conscript,
            OpponentKind::LineInfantry,
        ],
    };
    let opponents: Vec<MeleeOpponent> = roster
        .iter()
        .enumerate()
        .map(|(i, kind)| MeleeOpponent::new(*kind, i + 1))
        .collect();
    let active: SmallVec<[usize; 8]> = [0, 1].into_iter().collect();
    let waves = match part {
        2 => vec![
            WaveEvent {
                at_exchange: 3,
                activate: vec![2],
                triggered: false,
            },
            WaveEvent {
                at_exchange: 6,
                activate: vec![3],
                triggered: false,
            },
        ],
        3 => vec![
            WaveEvent {
                at_exchange: 4,
                activate: vec![2],
                triggered: false,
            },
            WaveEvent {
                at_exchange: 8,
                activate: vec![3],
                triggered: false,
            },
        ],
        _ => vec![WaveEvent {
            at_exchange: 4,
            activate: vec![2],
            triggered: false,
        }],
    };
    (opponents, active, waves)
}

/// Move the battle from the Story phase into the melee.
///
/// # Panics
///
/// Panics if the battle is not in the Story phase or already has melee
/// state.
pub fn begin_melee(battle: &mut BattleState) {
    assert_eq!(
        battle.phase,
        BattlePhase::Story,
        "melee can only begin from the Story phase"
    );
    assert!(battle.melee.is_none(), "melee state already present");

    let (opponents, active, waves) = opponents_for_part(battle.battle_part);
    let allies: Vec<MeleeAlly> = [
        battle.line.left_neighbour.as_ref(),
        battle.line.right_neighbour.as_ref(),
    ]
    .into_iter()
    .flatten()
    .filter(|soldier| soldier.alive && !soldier.routing)
    .map(|soldier| MeleeAlly {
        npc_id: soldier.npc_id.clone(),
        name: soldier.name.clone(),
        health: 60,
        max_health: 60,
        stamina: 150,
        max_stamina: 150,
        alive: true,
    })
    .collect();

    battle.melee = Some(MeleeState {
        exchange: 0,
        exchange_cap: MELEE_EXCHANGE_CAP,
        kills: 0,
        stance: Stance::Balanced,
        opponents,
        allies,
        active,
        target: 0,
        riposte_armed: false,
        player_guarding: false,
        player_stunned: 0,
        player_arm_injured: false,
        player_leg_injured: false,
        reload_progress: 0,
        second_wind_used: false,
        waves,
        round_log: Vec::new(),
    });
    battle.phase = BattlePhase::Melee;
    battle.push_log(
        EntryKind::Event,
        "The lines meet with a sound like a wagon overturning.",
    );
}

/// Change the persisted stance.
pub fn set_stance(battle: &mut BattleState, stance: Stance) {
    battle.melee_state_mut().stance = stance;
}

/// Point the player at a different active opponent.
///
/// # Panics
///
/// Panics if the index is not currently active.
pub fn set_target(battle: &mut BattleState, index: usize) {
    let melee = battle.melee_state_mut();
    assert!(
        melee.active.contains(&index),
        "target {index} is not an active opponent"
    );
    melee.target = index;
}

/// Action keys currently legal for the player, for the UI hint list.
#[must_use]
pub fn available_actions(battle: &BattleState) -> Vec<String> {
    let melee = battle.melee_state();
    let player = &battle.player;
    let mut actions = vec![
        "attack.thrust".to_string(),
        "attack.lunge".to_string(),
        "attack.butt_strike".to_string(),
        "attack.feint".to_string(),
    ];
    if player.musket_loaded {
        actions.push("attack.shoot".to_string());
    } else if melee.reload_progress < 2 {
        actions.push("reload".to_string());
    }
    actions.push("guard".to_string());
    actions.push("respite".to_string());
    if !melee.second_wind_used {
        actions.push("second_wind".to_string());
    }
    if player.canteen_uses > 0 {
        actions.push("canteen".to_string());
    }
    if player.morale_threshold == MoraleThreshold::Breaking {
        actions.push("flee".to_string());
    }
    actions
}

fn push_entry(melee: &mut MeleeState, entry: RoundEntry) {
    melee.round_log.push(entry);
}

fn retarget(melee: &mut MeleeState) {
    if !melee.active.contains(&melee.target) {
        melee.target = melee.active.first().copied().unwrap_or(0);
    }
}

fn deactivate(melee: &mut MeleeState, index: usize) {
    melee.active.retain(|active| *active != index);
    retarget(melee);
}

fn player_attack_cost(melee: &MeleeState, kind: AttackKind) -> i32 {
    let mut cost = f64::from(kind.stamina_cost() + melee.stance.attack_cost_bonus());
    if melee.player_leg_injured {
        cost *= MELEE_LEG_INJURY_COST_MULT;
    }
    crate::numbers::round_f64_to_i32(cost)
}

fn attack_damage<R: Rng>(
    kind: AttackKind,
    stance: Stance,
    strength: i32,
    rng: &mut R,
) -> i32 {
    let base = kind.base_damage() + strength / MELEE_STRENGTH_DAMAGE_DIVISOR
        + rng.random_range(0..=3);
    crate::numbers::round_f64_to_i32(f64::from(base) * stance.damage_mult()).max(1)
}

/// Resolve a strike from the player against an opponent.
#[allow(clippy::too_many_lines)]
fn player_strike<R: Rng>(
    battle: &mut BattleState,
    melee: &mut MeleeState,
    index: usize,
    kind: AttackKind,
    part: BodyPart,
    riposte: bool,
    rng: &mut R,
) {
    let skill = match kind {
        AttackKind::Shoot => battle.player.attributes.musketry,
        _ => battle.player.attributes.elan,
    };
    let chance = hit_chance(
        skill,
        battle.player.morale_ratio(),
        melee.stance,
        kind,
        part,
        riposte,
        battle.player.fatigue_ratio(),
        melee.player_arm_injured,
    );

    let (target_name, target_guarding) = {
        let opponent = &melee.opponents[index];
        (opponent.name.clone(), opponent.guarding)
    };
    let mut entry = RoundEntry {
        actor_name: battle.player.name.clone(),
        actor_side: Side::Player,
        target_name: target_name.clone(),
        action: kind.as_str().to_string(),
        hit: false,
        blocked: false,
        damage: 0,
        special: if riposte {
            "riposte".to_string()
        } else {
            String::new()
        },
        body_part: Some(part),
    };

    if target_guarding && rng.random::<f64>() < MELEE_GUARD_BLOCK_CHANCE {
        entry.blocked = true;
        push_entry(melee, entry);
        return;
    }

    if rng.random::<f64>() >= chance {
        push_entry(melee, entry);
        return;
    }

    entry.hit = true;
    let mut damage = attack_damage(kind, melee.stance, battle.player.attributes.strength, rng);
    let mut special: Vec<&str> = Vec::new();
    match part {
        BodyPart::Head => {
            damage = crate::numbers::round_f64_to_i32(f64::from(damage) * MELEE_HEAD_DAMAGE_MULT);
            if rng.random::<f64>() < MELEE_HEAD_STUN_CHANCE {
                melee.opponents[index].stunned_rounds = MELEE_STUN_ROUNDS;
                special.push("stunned");
            }
            if rng.random::<f64>() < MELEE_HEAD_KILL_BONUS {
                damage = melee.opponents[index].health;
                special.push("felled");
            }
        }
        BodyPart::Arms => {
            melee.opponents[index].arm_injured = true;
            special.push("arm injured");
        }
        BodyPart::Legs => {
            melee.opponents[index].leg_injured = true;
            special.push("leg injured");
        }
        BodyPart::Torso => {}
    }
    if kind == AttackKind::Feint {
        melee.opponents[index].guarding = false;
        melee.riposte_armed = true;
        special.push("opening made");
    }

    let (killed, withdrawn) = {
        let opponent = &mut melee.opponents[index];
        opponent.set_health(opponent.health - damage);
        if opponent.health == 0 {
            opponent.alive = false;
            (true, false)
        } else if opponent.past_break_threshold() {
            opponent.withdrawn = true;
            (false, true)
        } else {
            (false, false)
        }
    };
    entry.damage = damage;

    if killed {
        melee.kills += 1;
        special.push("killed");
        battle.push_log(EntryKind::Result, format!("{target_name} falls and is still."));
    } else if withdrawn {
        special.push("withdraws");
        battle.push_log(
            EntryKind::Result,
            format!("{target_name} staggers back out of the press."),
        );
    }
    entry.special = if entry.special.is_empty() {
        special.join(", ")
    } else if special.is_empty() {
        entry.special
    } else {
        format!("{}, {}", entry.special, special.join(", "))
    };

    let defeated = melee.opponents[index].is_defeated();
    push_entry(melee, entry);
    if defeated {
        deactivate(melee, index);
    }
}

/// Resolve a strike from an active opponent against the player.
fn opponent_strike_player<R: Rng>(
    battle: &mut BattleState,
    melee: &mut MeleeState,
    index: usize,
    part: BodyPart,
    special: &str,
    rng: &mut R,
) {
    let (name, skill, base_damage, arm_injured, morale, fatigue) = {
        let opponent = &melee.opponents[index];
        (
            opponent.name.clone(),
            opponent.kind.skill(),
            opponent.kind.base_damage(),
            opponent.arm_injured,
            pool_ratio(opponent.morale, 100),
            opponent.fatigue_ratio(),
        )
    };
    let mut chance = hit_chance(
        skill,
        morale,
        Stance::Balanced,
        AttackKind::Thrust,
        part,
        false,
        fatigue,
        arm_injured,
    );
    if melee.stance == Stance::Defensive {
        chance = (chance - MELEE_STANCE_GUARD_BONUS).max(MELEE_MIN_HIT_CHANCE);
    }

    let mut entry = RoundEntry {
        actor_name: name.clone(),
        actor_side: Side::Enemy,
        target_name: battle.player.name.clone(),
        action: "thrust".to_string(),
        hit: false,
        blocked: false,
        damage: 0,
        special: special.to_string(),
        body_part: Some(part),
    };

    if melee.player_guarding && rng.random::<f64>() < MELEE_GUARD_BLOCK_CHANCE {
        entry.blocked = true;
        push_entry(melee, entry);
        return;
    }

    if rng.random::<f64>() >= chance {
        push_entry(melee, entry);
        // A miss against an armed riposte hands the player a free thrust.
        if melee.riposte_armed {
            melee.riposte_armed = false;
            if melee.active.contains(&index) {
                player_strike(
                    battle,
                    melee,
                    index,
                    AttackKind::Thrust,
                    BodyPart::Torso,
                    true,
                    rng,
                );
            }
        }
        return;
    }

    entry.hit = true;
    let mut damage = base_damage + rng.random_range(0..=4);
    let mut specials: Vec<&str> = Vec::new();
    match part {
        BodyPart::Head => {
            damage = crate::numbers::round_f64_to_i32(f64::from(damage) * MELEE_HEAD_DAMAGE_MULT);
            if rng.random::<f64>() < MELEE_HEAD_STUN_CHANCE {
                melee.player_stunned = MELEE_STUN_ROUNDS;
                specials.push("stunned");
            }
        }
        BodyPart::Arms => {
            melee.player_arm_injured = true;
            specials.push("arm injured");
        }
        BodyPart::Legs => {
            melee.player_leg_injured = true;
            specials.push("leg injured");
        }
        BodyPart::Torso => {}
    }
    entry.damage = damage;
    if !specials.is_empty() {
        entry.special = if entry.special.is_empty() {
            specials.join(", ")
        } else {
            format!("{}, {}", entry.special, specials.join(", "))
        };
    }
    push_entry(melee, entry);

    battle.player.set_health(battle.player.health - damage);
    battle.player.set_morale(battle.player.morale - 2);
    let _ = battle.resolve_fatal_wound();
}

fn player_turn<R: Rng>(
    battle: &mut BattleState,
    melee: &mut MeleeState,
    action: MeleeAction,
    rng: &mut R,
) {
    melee.player_guarding = false;
    if melee.player_stunned > 0 {
        melee.player_stunned -= 1;
        push_entry(
            melee,
            RoundEntry {
                actor_name: battle.player.name.clone(),
                actor_side: Side::Player,
                target_name: String::new(),
                action: "stunned".to_string(),
                hit: false,
                blocked: false,
                damage: 0,
                special: "reeling".to_string(),
                body_part: None,
            },
        );
        return;
    }

    match action {
        MeleeAction::Attack { kind, target } => {
            if kind == AttackKind::Shoot {
                assert!(
                    battle.player.musket_loaded,
                    "shoot chosen with an empty musket"
                );
                battle.player.musket_loaded = false;
                battle.player.shots_fired += 1;
            }
            let cost = player_attack_cost(melee, kind);
            battle.player.set_stamina(battle.player.stamina - cost);
            retarget(melee);
            let index = melee.target;
            if melee.active.contains(&index) {
                player_strike(battle, melee, index, kind, target, false, rng);
            }
        }
        MeleeAction::Guard => {
            melee.player_guarding = true;
            melee.riposte_armed = true;
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "guard".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: String::new(),
                    body_part: None,
                },
            );
        }
        MeleeAction::Respite => {
            battle
                .player
                .set_stamina(battle.player.stamina + RESPITE_STAMINA_RECOVERY);
            battle.player.set_morale(battle.player.morale + RESPITE_MORALE_RECOVERY);
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "respite".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "catches breath".to_string(),
                    body_part: None,
                },
            );
        }
        MeleeAction::Reload => {
            assert!(
                !battle.player.musket_loaded,
                "reload chosen with a loaded musket"
            );
            let special = if melee.reload_progress == 0 {
                melee.reload_progress = 1;
                "charge rammed"
            } else {
                melee.reload_progress = 0;
                battle.player.musket_loaded = true;
                "primed and ready"
            };
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "reload".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: special.to_string(),
                    body_part: None,
                },
            );
        }
        MeleeAction::SecondWind => {
            assert!(!melee.second_wind_used, "second wind already spent");
            melee.second_wind_used = true;
            battle
                .player
                .set_stamina(battle.player.stamina + SECOND_WIND_STAMINA);
            battle
                .player
                .set_morale(battle.player.morale - SECOND_WIND_MORALE_COST);
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "second_wind".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "digs deep".to_string(),
                    body_part: None,
                },
            );
        }
        MeleeAction::Canteen => {
            assert!(battle.player.canteen_uses > 0, "canteen is empty");
            battle.player.canteen_uses -= 1;
            battle.player.set_health(battle.player.health + CANTEEN_HEAL);
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "canteen".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "drinks".to_string(),
                    body_part: None,
                },
            );
            // Dropping your guard to drink invites a free blow.
            retarget(melee);
            let index = melee.target;
            if melee.active.contains(&index) {
                let part = weighted_pick(
                    &[
                        (BodyPart::Torso, 60),
                        (BodyPart::Head, 10),
                        (BodyPart::Arms, 15),
                        (BodyPart::Legs, 15),
                    ],
                    rng,
                )
                .unwrap_or(BodyPart::Torso);
                opponent_strike_player(battle, melee, index, part, "counter", rng);
            }
        }
        MeleeAction::Flee => {
            assert_eq!(
                battle.player.morale_threshold,
                MoraleThreshold::Breaking,
                "flee is only available at Breaking morale"
            );
            battle.player.routing = true;
            push_entry(
                melee,
                RoundEntry {
                    actor_name: battle.player.name.clone(),
                    actor_side: Side::Player,
                    target_name: String::new(),
                    action: "flee".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "breaks and runs".to_string(),
                    body_part: None,
                },
            );
            battle.push_log(
                EntryKind::Event,
                "You drop out of the fight and run with the other broken men.",
            );
            battle.outcome = BattleOutcome::Rout;
        }
    }
}

fn ally_turn<R: Rng>(battle: &mut BattleState, melee: &mut MeleeState, rng: &mut R) {
    for ally_index in 0..melee.allies.len() {
        if battle.battle_over || melee.active.is_empty() {
            return;
        }
        let (ally_name, ally_alive, ally_stamina_ratio) = {
            let ally = &melee.allies[ally_index];
            (
                ally.name.clone(),
                ally.alive,
                pool_ratio(ally.stamina, ally.max_stamina),
            )
        };
        if !ally_alive {
            continue;
        }
        if ally_stamina_ratio < AI_RESPITE_STAMINA_RATIO {
            let ally = &mut melee.allies[ally_index];
            ally.stamina = (ally.stamina + RESPITE_STAMINA_RECOVERY).min(ally.max_stamina);
            push_entry(
                melee,
                RoundEntry {
                    actor_name: ally_name,
                    actor_side: Side::Ally,
                    target_name: String::new(),
                    action: "respite".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "catches breath".to_string(),
                    body_part: None,
                },
            );
            continue;
        }

        let pick = rng.random_range(0..melee.active.len());
        let index = melee.active[pick];
        let target_name = melee.opponents[index].name.clone();
        melee.allies[ally_index].stamina =
            (melee.allies[ally_index].stamina - AttackKind::Thrust.stamina_cost()).max(0);

        let chance = hit_chance(
            45,
            0.7,
            Stance::Balanced,
            AttackKind::Thrust,
            BodyPart::Torso,
            false,
            1.0 - ally_stamina_ratio,
            false,
        );
        let mut entry = RoundEntry {
            actor_name: ally_name,
            actor_side: Side::Ally,
            target_name: target_name.clone(),
            action: "thrust".to_string(),
            hit: false,
            blocked: false,
            damage: 0,
            special: String::new(),
            body_part: Some(BodyPart::Torso),
        };
        if rng.random::<f64>() < chance {
            entry.hit = true;
            let damage = AttackKind::Thrust.base_damage() / 2 + rng.random_range(0..=3);
            entry.damage = damage;
            let opponent = &mut melee.opponents[index];
            opponent.set_health(opponent.health - damage);
            if opponent.health == 0 {
                opponent.alive = false;
                entry.special = "killed".to_string();
            } else if opponent.past_break_threshold() {
                opponent.withdrawn = true;
                entry.special = "withdraws".to_string();
            }
        }
        let defeated = melee.opponents[index].is_defeated();
        push_entry(melee, entry);
        if defeated {
            deactivate(melee, index);
        }
    }
}

#[derive(Clone, Copy)]
enum OpponentMove {
    Attack,
    Guard,
    Respite,
}

fn enemy_turn<R: Rng>(battle: &mut BattleState, melee: &mut MeleeState, rng: &mut R) {
    let order: Vec<usize> = melee.active.to_vec();
    for index in order {
        if battle.battle_over || !melee.active.contains(&index) {
            continue;
        }
        if melee.opponents[index].stunned_rounds > 0 {
            melee.opponents[index].stunned_rounds -= 1;
            let name = melee.opponents[index].name.clone();
            push_entry(
                melee,
                RoundEntry {
                    actor_name: name,
                    actor_side: Side::Enemy,
                    target_name: String::new(),
                    action: "stunned".to_string(),
                    hit: false,
                    blocked: false,
                    damage: 0,
                    special: "reeling".to_string(),
                    body_part: None,
                },
            );
            continue;
        }
        melee.opponents[index].guarding = false;

        let low_stamina = {
            let opponent = &melee.opponents[index];
            pool_ratio(opponent.stamina, opponent.max_stamina) < AI_RESPITE_STAMINA_RATIO
        };
        let weights = if low_stamina {
            [
                (OpponentMove::Respite, 70),
                (OpponentMove::Guard, 20),
                (OpponentMove::Attack, 10),
            ]
        } else {
            [
                (OpponentMove::Attack, AI_ATTACK_WEIGHT),
                (OpponentMove::Guard, AI_GUARD_WEIGHT),
                (OpponentMove::Respite, AI_RESPITE_WEIGHT),
            ]
        };
        match weighted_pick(&weights, rng).unwrap_or(OpponentMove::Attack) {
            OpponentMove::Respite => {
                let opponent = &mut melee.opponents[index];
                opponent.set_stamina(opponent.stamina + RESPITE_STAMINA_RECOVERY);
                let name = opponent.name.clone();
                push_entry(
                    melee,
                    RoundEntry {
                        actor_name: name,
                        actor_side: Side::Enemy,
                        target_name: String::new(),
                        action: "respite".to_string(),
                        hit: false,
                        blocked: false,
                        damage: 0,
                        special: "catches breath".to_string(),
                        body_part: None,
                    },
                );
            }
            OpponentMove::Guard => {
                let opponent = &mut melee.opponents[index];
                opponent.guarding = true;
                let name = opponent.name.clone();
                push_entry(
                    melee,
                    RoundEntry {
                        actor_name: name,
                        actor_side: Side::Enemy,
                        target_name: String::new(),
                        action: "guard".to_string(),
                        hit: false,
                        blocked: false,
                        damage: 0,
                        special: String::new(),
                        body_part: None,
                    },
                );
            }
            OpponentMove::Attack => {
                let cost = {
                    let opponent = &melee.opponents[index];
                    let mut cost = f64::from(AttackKind::Thrust.stamina_cost());
                    if opponent.leg_injured {
                        cost *= MELEE_LEG_INJURY_COST_MULT;
                    }
                    crate::numbers::round_f64_to_i32(cost)
                };
                {
                    let opponent = &mut melee.opponents[index];
                    opponent.set_stamina(opponent.stamina - cost);
                }
                let part = weighted_pick(
                    &[
                        (BodyPart::Torso, 60),
                        (BodyPart::Head, 10),
                        (BodyPart::Arms, 15),
                        (BodyPart::Legs, 15),
                    ],
                    rng,
                )
                .unwrap_or(BodyPart::Torso);

                // Most blows go for the player; some for the file mates.
                let attack_ally = !melee.allies.is_empty()
                    && melee.allies.iter().any(|ally| ally.alive)
                    && rng.random::<f64>() < 0.25;
                if attack_ally {
                    let living: Vec<usize> = melee
                        .allies
                        .iter()
                        .enumerate()
                        .filter(|(_, ally)| ally.alive)
                        .map(|(i, _)| i)
                        .collect();
                    let ally_index = living[rng.random_range(0..living.len())];
                    let (name, damage_roll) = {
                        let opponent = &melee.opponents[index];
                        (
                            opponent.name.clone(),
                            opponent.kind.base_damage() + rng.random_range(0..=4),
                        )
                    };
                    let ally_name = melee.allies[ally_index].name.clone();
                    let hit = rng.random::<f64>() < 0.45;
                    let mut entry = RoundEntry {
                        actor_name: name,
                        actor_side: Side::Enemy,
                        target_name: ally_name.clone(),
                        action: "thrust".to_string(),
                        hit,
                        blocked: false,
                        damage: 0,
                        special: String::new(),
                        body_part: Some(part),
                    };
                    if hit {
                        entry.damage = damage_roll;
                        let ally = &mut melee.allies[ally_index];
                        ally.set_health(ally.health - damage_roll);
                        if !ally.alive {
                            entry.special = "killed".to_string();
                            battle.push_log(
                                EntryKind::Event,
                                format!("{ally_name} goes down under the bayonets."),
                            );
                        }
                    }
                    push_entry(melee, entry);
                } else {
                    opponent_strike_player(battle, melee, index, part, "", rng);
                }
            }
        }
    }
}

fn pending_wave_exists(melee: &MeleeState) -> bool {
    melee.waves.iter().any(|wave| !wave.triggered)
}

fn trigger_due_waves(battle: &mut BattleState, melee: &mut MeleeState, force_next: bool) {
    let exchange = melee.exchange;
    let mut activated: Vec<usize> = Vec::new();
    let mut forced = force_next;
    for wave in &mut melee.waves {
        if wave.triggered {
            continue;
        }
        if wave.at_exchange <= exchange || forced {
            wave.triggered = true;
            forced = false;
            activated.extend(wave.activate.iter().copied());
        }
    }
    if activated.is_empty() {
        return;
    }
    for index in activated {
        if index < melee.opponents.len() && !melee.opponents[index].is_defeated() {
            melee.active.push(index);
        }
    }
    retarget(melee);
    battle.push_log(
        EntryKind::Event,
        "More of them shoulder through the smoke and into the fight.",
    );
}

fn sync_allies_to_line(battle: &mut BattleState, melee: &MeleeState) {
    for ally in &melee.allies {
        for slot in [
            battle.line.left_neighbour.as_mut(),
            battle.line.right_neighbour.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            if slot.npc_id == ally.npc_id {
                if !ally.alive {
                    slot.alive = false;
                } else if ally.health * 2 < ally.max_health {
                    slot.wounded = true;
                }
            }
        }
    }
}

fn finish_melee(battle: &mut BattleState, melee: &MeleeState, outcome: BattleOutcome) {
    sync_allies_to_line(battle, melee);
    battle.glory_earned += i32::try_from(melee.kills).unwrap_or(0) * GLORY_PER_KILL;
    battle.outcome = outcome;
    battle.battle_over = true;
    battle.phase = BattlePhase::Ended;
    battle.melee = None;
    let text = match outcome {
        BattleOutcome::Victory => "The last of them breaks. The ground is yours.",
        BattleOutcome::Rout => "The company dissolves around you as you run.",
        BattleOutcome::Survived => "Both lines reel apart, too spent to hold the ground.",
        BattleOutcome::Defeat | BattleOutcome::Pending => "It is over.",
    };
    battle.push_log(EntryKind::Event, text);
}

/// Resolve one full melee round for a player action.
///
/// Returns the ordered `RoundEntry` log for this round; the same sequence
/// remains available on the melee state until the next round resolves.
///
/// # Panics
///
/// Panics when called outside the Melee phase, on a finished battle, or
/// with an action whose availability preconditions do not hold (shooting
/// an empty musket, fleeing above Breaking morale, and so on).
pub fn resolve_melee_round<R: Rng>(
    battle: &mut BattleState,
    action: MeleeAction,
    rng: &mut R,
) -> Vec<RoundEntry> {
    assert!(!battle.battle_over, "melee resolved on a finished battle");
    assert_eq!(
        battle.phase,
        BattlePhase::Melee,
        "melee resolved outside the Melee phase"
    );
    let mut melee = battle.melee.take().expect("Melee phase without melee state");
    melee.round_log.clear();

    player_turn(battle, &mut melee, action, rng);

    if battle.outcome == BattleOutcome::Rout {
        let entries = melee.round_log.clone();
        finish_melee(battle, &melee, BattleOutcome::Rout);
        battle.refresh_available_actions();
        return entries;
    }
    if battle.battle_over {
        // The player died to a counter-blow during their own turn.
        let entries = melee.round_log.clone();
        sync_allies_to_line(battle, &melee);
        battle.glory_earned += i32::try_from(melee.kills).unwrap_or(0) * GLORY_PER_KILL;
        battle.melee = None;
        battle.refresh_available_actions();
        return entries;
    }

    ally_turn(battle, &mut melee, rng);
    enemy_turn(battle, &mut melee, rng);

    if battle.battle_over {
        let entries = melee.round_log.clone();
        sync_allies_to_line(battle, &melee);
        battle.glory_earned += i32::try_from(melee.kills).unwrap_or(0) * GLORY_PER_KILL;
        battle.melee = None;
        battle.refresh_available_actions();
        return entries;
    }

    melee.exchange += 1;
    trigger_due_waves(battle, &mut melee, false);
    if melee.active.is_empty() && pending_wave_exists(&melee) {
        // No one left to fight but reinforcements are coming: pull the
        // next wave in rather than leaving an empty field.
        trigger_due_waves(battle, &mut melee, true);
    }

    let entries = melee.round_log.clone();
    if melee.active.is_empty() {
        finish_melee(battle, &melee, BattleOutcome::Victory);
    } else if melee.exchange >= melee.exchange_cap {
        finish_melee(battle, &melee, BattleOutcome::Survived);
    } else {
        battle.melee = Some(melee);
    }
    battle.refresh_available_actions();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::PlayerCharacter;
    use crate::npc::create_campaign_npcs;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn melee_battle() -> BattleState {
        let pc = PlayerCharacter::new("Test");
        let mut battle = BattleState::from_character(&pc, &create_campaign_npcs());
        battle.phase = BattlePhase::Story;
        begin_melee(&mut battle);
        battle
    }

    #[test]
    fn begin_melee_establishes_the_invariant() {
        let battle = melee_battle();
        assert_eq!(battle.phase, BattlePhase::Melee);
        assert!(battle.melee.is_some());
        let melee = battle.melee_state();
        assert_eq!(melee.active.len(), 2);
        assert_eq!(melee.exchange, 0);
        assert_eq!(melee.exchange_cap, MELEE_EXCHANGE_CAP);
        assert_eq!(melee.allies.len(), 2);
    }

    #[test]
    fn break_threshold_boundary_is_exact() {
        let mut conscript = MeleeOpponent::new(OpponentKind::Conscript, 1);
        conscript.max_health = 100;
        conscript.health = 35;
        assert!(conscript.past_break_threshold());
        conscript.health = 36;
        assert!(!conscript.past_break_threshold());
    }

    #[test]
    fn break_thresholds_per_kind() {
        let cases = [
            (OpponentKind::Conscript, 35),
            (OpponentKind::LineInfantry, 25),
            (OpponentKind::Veteran, 15),
            (OpponentKind::Sergeant, 0),
        ];
        for (kind, pct) in cases {
            assert_eq!(kind.break_threshold_pct(), pct);
            let mut opponent = MeleeOpponent::new(kind, 1);
            opponent.max_health = 100;
            opponent.health = pct;
            assert!(opponent.past_break_threshold(), "{kind:?} at threshold");
            if pct > 0 {
                opponent.health = pct + 1;
                assert!(!opponent.past_break_threshold(), "{kind:?} above threshold");
            }
        }
    }

    #[test]
    fn sergeants_fight_to_the_death() {
        let mut sergeant = MeleeOpponent::new(OpponentKind::Sergeant, 1);
        sergeant.health = 1;
        assert!(!sergeant.past_break_threshold());
        sergeant.health = 0;
        assert!(sergeant.past_break_threshold());
    }

    #[test]
    fn hit_chance_monotonic_in_skill_and_fatigue() {
        let base = |skill, fatigue| {
            hit_chance(
                skill,
                0.8,
                Stance::Balanced,
                AttackKind::Thrust,
                BodyPart::Torso,
                false,
                fatigue,
                false,
            )
        };
        assert!(base(80, 0.2) > base(40, 0.2));
        assert!(base(60, 0.1) > base(60, 0.8));
        let clamped = base(-500, 1.0);
        assert!(clamped >= MELEE_MIN_HIT_CHANCE - f64::EPSILON);
        let ceiling = hit_chance(
            500,
            1.0,
            Stance::Aggressive,
            AttackKind::Shoot,
            BodyPart::Torso,
            true,
            0.0,
            false,
        );
        assert!(ceiling <= MELEE_MAX_HIT_CHANCE + f64::EPSILON);
    }

    #[test]
    fn round_log_is_cleared_and_ordered_per_round() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(42);
        let entries = resolve_melee_round(
            &mut battle,
            MeleeAction::Attack {
                kind: AttackKind::Thrust,
                target: BodyPart::Torso,
            },
            &mut rng,
        );
        assert!(!entries.is_empty());
        assert_eq!(entries[0].actor_side, Side::Player);
        assert_eq!(entries[0].action, "thrust");
        if battle.phase == BattlePhase::Melee {
            assert_eq!(battle.melee_state().round_log, entries);
            let next = resolve_melee_round(&mut battle, MeleeAction::Guard, &mut rng);
            assert_eq!(next[0].action, "guard");
            if battle.phase == BattlePhase::Melee {
                assert_eq!(battle.melee_state().round_log, next);
            }
        }
    }

    #[test]
    fn reload_takes_two_rounds() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(9);
        battle.player.set_health(battle.player.max_health);
        battle.player.musket_loaded = false;
        let _ = resolve_melee_round(&mut battle, MeleeAction::Reload, &mut rng);
        assert!(!battle.player.musket_loaded);
        assert_eq!(battle.melee_state().reload_progress, 1);
        let _ = resolve_melee_round(&mut battle, MeleeAction::Reload, &mut rng);
        assert!(battle.player.musket_loaded);
        assert_eq!(battle.melee_state().reload_progress, 0);
    }

    #[test]
    fn second_wind_is_single_use() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(15);
        battle.player.set_stamina(20);
        let before = battle.player.stamina;
        let _ = resolve_melee_round(&mut battle, MeleeAction::SecondWind, &mut rng);
        assert!(battle.player.stamina > before);
        assert!(battle.melee_state().second_wind_used);
        assert!(!available_actions(&battle).contains(&"second_wind".to_string()));
    }

    #[test]
    fn canteen_heals_and_grants_a_counter() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(21);
        battle.player.set_health(30);
        let uses_before = battle.player.canteen_uses;
        let entries = resolve_melee_round(&mut battle, MeleeAction::Canteen, &mut rng);
        assert_eq!(battle.player.canteen_uses, uses_before - 1);
        assert!(
            entries
                .iter()
                .any(|entry| entry.special.contains("counter")),
            "expected a free counter-attack in the round log"
        );
    }

    #[test]
    fn flee_requires_breaking_morale_and_routs() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(27);
        assert!(!available_actions(&battle).contains(&"flee".to_string()));
        battle.player.set_morale(5);
        assert_eq!(battle.player.morale_threshold, MoraleThreshold::Breaking);
        assert!(available_actions(&battle).contains(&"flee".to_string()));
        let _ = resolve_melee_round(&mut battle, MeleeAction::Flee, &mut rng);
        assert_eq!(battle.outcome, BattleOutcome::Rout);
        assert!(battle.player.routing);
        assert!(battle.battle_over);
        assert!(battle.melee.is_none());
    }

    #[test]
    #[should_panic(expected = "flee is only available at Breaking morale")]
    fn flee_above_breaking_panics() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(31);
        let _ = resolve_melee_round(&mut battle, MeleeAction::Flee, &mut rng);
    }

    #[test]
    fn exchange_cap_ends_in_stalemate() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(33);
        battle.player.grace = 3;
        // Make the opponents unkillable so no decision can arrive before
        // the cap, then guard until both sides are spent.
        {
            let melee = battle.melee.as_mut().unwrap();
            for opponent in &mut melee.opponents {
                opponent.max_health = 9_999;
                opponent.health = 9_999;
            }
        }
        let mut rounds = 0;
        while battle.phase == BattlePhase::Melee && !battle.battle_over {
            battle.player.set_health(battle.player.max_health);
            battle.player.grace = 3;
            let _ = resolve_melee_round(&mut battle, MeleeAction::Guard, &mut rng);
            rounds += 1;
            assert!(rounds <= MELEE_EXCHANGE_CAP + 1, "cap did not fire");
        }
        assert_eq!(battle.outcome, BattleOutcome::Survived);
        assert!(battle.battle_over);
        assert!(battle.melee.is_none());
        assert_eq!(battle.phase, BattlePhase::Ended);
    }

    #[test]
    fn waves_activate_preseeded_opponents() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(35);
        battle.player.grace = 3;
        assert_eq!(battle.melee_state().opponents.len(), 3);
        assert!(!battle.melee_state().active.contains(&2));
        for _ in 0..5 {
            if battle.phase != BattlePhase::Melee || battle.battle_over {
                break;
            }
            battle.player.set_health(battle.player.max_health);
            let _ = resolve_melee_round(&mut battle, MeleeAction::Guard, &mut rng);
        }
        if battle.phase == BattlePhase::Melee {
            let melee = battle.melee_state();
            assert!(melee.waves[0].triggered);
            assert!(
                melee.active.contains(&2) || melee.opponents[2].is_defeated(),
                "wave opponent should have joined"
            );
        }
    }

    #[test]
    fn victory_awards_glory_per_kill() {
        let mut battle = melee_battle();
        let mut rng = SmallRng::seed_from_u64(39);
        // Collapse every opponent but leave the last one standing at 1 hp
        // so one thrust finishes the fight.
        {
            let melee = battle.melee.as_mut().unwrap();
            melee.waves.clear();
            for opponent in &mut melee.opponents[1..] {
                opponent.alive = false;
            }
            melee.active.retain(|i| *i == 0);
            melee.opponents[0].health = 1;
            melee.opponents[0].guarding = false;
            melee.target = 0;
        }
        battle.player.attributes.elan = 100;
        battle.player.set_morale(100);
        let mut rounds = 0;
        while battle.phase == BattlePhase::Melee && !battle.battle_over {
            battle.player.set_health(battle.player.max_health);
            let _ = resolve_melee_round(
                &mut battle,
                MeleeAction::Attack {
                    kind: AttackKind::Thrust,
                    target: BodyPart::Torso,
                },
                &mut rng,
            );
            rounds += 1;
            assert!(rounds < 50, "victory never arrived");
        }
        assert_eq!(battle.outcome, BattleOutcome::Victory);
        let kills = battle.glory_earned / GLORY_PER_KILL;
        assert!(kills >= 1, "at least the finishing kill counts");
        assert_eq!(battle.glory_earned % GLORY_PER_KILL, 0);
    }

    #[test]
    #[should_panic(expected = "melee resolved outside the Melee phase")]
    fn melee_round_outside_phase_panics() {
        let pc = PlayerCharacter::new("Test");
        let mut battle = BattleState::from_character(&pc, &create_campaign_npcs());
        let mut rng = SmallRng::seed_from_u64(1);
        let _ = resolve_melee_round(&mut battle, MeleeAction::Guard, &mut rng);
    }
}
