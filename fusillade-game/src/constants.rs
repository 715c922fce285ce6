//! Centralized balance and tuning constants for Fusillade game logic.
//!
//! These values define the deterministic math for the battle simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Logging keys -------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "FUSILLADE_DEBUG_LOGS";
pub(crate) const LOG_CAMPAIGN_STARTED: &str = "log.campaign.started";
pub(crate) const LOG_SEED_SET: &str = "log.seed-set";
pub(crate) const LOG_CAMP_ENTERED: &str = "log.camp.entered";
pub(crate) const LOG_BATTLE_ENTERED: &str = "log.battle.entered";
pub(crate) const LOG_GLORY_STAT: &str = "log.glory.stat";
pub(crate) const LOG_GLORY_GRACE: &str = "log.glory.grace";
pub(crate) const LOG_NPC_SYNCED: &str = "log.npc.synced";

// Pool scaling -------------------------------------------------------------
// Health capacity grows linearly with constitution; stamina capacity grows
// with endurance and is multiplied out so a battle's worth of melee actions
// fits inside it. Player morale always lives on the fixed 0-100 scale.
pub(crate) const HEALTH_POOL_BASE: i32 = 40;
pub(crate) const STAMINA_POOL_BASE: i32 = 50;
pub(crate) const STAMINA_POOL_MULT: i32 = 3;
pub(crate) const MORALE_SCALE_MAX: i32 = 100;

// Tier ladder cut points (closed on the upper tier) ------------------------
pub(crate) const MORALE_STEADY_RATIO: f64 = 0.75;
pub(crate) const MORALE_SHAKEN_RATIO: f64 = 0.40;
pub(crate) const MORALE_WAVERING_RATIO: f64 = 0.15;
pub(crate) const HEALTH_UNHURT_RATIO: f64 = 0.90;
pub(crate) const HEALTH_BRUISED_RATIO: f64 = 0.60;
pub(crate) const HEALTH_WOUNDED_RATIO: f64 = 0.25;
pub(crate) const FATIGUE_FRESH_RATIO: f64 = 0.70;
pub(crate) const FATIGUE_WINDED_RATIO: f64 = 0.45;
pub(crate) const FATIGUE_FATIGUED_RATIO: f64 = 0.20;

// Campaign roster ----------------------------------------------------------
pub(crate) const NPC_EXPERIENCE_PER_BATTLE: i32 = 5;
pub(crate) const NPC_EXPERIENCE_CAP: i32 = 100;
pub(crate) const NPC_MORALE_MAX: i32 = 100;

// Grace and glory ----------------------------------------------------------
pub(crate) const GRACE_CAP: u8 = 3;
pub(crate) const GLORY_PER_KILL: i32 = 25;
pub(crate) const GLORY_STAT_COST: i32 = 100;
pub(crate) const GLORY_STAT_INCREASE: i32 = 2;
pub(crate) const GLORY_GRACE_COST: i32 = 150;

// Volley tuning ------------------------------------------------------------
pub(crate) const VOLLEY_BASE_HIT_CHANCE: f64 = 0.28;
pub(crate) const VOLLEY_MUSKETRY_WEIGHT: f64 = 0.005;
pub(crate) const VOLLEY_RANGE_PENALTY_PER_PACE: f64 = 0.0012;
pub(crate) const VOLLEY_MIN_HIT_CHANCE: f64 = 0.05;
pub(crate) const VOLLEY_MAX_HIT_CHANCE: f64 = 0.90;
pub(crate) const VOLLEY_HIT_INTEGRITY_DAMAGE: i32 = 3;
pub(crate) const VOLLEY_HIT_STRENGTH_DAMAGE: i32 = 2;
pub(crate) const VOLLEY_HIT_MORALE_REWARD: i32 = 2;
pub(crate) const ENEMY_VOLLEY_BASE_HIT: f64 = 0.16;
pub(crate) const ENEMY_VOLLEY_RANGE_FALLOFF: f64 = 0.0009;
pub(crate) const ENEMY_VOLLEY_WOUND_MIN: i32 = 8;
pub(crate) const ENEMY_VOLLEY_WOUND_MAX: i32 = 22;
pub(crate) const ARTILLERY_WOUND_MIN: i32 = 14;
pub(crate) const ARTILLERY_WOUND_MAX: i32 = 30;
pub(crate) const ARTILLERY_INTEGRITY_DAMAGE: i32 = 8;
pub(crate) const NEIGHBOUR_HIT_CHANCE: f64 = 0.12;
pub(crate) const NEIGHBOUR_KILL_CHANCE: f64 = 0.35;
pub(crate) const NEIGHBOUR_FALLS_MORALE_LOSS: i32 = 8;
pub(crate) const NEIGHBOUR_ROUT_RATIO: f64 = 0.15;
pub(crate) const OFFICER_HIT_CHANCE: f64 = 0.03;
pub(crate) const ENDURE_MORALE_LOSS: i32 = 3;
pub(crate) const DRUMS_MORALE_BONUS: i32 = 1;
pub(crate) const RELOAD_STAMINA_COST: i32 = 6;
pub(crate) const RELOAD_BASE_FUMBLE: f64 = 0.06;
pub(crate) const RELOAD_FATIGUE_FUMBLE: f64 = 0.20;
pub(crate) const LINE_INTEGRITY_LOSS_PER_CASUALTY: i32 = 4;

// Gorge volley tuning ------------------------------------------------------
pub(crate) const GORGE_COLUMN_STRENGTH_MIN: i32 = 2;
pub(crate) const GORGE_COLUMN_STRENGTH_MAX: i32 = 5;
pub(crate) const GORGE_OFFICER_HIT_CHANCE: f64 = 0.22;
pub(crate) const GORGE_OFFICER_MORALE_SHOCK: i32 = 12;
pub(crate) const WAGON_DAMAGE_MIN: i32 = 10;
pub(crate) const WAGON_DAMAGE_MAX: i32 = 25;
pub(crate) const WAGON_DETONATION_CAP: i32 = 60;
pub(crate) const WAGON_DETONATION_STRENGTH_PENALTY: i32 = 18;
pub(crate) const MERCY_MORALE_REWARD: i32 = 3;
pub(crate) const MERCY_SOLDIER_REPUTATION: i32 = 2;

// Melee tuning -------------------------------------------------------------
pub(crate) const MELEE_EXCHANGE_CAP: u32 = 30;
pub(crate) const MELEE_MIN_HIT_CHANCE: f64 = 0.05;
pub(crate) const MELEE_MAX_HIT_CHANCE: f64 = 0.95;
pub(crate) const MELEE_SKILL_WEIGHT: f64 = 0.004;
pub(crate) const MELEE_MORALE_WEIGHT: f64 = 0.20;
pub(crate) const MELEE_FATIGUE_WEIGHT: f64 = 0.25;
pub(crate) const MELEE_RIPOSTE_BONUS: f64 = 0.15;
pub(crate) const MELEE_ARM_INJURY_PENALTY: f64 = 0.10;
pub(crate) const MELEE_GUARD_BLOCK_CHANCE: f64 = 0.45;
pub(crate) const MELEE_STANCE_GUARD_BONUS: f64 = 0.15;
pub(crate) const MELEE_STRENGTH_DAMAGE_DIVISOR: i32 = 12;
pub(crate) const MELEE_HEAD_DAMAGE_MULT: f64 = 1.5;
pub(crate) const MELEE_HEAD_STUN_CHANCE: f64 = 0.30;
pub(crate) const MELEE_HEAD_KILL_BONUS: f64 = 0.10;
pub(crate) const MELEE_STUN_ROUNDS: u8 = 1;
pub(crate) const MELEE_LEG_INJURY_COST_MULT: f64 = 1.5;
pub(crate) const RESPITE_STAMINA_RECOVERY: i32 = 24;
pub(crate) const RESPITE_MORALE_RECOVERY: i32 = 2;
pub(crate) const SECOND_WIND_STAMINA: i32 = 60;
pub(crate) const SECOND_WIND_MORALE_COST: i32 = 5;
pub(crate) const CANTEEN_STARTING_USES: u8 = 2;
pub(crate) const CANTEEN_HEAL: i32 = 15;
pub(crate) const AI_RESPITE_STAMINA_RATIO: f64 = 0.25;
pub(crate) const AI_GUARD_WEIGHT: u32 = 25;
pub(crate) const AI_ATTACK_WEIGHT: u32 = 65;
pub(crate) const AI_RESPITE_WEIGHT: u32 = 10;

// Enemy force defaults -----------------------------------------------------
pub(crate) const ENEMY_STARTING_RANGE: i32 = 300;
pub(crate) const ENEMY_STARTING_STRENGTH: i32 = 100;
pub(crate) const ENEMY_STARTING_INTEGRITY: i32 = 100;

// Campaign pacing ----------------------------------------------------------
pub(crate) const CAMPAIGN_BATTLES: u8 = 3;
pub(crate) const POST_BATTLE_CAMP_DAYS: u32 = 2;
