//! Scripted volley resolution for the line-combat phase.
//!
//! Line combat is a fixed script: each battle part owns a volley/range
//! table, and every resolution call advances the Present→Fire→Endure→Load
//! drill cycle exactly one step. Parts 2 and 3 substitute harsher enemy
//! configurations (artillery, cavalry, gorge volleys) at fixed indices;
//! these are table lookups, never computed.

use rand::Rng;

use crate::battle::{BattlePhase, BattleState, DrillStep, EntryKind, NarrativeEntry};
use crate::constants::{
    ARTILLERY_INTEGRITY_DAMAGE, ARTILLERY_WOUND_MAX, ARTILLERY_WOUND_MIN, DRUMS_MORALE_BONUS,
    ENDURE_MORALE_LOSS, ENEMY_VOLLEY_BASE_HIT, ENEMY_VOLLEY_RANGE_FALLOFF, ENEMY_VOLLEY_WOUND_MAX,
    ENEMY_VOLLEY_WOUND_MIN, GORGE_COLUMN_STRENGTH_MAX, GORGE_COLUMN_STRENGTH_MIN,
    GORGE_OFFICER_HIT_CHANCE, GORGE_OFFICER_MORALE_SHOCK, LINE_INTEGRITY_LOSS_PER_CASUALTY,
    MERCY_MORALE_REWARD, MERCY_SOLDIER_REPUTATION, NEIGHBOUR_FALLS_MORALE_LOSS,
    NEIGHBOUR_HIT_CHANCE, NEIGHBOUR_KILL_CHANCE, NEIGHBOUR_ROUT_RATIO, OFFICER_HIT_CHANCE,
    RELOAD_BASE_FUMBLE, RELOAD_FATIGUE_FUMBLE, RELOAD_STAMINA_COST, VOLLEY_BASE_HIT_CHANCE,
    VOLLEY_HIT_INTEGRITY_DAMAGE, VOLLEY_HIT_MORALE_REWARD, VOLLEY_HIT_STRENGTH_DAMAGE,
    VOLLEY_MAX_HIT_CHANCE, VOLLEY_MIN_HIT_CHANCE, VOLLEY_MUSKETRY_WEIGHT,
    VOLLEY_RANGE_PENALTY_PER_PACE, WAGON_DAMAGE_MAX, WAGON_DAMAGE_MIN, WAGON_DETONATION_CAP,
    WAGON_DETONATION_STRENGTH_PENALTY,
};
use crate::data::StoryData;
use crate::npc::{OfficerStatus, Soldier};
use crate::numbers::pool_ratio;
use crate::tiers::{MoraleThreshold, morale_threshold};

/// One row of a scripted volley table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolleyStep {
    pub range_paces: i32,
    pub enemy_fire: bool,
    pub artillery: bool,
    pub cavalry: bool,
    pub gorge: bool,
}

const fn step(range_paces: i32, enemy_fire: bool) -> VolleyStep {
    VolleyStep {
        range_paces,
        enemy_fire,
        artillery: false,
        cavalry: false,
        gorge: false,
    }
}

const PART_ONE_VOLLEYS: &[VolleyStep] = &[
    step(300, false),
    step(250, true),
    step(200, true),
    step(150, true),
    step(100, true),
    step(60, true),
];

// Part 2 is the gorge: the battalion fires down into a packed defile.
const PART_TWO_VOLLEYS: &[VolleyStep] = &[
    VolleyStep {
        range_paces: 140,
        enemy_fire: false,
        artillery: false,
        cavalry: false,
        gorge: true,
    },
    VolleyStep {
        range_paces: 120,
        enemy_fire: true,
        artillery: false,
        cavalry: false,
        gorge: true,
    },
    VolleyStep {
        range_paces: 100,
        enemy_fire: true,
        artillery: true,
        cavalry: false,
        gorge: true,
    },
    VolleyStep {
        range_paces: 80,
        enemy_fire: true,
        artillery: true,
        cavalry: false,
        gorge: false,
    },
];

const PART_THREE_VOLLEYS: &[VolleyStep] = &[
    VolleyStep {
        range_paces: 250,
        enemy_fire: true,
        artillery: true,
        cavalry: false,
        gorge: false,
    },
    VolleyStep {
        range_paces: 200,
        enemy_fire: true,
        artillery: true,
        cavalry: false,
        gorge: false,
    },
    VolleyStep {
        range_paces: 150,
        enemy_fire: true,
        artillery: false,
        cavalry: true,
        gorge: false,
    },
    VolleyStep {
        range_paces: 100,
        enemy_fire: true,
        artillery: false,
        cavalry: true,
        gorge: false,
    },
    VolleyStep {
        range_paces: 60,
        enemy_fire: true,
        artillery: false,
        cavalry: true,
        gorge: false,
    },
];

/// Volley table for a battle part (clamped to the known parts).
#[must_use]
pub const fn volley_table(part: u8) -> &'static [VolleyStep] {
    match part {
        2 => PART_TWO_VOLLEYS,
        3 => PART_THREE_VOLLEYS,
        _ => PART_ONE_VOLLEYS,
    }
}

/// Table row for the battle's current scripted volley.
///
/// `scripted_volley` is 1-based and always indexes validly for the current
/// part; the final row is held for any overrun.
#[must_use]
pub fn current_volley_step(battle: &BattleState) -> VolleyStep {
    let table = volley_table(battle.battle_part);
    let index = battle.scripted_volley.saturating_sub(1).min(table.len() - 1);
    table[index]
}

/// Whether the battle is currently on a gorge volley.
#[must_use]
pub fn current_volley_is_gorge(battle: &BattleState) -> bool {
    battle.phase == BattlePhase::Line && current_volley_step(battle).gorge
}

/// Discrete fire target for a gorge volley.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GorgeTarget {
    Column,
    Officer,
    Wagon,
    Mercy,
}

fn refresh_enemy_morale(battle: &mut BattleState) {
    battle.enemy.morale = morale_threshold(battle.enemy.line_integrity, 100);
}

fn refresh_line_morale(battle: &mut BattleState) {
    let officer_penalty = if battle.line.officer.alive { 0 } else { 20 };
    battle.line.line_morale =
        morale_threshold(battle.line.line_integrity - officer_penalty, 100);
}

/// Resolve one drill step of the current scripted volley.
///
/// Returns the narrative entries produced by this step; the same entries
/// are appended to the battle log.
///
/// # Panics
///
/// Panics when called outside the Line phase, on a finished battle, or on
/// the Fire step of a gorge volley (which requires a target and goes
/// through [`resolve_gorge_volley`]).
pub fn resolve_volley_step<R: Rng>(battle: &mut BattleState, rng: &mut R) -> Vec<NarrativeEntry> {
    assert_eq!(
        battle.phase,
        BattlePhase::Line,
        "volley resolved outside the Line phase"
    );
    assert!(!battle.battle_over, "volley resolved on a finished battle");
    let volley = current_volley_step(battle);
    assert!(
        !(volley.gorge && battle.drill_step == DrillStep::Fire),
        "gorge volleys require a target; use resolve_gorge_volley"
    );

    let log_mark = battle.log.len();
    match battle.drill_step {
        DrillStep::Present => resolve_present(battle, volley),
        DrillStep::Fire => resolve_fire(battle, rng),
        DrillStep::Endure => resolve_endure(battle, volley, rng),
        DrillStep::Load => resolve_load(battle, rng),
    }
    battle.drill_step = battle.drill_step.next();
    battle.refresh_available_actions();
    battle.log[log_mark..].to_vec()
}

fn resolve_present(battle: &mut BattleState, volley: VolleyStep) {
    battle.enemy.range = volley.range_paces;
    battle.push_log(
        EntryKind::Order,
        format!("Present! The enemy stands at {} paces.", volley.range_paces),
    );
    if volley.artillery && !battle.enemy.artillery {
        battle.enemy.artillery = true;
        battle.push_log(
            EntryKind::Event,
            "Enemy guns unlimber on the ridge and open on the battalion.",
        );
    }
    if volley.cavalry && !battle.enemy.cavalry_threat {
        battle.enemy.cavalry_threat = true;
        battle.push_log(
            EntryKind::Event,
            "Lancers walk their horses out of the treeline, watching for a gap.",
        );
    }
}

fn resolve_fire<R: Rng>(battle: &mut BattleState, rng: &mut R) {
    if battle.player.fumbled_load {
        battle.player.fumbled_load = false;
        battle.push_log(
            EntryKind::Result,
            "Your hammer falls on a fouled pan. The volley rolls past without you.",
        );
        return;
    }
    if !battle.player.musket_loaded {
        battle.push_log(
            EntryKind::Result,
            "Your musket is empty. You shoulder it and hold the line.",
        );
        return;
    }

    battle.push_log(EntryKind::Order, "Fire!");
    battle.player.musket_loaded = false;
    battle.player.shots_fired += 1;
    battle.volleys_fired += 1;

    let chance = (VOLLEY_BASE_HIT_CHANCE
        + f64::from(battle.player.attributes.musketry) * VOLLEY_MUSKETRY_WEIGHT
        - f64::from(battle.enemy.range) * VOLLEY_RANGE_PENALTY_PER_PACE)
        .clamp(VOLLEY_MIN_HIT_CHANCE, VOLLEY_MAX_HIT_CHANCE);
    if rng.random::<f64>() < chance {
        battle.enemy.line_integrity =
            (battle.enemy.line_integrity - VOLLEY_HIT_INTEGRITY_DAMAGE).max(0);
        battle.enemy.strength = (battle.enemy.strength - VOLLEY_HIT_STRENGTH_DAMAGE).max(0);
        battle.queue_morale_shift(VOLLEY_HIT_MORALE_REWARD, "volley told");
        battle.push_log(
            EntryKind::Result,
            "A man drops out of the opposing rank where you aimed.",
        );
    } else {
        battle.push_log(
            EntryKind::Result,
            "Smoke swallows the ball. No telling where it went.",
        );
    }
    refresh_enemy_morale(battle);
}

fn endure_soldier_fire<R: Rng>(soldier: &mut Soldier, rng: &mut R) -> (bool, bool) {
    if !soldier.alive || rng.random::<f64>() >= NEIGHBOUR_HIT_CHANCE {
        return (false, false);
    }
    if rng.random::<f64>() < NEIGHBOUR_KILL_CHANCE {
        soldier.alive = false;
        return (true, true);
    }
    soldier.wounded = true;
    soldier.morale = (soldier.morale - 20).clamp(0, soldier.morale_max);
    soldier.threshold = morale_threshold(soldier.morale, soldier.morale_max);
    if soldier.threshold == MoraleThreshold::Breaking
        && pool_ratio(soldier.morale, soldier.morale_max) < NEIGHBOUR_ROUT_RATIO
    {
        soldier.routing = true;
    }
    (true, false)
}

fn resolve_endure<R: Rng>(battle: &mut BattleState, volley: VolleyStep, rng: &mut R) {
    if !volley.enemy_fire {
        battle.push_log(
            EntryKind::Narrative,
            "The enemy line holds its fire, closing the distance in silence.",
        );
        return;
    }

    battle.push_log(EntryKind::Event, "The opposing rank vanishes in smoke.");

    // Musketry against the player.
    let chance = (ENEMY_VOLLEY_BASE_HIT
        + f64::from((300 - battle.enemy.range).max(0)) * ENEMY_VOLLEY_RANGE_FALLOFF)
        .clamp(0.05, 0.50);
    if rng.random::<f64>() < chance {
        let wound = rng.random_range(ENEMY_VOLLEY_WOUND_MIN..=ENEMY_VOLLEY_WOUND_MAX);
        battle.player.set_health(battle.player.health - wound);
        battle.push_log(
            EntryKind::Result,
            "A ball tears through your sleeve and the arm beneath it.",
        );
        if battle.resolve_fatal_wound() {
            return;
        }
    }

    // Round shot, if the guns are in action.
    if battle.enemy.artillery {
        if rng.random::<f64>() < 0.25 {
            let aware = f64::from(battle.player.attributes.awareness) / 200.0;
            if rng.random::<f64>() < aware {
                battle.player.duck_count += 1;
                battle.push_log(
                    EntryKind::Action,
                    "You hear the shot coming and drop. It passes through the rank behind.",
                );
            } else {
                let wound = rng.random_range(ARTILLERY_WOUND_MIN..=ARTILLERY_WOUND_MAX);
                battle.player.set_health(battle.player.health - wound);
                battle.push_log(EntryKind::Result, "Grapeshot rakes the company front.");
                if battle.resolve_fatal_wound() {
                    return;
                }
            }
        }
        battle.line.line_integrity =
            (battle.line.line_integrity - ARTILLERY_INTEGRITY_DAMAGE).max(0);
    }

    // The file mates on either side.
    let mut casualties = 0u32;
    let mut fallen_names: Vec<String> = Vec::new();
    for slot in [&mut battle.line.left_neighbour, &mut battle.line.right_neighbour] {
        if let Some(soldier) = slot.as_mut() {
            let (hit, killed) = endure_soldier_fire(soldier, rng);
            if killed {
                casualties += 1;
                fallen_names.push(format!("{} falls in the file beside you", soldier.name));
            } else if hit && soldier.routing {
                fallen_names.push(format!("{} breaks from the line", soldier.name));
            }
        }
    }
    for name in &fallen_names {
        battle.push_log(EntryKind::Event, format!("{name}."));
    }
    if casualties > 0 {
        battle.line.casualties_this_turn += casualties;
        battle.line.line_integrity = (battle.line.line_integrity
            - LINE_INTEGRITY_LOSS_PER_CASUALTY * i32::try_from(casualties).unwrap_or(0))
        .max(0);
        battle.queue_morale_shift(
            -NEIGHBOUR_FALLS_MORALE_LOSS * i32::try_from(casualties).unwrap_or(0),
            "file mate down",
        );
    }

    // The officer is a target too, mounted above the smoke.
    if battle.line.officer.alive && rng.random::<f64>() < OFFICER_HIT_CHANCE {
        if battle.line.officer.wounded {
            battle.line.officer.alive = false;
            battle.queue_morale_shift(-10, "officer killed");
            battle.push_log(
                EntryKind::Event,
                format!("{} goes down and does not rise.", battle.line.officer.name),
            );
        } else {
            battle.line.officer.wounded = true;
            battle.line.officer.status = OfficerStatus::Wounded;
            battle.push_log(
                EntryKind::Event,
                format!("{} sways in the saddle, hit.", battle.line.officer.name),
            );
        }
    }

    let steady_bonus = if battle.line.drums_playing {
        DRUMS_MORALE_BONUS
    } else {
        0
    };
    battle.queue_morale_shift(-(ENDURE_MORALE_LOSS - steady_bonus), "under fire");
    refresh_line_morale(battle);
}

fn resolve_load<R: Rng>(battle: &mut BattleState, rng: &mut R) {
    battle.push_log(EntryKind::Order, "Load!");
    battle.player.set_stamina(battle.player.stamina - RELOAD_STAMINA_COST);

    let fumble_chance =
        RELOAD_BASE_FUMBLE + battle.player.fatigue_ratio() * RELOAD_FATIGUE_FUMBLE;
    if rng.random::<f64>() < fumble_chance {
        battle.player.fumbled_load = true;
        battle.player.musket_loaded = false;
        battle.push_log(
            EntryKind::Action,
            "Your hands shake on the ramrod and the charge seats badly.",
        );
    } else {
        battle.player.musket_loaded = true;
        battle.push_log(EntryKind::Action, "Cartridge bitten, rammed, primed.");
    }

    for slot in [&mut battle.line.left_neighbour, &mut battle.line.right_neighbour] {
        if let Some(soldier) = slot.as_mut()
            && soldier.alive
            && !soldier.routing
        {
            soldier.musket_loaded = true;
        }
    }

    battle.apply_pending_morale();
    refresh_line_morale(battle);

    battle.turn += 1;
    battle.line.casualties_this_turn = 0;
    battle.scripted_volley += 1;

    if battle.scripted_volley > volley_table(battle.battle_part).len() {
        battle.phase = BattlePhase::Story;
        battle.push_log(
            EntryKind::Event,
            "An aide gallops down the line. The order is coming: fix bayonets.",
        );
    }
}

/// Resolve the Fire step of a gorge volley against a chosen target.
///
/// Same contract as [`resolve_volley_step`], but the player picks where
/// the ball goes instead of firing blind into the line.
///
/// # Panics
///
/// Panics unless the battle is on the Fire step of a gorge volley.
pub fn resolve_gorge_volley<R: Rng>(
    battle: &mut BattleState,
    target: GorgeTarget,
    rng: &mut R,
) -> Vec<NarrativeEntry> {
    assert_eq!(
        battle.phase,
        BattlePhase::Line,
        "gorge volley resolved outside the Line phase"
    );
    assert!(
        current_volley_step(battle).gorge && battle.drill_step == DrillStep::Fire,
        "gorge volley resolved outside a gorge Fire step"
    );

    let log_mark = battle.log.len();
    match target {
        GorgeTarget::Mercy => {
            battle.mercy_shown += 1;
            battle.player.set_morale(battle.player.morale + MERCY_MORALE_REWARD);
            battle.player.reputation.soldier =
                (battle.player.reputation.soldier + MERCY_SOLDIER_REPUTATION).clamp(0, 100);
            battle.push_log(
                EntryKind::Action,
                "You lift your muzzle and let the wounded crawl for the rocks.",
            );
        }
        _ if !battle.player.musket_loaded || battle.player.fumbled_load => {
            battle.player.fumbled_load = false;
            battle.push_log(
                EntryKind::Result,
                "Your musket misfires into the gorge's echo.",
            );
        }
        GorgeTarget::Column => {
            battle.player.musket_loaded = false;
            battle.player.shots_fired += 1;
            battle.volleys_fired += 1;
            let damage = rng.random_range(GORGE_COLUMN_STRENGTH_MIN..=GORGE_COLUMN_STRENGTH_MAX);
            battle.enemy.strength = (battle.enemy.strength - damage).max(0);
            battle.enemy.line_integrity = (battle.enemy.line_integrity - damage).max(0);
            battle.push_log(
                EntryKind::Result,
                "You fire into the packed column. It is impossible to miss.",
            );
        }
        GorgeTarget::Officer => {
            battle.player.musket_loaded = false;
            battle.player.shots_fired += 1;
            battle.volleys_fired += 1;
            if rng.random::<f64>() < GORGE_OFFICER_HIT_CHANCE {
                battle.enemy.line_integrity =
                    (battle.enemy.line_integrity - GORGE_OFFICER_MORALE_SHOCK).max(0);
                battle.push_log(
                    EntryKind::Result,
                    "The officer on the grey horse folds. The column shudders.",
                );
            } else {
                battle.push_log(
                    EntryKind::Result,
                    "The officer's horse rears; the man himself rides on.",
                );
            }
        }
        GorgeTarget::Wagon => {
            battle.player.musket_loaded = false;
            battle.player.shots_fired += 1;
            battle.volleys_fired += 1;
            let damage = rng.random_range(WAGON_DAMAGE_MIN..=WAGON_DAMAGE_MAX);
            battle.wagon_damage += damage;
            battle.push_log(
                EntryKind::Result,
                "Splinters fly off the powder wagon's boards.",
            );
            if battle.wagon_damage >= WAGON_DETONATION_CAP {
                detonate_wagon(battle);
            }
        }
    }
    refresh_enemy_morale(battle);

    battle.drill_step = battle.drill_step.next();
    battle.refresh_available_actions();
    battle.log[log_mark..].to_vec()
}

/// Apply the one-time wagon detonation.
///
/// Idempotent: repeated calls for the same detonation cannot apply the
/// strength penalty twice.
pub fn detonate_wagon(battle: &mut BattleState) {
    if battle.wagon_detonated {
        return;
    }
    battle.wagon_detonated = true;
    battle.enemy.strength =
        (battle.enemy.strength - WAGON_DETONATION_STRENGTH_PENALTY).max(0);
    battle.push_log(
        EntryKind::Event,
        "The wagon goes up in a column of flame that silences both lines.",
    );
}

/// Play the pending charge story beat and hand the battle to the melee.
///
/// # Panics
///
/// Panics when called outside the Story phase.
pub fn play_story_beat(battle: &mut BattleState, story: &StoryData) -> Vec<NarrativeEntry> {
    assert_eq!(
        battle.phase,
        BattlePhase::Story,
        "story beat played outside the Story phase"
    );
    let log_mark = battle.log.len();
    battle.charge_encounter += 1;
    if let Some(beat) = story.beat_for_encounter(battle.charge_encounter) {
        let lines: Vec<String> = beat.lines.clone();
        let delta = beat.morale_delta;
        for line in lines {
            battle.push_log(EntryKind::Narrative, line);
        }
        if delta != 0 {
            battle.player.set_morale(battle.player.morale + delta);
        }
    }
    crate::melee::begin_melee(battle);
    battle.refresh_available_actions();
    battle.log[log_mark..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::PlayerCharacter;
    use crate::npc::create_campaign_npcs;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn line_battle(part: u8) -> BattleState {
        let pc = PlayerCharacter::new("Test");
        let mut battle =
            BattleState::from_character(&pc, &create_campaign_npcs()).with_battle_part(part);
        battle.begin_line_phase();
        battle
    }

    #[test]
    fn tables_are_indexable_for_every_scripted_volley() {
        for part in 1..=3u8 {
            let table = volley_table(part);
            assert!(!table.is_empty());
            let mut battle = line_battle(part);
            for volley in 1..=table.len() {
                battle.scripted_volley = volley;
                let step = current_volley_step(&battle);
                assert!(step.range_paces > 0);
            }
        }
    }

    #[test]
    fn drill_step_advances_exactly_once_per_call() {
        let mut battle = line_battle(1);
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(battle.drill_step, DrillStep::Present);
        let _ = resolve_volley_step(&mut battle, &mut rng);
        assert_eq!(battle.drill_step, DrillStep::Fire);
        let _ = resolve_volley_step(&mut battle, &mut rng);
        assert_eq!(battle.drill_step, DrillStep::Endure);
        let _ = resolve_volley_step(&mut battle, &mut rng);
        assert_eq!(battle.drill_step, DrillStep::Load);
        let _ = resolve_volley_step(&mut battle, &mut rng);
        assert_eq!(battle.drill_step, DrillStep::Present);
        assert_eq!(battle.scripted_volley, 2);
        assert_eq!(battle.turn, 1);
    }

    #[test]
    fn fire_consumes_the_loaded_musket() {
        let mut battle = line_battle(1);
        let mut rng = SmallRng::seed_from_u64(11);
        let _ = resolve_volley_step(&mut battle, &mut rng); // Present
        assert!(battle.player.musket_loaded);
        let _ = resolve_volley_step(&mut battle, &mut rng); // Fire
        assert!(!battle.player.musket_loaded);
        assert_eq!(battle.player.shots_fired, 1);
    }

    #[test]
    fn line_phase_runs_to_story_phase() {
        let mut battle = line_battle(1);
        let mut rng = SmallRng::seed_from_u64(3);
        battle.player.grace = 3;
        let mut guard = 0;
        while battle.phase == BattlePhase::Line && !battle.battle_over {
            let _ = resolve_volley_step(&mut battle, &mut rng);
            guard += 1;
            assert!(guard < 100, "line phase failed to terminate");
        }
        assert_eq!(battle.phase, BattlePhase::Story);
        assert!(battle.scripted_volley > volley_table(1).len());
    }

    #[test]
    fn log_is_append_only_through_resolution() {
        let mut battle = line_battle(1);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut previous: Vec<NarrativeEntry> = battle.log.clone();
        for _ in 0..8 {
            if battle.phase != BattlePhase::Line || battle.battle_over {
                break;
            }
            let _ = resolve_volley_step(&mut battle, &mut rng);
            assert!(battle.log.len() >= previous.len());
            assert_eq!(&battle.log[..previous.len()], &previous[..]);
            previous = battle.log.clone();
        }
    }

    #[test]
    fn gorge_wagon_detonates_exactly_once() {
        let mut battle = line_battle(2);
        battle.wagon_damage = WAGON_DETONATION_CAP;
        let strength_before = battle.enemy.strength;
        detonate_wagon(&mut battle);
        assert!(battle.wagon_detonated);
        assert_eq!(
            battle.enemy.strength,
            strength_before - WAGON_DETONATION_STRENGTH_PENALTY
        );
        // Repeated detonation calls must not stack the penalty.
        detonate_wagon(&mut battle);
        detonate_wagon(&mut battle);
        assert_eq!(
            battle.enemy.strength,
            strength_before - WAGON_DETONATION_STRENGTH_PENALTY
        );
    }

    #[test]
    fn gorge_mercy_increments_counter_and_keeps_load() {
        let mut battle = line_battle(2);
        let mut rng = SmallRng::seed_from_u64(13);
        let _ = resolve_volley_step(&mut battle, &mut rng); // Present
        assert!(current_volley_is_gorge(&battle));
        let _ = resolve_gorge_volley(&mut battle, GorgeTarget::Mercy, &mut rng);
        assert_eq!(battle.mercy_shown, 1);
        assert!(battle.player.musket_loaded);
        assert_eq!(battle.drill_step, DrillStep::Endure);
    }

    #[test]
    fn gorge_wagon_penalty_is_single_shot_across_volleys() {
        let mut battle = line_battle(2);
        let mut rng = SmallRng::seed_from_u64(17);
        battle.wagon_damage = WAGON_DETONATION_CAP - 1;
        let strength_before = battle.enemy.strength;
        let _ = resolve_volley_step(&mut battle, &mut rng); // Present
        let _ = resolve_gorge_volley(&mut battle, GorgeTarget::Wagon, &mut rng);
        assert!(battle.wagon_detonated);
        let after_first = battle.enemy.strength;
        assert_eq!(after_first, strength_before - WAGON_DETONATION_STRENGTH_PENALTY);
        detonate_wagon(&mut battle);
        assert_eq!(battle.enemy.strength, after_first);
    }

    #[test]
    #[should_panic(expected = "gorge volleys require a target")]
    fn blind_fire_panics_on_gorge_volley() {
        let mut battle = line_battle(2);
        let mut rng = SmallRng::seed_from_u64(19);
        let _ = resolve_volley_step(&mut battle, &mut rng); // Present
        let _ = resolve_volley_step(&mut battle, &mut rng); // Fire: must panic
    }

    #[test]
    #[should_panic(expected = "volley resolved outside the Line phase")]
    fn volley_outside_line_phase_panics() {
        let pc = PlayerCharacter::new("Test");
        let mut battle = BattleState::from_character(&pc, &create_campaign_npcs());
        let mut rng = SmallRng::seed_from_u64(23);
        let _ = resolve_volley_step(&mut battle, &mut rng);
    }
}
