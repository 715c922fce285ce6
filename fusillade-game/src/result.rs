//! End-of-battle report generation.
use serde::{Deserialize, Serialize};

use crate::battle::{BattleOutcome, BattleState};

/// Complete summary of one battle for the after-action screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub outcome: BattleOutcome,
    pub headline_key: String,
    pub turns: u32,
    pub volleys_fired: u32,
    pub shots_fired: u32,
    pub kills: u32,
    pub glory_earned: i32,
    pub mercy_shown: u32,
    pub wagon_detonated: bool,
    pub casualties_in_file: u32,
    pub duck_count: u32,
}

impl BattleOutcome {
    /// Translation key for the after-action headline.
    #[must_use]
    pub const fn headline_key(self) -> &'static str {
        match self {
            Self::Victory => "result.headline.victory",
            Self::Defeat => "result.headline.defeat",
            Self::Rout => "result.headline.rout",
            Self::Survived => "result.headline.survived",
            Self::Pending => "result.headline.pending",
        }
    }
}

/// Count of file mates lost across the battle.
fn casualties_in_file(battle: &BattleState) -> u32 {
    let mut lost = 0;
    for slot in [&battle.line.left_neighbour, &battle.line.right_neighbour] {
        if let Some(soldier) = slot
            && !soldier.alive
        {
            lost += 1;
        }
    }
    if !battle.line.officer.alive {
        lost += 1;
    }
    lost
}

/// Build the after-action report from a finished (or abandoned) battle.
#[must_use]
pub fn battle_report(battle: &BattleState) -> BattleReport {
    let kills = battle
        .melee
        .as_ref()
        .map_or_else(|| glory_kills(battle), |melee| melee.kills);
    BattleReport {
        outcome: battle.outcome,
        headline_key: battle.outcome.headline_key().to_string(),
        turns: battle.turn,
        volleys_fired: battle.volleys_fired,
        shots_fired: battle.player.shots_fired,
        kills,
        glory_earned: battle.glory_earned,
        mercy_shown: battle.mercy_shown,
        wagon_detonated: battle.wagon_detonated,
        casualties_in_file: casualties_in_file(battle),
        duck_count: battle.player.duck_count,
    }
}

/// Recover the kill count from the glory ledger once the melee state is
/// dropped at battle end.
fn glory_kills(battle: &BattleState) -> u32 {
    let per_kill = crate::constants::GLORY_PER_KILL;
    if per_kill <= 0 {
        return 0;
    }
    u32::try_from(battle.glory_earned / per_kill).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::PlayerCharacter;
    use crate::constants::GLORY_PER_KILL;
    use crate::npc::create_campaign_npcs;

    #[test]
    fn report_reads_from_battle_counters() {
        let pc = PlayerCharacter::new("Test");
        let mut battle = BattleState::from_character(&pc, &create_campaign_npcs());
        battle.turn = 7;
        battle.volleys_fired = 5;
        battle.player.shots_fired = 6;
        battle.mercy_shown = 2;
        battle.glory_earned = 3 * GLORY_PER_KILL;
        battle.outcome = BattleOutcome::Victory;

        let report = battle_report(&battle);
        assert_eq!(report.turns, 7);
        assert_eq!(report.volleys_fired, 5);
        assert_eq!(report.kills, 3);
        assert_eq!(report.mercy_shown, 2);
        assert_eq!(report.headline_key, "result.headline.victory");
    }

    #[test]
    fn fallen_file_mates_are_counted() {
        let pc = PlayerCharacter::new("Test");
        let mut battle = BattleState::from_character(&pc, &create_campaign_npcs());
        if let Some(left) = battle.line.left_neighbour.as_mut() {
            left.alive = false;
        }
        battle.line.officer.alive = false;
        let report = battle_report(&battle);
        assert_eq!(report.casualties_in_file, 2);
    }
}
