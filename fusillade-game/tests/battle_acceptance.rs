use fusillade_game::battle::{BattleState, health_capacity, stamina_capacity};
use fusillade_game::character::{MilitaryRank, PlayerCharacter};
use fusillade_game::npc::{
    NpcRole, SoldierRank, create_campaign_npcs, npc_to_officer, npc_to_soldier,
    sync_battle_to_npcs,
};
use fusillade_game::numbers::pct_from_pool;
use fusillade_game::tiers::{FatigueTier, HealthState, MoraleThreshold};

const NPC_EXPERIENCE_PER_BATTLE: i32 = 5;

fn fresh_character() -> PlayerCharacter {
    let mut pc = PlayerCharacter::new("Théodore Roche");
    pc.attributes.constitution = 45;
    pc.attributes.endurance = 40;
    pc.health = 100;
    pc.morale = 100;
    pc.stamina = 100;
    pc
}

#[test]
fn fresh_character_enters_battle_at_full_pools() {
    let pc = fresh_character();
    let battle = BattleState::from_character(&pc, &create_campaign_npcs());

    assert_eq!(battle.player.health, battle.player.max_health);
    assert_eq!(battle.player.stamina, battle.player.max_stamina);
    assert_eq!(battle.player.max_health, health_capacity(45));
    assert_eq!(battle.player.max_stamina, stamina_capacity(40));
    assert_eq!(battle.player.morale_threshold, MoraleThreshold::Steady);
    assert_eq!(battle.player.health_state, HealthState::Unhurt);
    assert_eq!(battle.player.fatigue_tier, FatigueTier::Fresh);
    assert!(battle.player.musket_loaded);
    assert!(battle.player.alive);
    assert!(!battle.player.routing);
}

#[test]
fn stamina_pools_dwarf_health_pools() {
    for stat in [0, 40, 100] {
        assert!(
            stamina_capacity(stat) > 2 * health_capacity(stat),
            "stamina pool must leave room for a melee's worth of actions"
        );
    }
}

#[test]
fn percentage_pools_round_trip_within_one_point() {
    let npcs = create_campaign_npcs();
    for pct in [0, 1, 17, 35, 50, 73, 99, 100] {
        let mut pc = fresh_character();
        pc.health = pct;
        pc.stamina = pct;
        let battle = BattleState::from_character(&pc, &npcs);
        let health_back = pct_from_pool(battle.player.health, battle.player.max_health);
        let stamina_back = pct_from_pool(battle.player.stamina, battle.player.max_stamina);
        assert!((health_back - pct).abs() <= 1, "health pct {pct} -> {health_back}");
        assert!(
            (stamina_back - pct).abs() <= 1,
            "stamina pct {pct} -> {stamina_back}"
        );
    }
}

#[test]
fn battle_line_outcomes_flow_back_to_the_roster() {
    let pc = fresh_character();
    let mut npcs = create_campaign_npcs();
    let mut battle = BattleState::from_character(&pc, &npcs);

    {
        let left = battle.line.left_neighbour.as_mut().unwrap();
        assert_eq!(left.npc_id, "pierre");
        left.wounded = true;
        left.morale = 60;
    }
    {
        let right = battle.line.right_neighbour.as_mut().unwrap();
        assert_eq!(right.npc_id, "jean_baptiste");
        right.routing = true;
        right.morale = 50;
    }

    sync_battle_to_npcs(&mut npcs, &battle);

    let pierre = npcs.iter().find(|npc| npc.id == "pierre").unwrap();
    assert!(pierre.wounded);
    assert_eq!(pierre.morale, 60);

    // Routing persists as zero morale, whatever the reported value says.
    let jean = npcs.iter().find(|npc| npc.id == "jean_baptiste").unwrap();
    assert_eq!(jean.morale, 0);
}

#[test]
fn null_neighbour_slot_is_skipped_by_the_sync() {
    let pc = fresh_character();
    let mut npcs = create_campaign_npcs();
    let mut battle = BattleState::from_character(&pc, &npcs);
    battle.line.right_neighbour = None;

    let before = npcs
        .iter()
        .find(|npc| npc.id == "jean_baptiste")
        .unwrap()
        .clone();
    sync_battle_to_npcs(&mut npcs, &battle);
    let after = npcs.iter().find(|npc| npc.id == "jean_baptiste").unwrap();

    // Untouched by the copy step; only the living-NPC experience increment
    // applies.
    assert_eq!(after.alive, before.alive);
    assert_eq!(after.wounded, before.wounded);
    assert_eq!(after.morale, before.morale);
    assert_eq!(
        after.experience,
        before.experience + NPC_EXPERIENCE_PER_BATTLE
    );
}

#[test]
fn officer_slot_always_syncs() {
    let pc = fresh_character();
    let mut npcs = create_campaign_npcs();
    let mut battle = BattleState::from_character(&pc, &npcs);
    battle.line.officer.wounded = true;
    battle.line.officer.alive = true;

    sync_battle_to_npcs(&mut npcs, &battle);
    let lefebvre = npcs.iter().find(|npc| npc.role == NpcRole::Officer).unwrap();
    assert!(lefebvre.wounded);
    assert!(lefebvre.alive);
}

#[test]
fn experience_increments_are_capped_and_skip_the_dead() {
    let pc = fresh_character();
    let mut npcs = create_campaign_npcs();
    for npc in &mut npcs {
        if npc.id == "duval" {
            npc.experience = 98;
        }
    }
    let mut battle = BattleState::from_character(&pc, &npcs);
    battle.line.left_neighbour.as_mut().unwrap().alive = false;
    let pierre_xp_before = npcs.iter().find(|npc| npc.id == "pierre").unwrap().experience;

    sync_battle_to_npcs(&mut npcs, &battle);

    let pierre = npcs.iter().find(|npc| npc.id == "pierre").unwrap();
    assert!(!pierre.alive);
    assert_eq!(pierre.experience, pierre_xp_before, "the dead earn nothing");

    let duval = npcs.iter().find(|npc| npc.id == "duval").unwrap();
    assert_eq!(duval.experience, 100, "experience caps at 100");

    let jean = npcs.iter().find(|npc| npc.id == "jean_baptiste").unwrap();
    assert_eq!(jean.experience, 5 + NPC_EXPERIENCE_PER_BATTLE);
}

#[test]
fn sync_is_total_over_every_slot_combination() {
    let pc = fresh_character();
    for (drop_left, drop_right) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut npcs = create_campaign_npcs();
        let mut battle = BattleState::from_character(&pc, &npcs);
        if drop_left {
            battle.line.left_neighbour = None;
        }
        if drop_right {
            battle.line.right_neighbour = None;
        }
        // Must never panic, whatever is absent.
        sync_battle_to_npcs(&mut npcs, &battle);
    }
}

#[test]
fn rank_fallthrough_holds_through_the_projection_api() {
    let mut npc = create_campaign_npcs().remove(0);
    for rank in MilitaryRank::ALL {
        npc.rank = rank;
        let soldier = npc_to_soldier(&npc);
        let officer = npc_to_officer(&npc);
        match rank {
            MilitaryRank::Sergeant => assert_eq!(soldier.rank, SoldierRank::Sergeant),
            MilitaryRank::Corporal => assert_eq!(soldier.rank, SoldierRank::Corporal),
            _ => assert_eq!(soldier.rank, SoldierRank::Private, "rank {rank}"),
        }
        match rank {
            MilitaryRank::Captain => assert_eq!(officer.abbreviation, "Capt."),
            MilitaryRank::Lieutenant => assert_eq!(officer.abbreviation, "Lt."),
            _ => assert_eq!(officer.abbreviation, "Sgt.", "rank {rank}"),
        }
        assert_eq!(
            officer.mounted,
            matches!(rank, MilitaryRank::Captain | MilitaryRank::Lieutenant)
        );
    }
}

#[test]
fn battle_state_survives_a_serde_round_trip() {
    let pc = fresh_character();
    let battle = BattleState::from_character(&pc, &create_campaign_npcs());
    let json = serde_json::to_string(&battle).unwrap();
    let back: BattleState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, battle);
}
