//! Game-loop orchestration across the Battle and Camp phases.
//!
//! The orchestrator owns the single live `BattleState` and the persistent
//! character/roster, and is the only place where state crosses a phase
//! boundary. Battle code never writes to the persistent records directly;
//! everything flows through the explicit sync in `enter_battle` /
//! `end_battle`, whose pool conversions are exact inverses modulo
//! rounding.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::battle::{BattleState, NarrativeEntry};
use crate::camp::{CampContext, CampState, create_camp_state};
use crate::character::{Attribute, PlayerCharacter};
use crate::constants::{
    CAMPAIGN_BATTLES, DEBUG_ENV_VAR, GLORY_GRACE_COST, GLORY_STAT_COST, GLORY_STAT_INCREASE,
    GRACE_CAP, LOG_BATTLE_ENTERED, LOG_CAMP_ENTERED, LOG_CAMPAIGN_STARTED, LOG_GLORY_GRACE,
    LOG_GLORY_STAT, LOG_NPC_SYNCED, LOG_SEED_SET, POST_BATTLE_CAMP_DAYS,
};
use crate::data::StoryData;
use crate::melee::{MeleeAction, RoundEntry};
use crate::npc::{Npc, create_campaign_npcs, sync_battle_to_npcs};
use crate::numbers::pct_from_pool;
use crate::result::{BattleReport, battle_report};
use crate::rng::RngBundle;
use crate::seed::encode_friendly;
use crate::volley::GorgeTarget;

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// Top-level phase of the campaign loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Battle,
    Camp,
}

/// Campaign progression bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// 1-based index of the battle being fought or prepared.
    pub current_battle: u8,
    /// Battle the next camp departure leads to.
    pub next_battle: u8,
    pub battles_fought: u32,
    pub day: u32,
}

impl Default for Campaign {
    fn default() -> Self {
        Self {
            current_battle: 1,
            next_battle: 1,
            battles_fought: 0,
            day: 1,
        }
    }
}

const BATTLE_SITES: [&str; 3] = ["Aspern", "the Sankt Veit gorge", "Wagram"];

fn battle_site(battle: u8) -> &'static str {
    let index = usize::from(battle.clamp(1, CAMPAIGN_BATTLES)) - 1;
    BATTLE_SITES[index]
}

/// Root game state spanning the whole campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub seed: u64,
    pub player: PlayerCharacter,
    pub npcs: Vec<Npc>,
    /// Exactly one battle is live at a time.
    #[serde(default)]
    pub battle: Option<BattleState>,
    #[serde(default)]
    pub camp: Option<CampState>,
    pub campaign: Campaign,
    /// Cross-battle currency earned from melee kills.
    #[serde(default)]
    pub glory: i32,
    #[serde(default)]
    pub last_report: Option<BattleReport>,
    pub logs: Vec<String>,
    #[serde(skip)]
    pub rng_bundle: Option<Rc<RngBundle>>,
    #[serde(skip)]
    pub story: Option<StoryData>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new("Recruit")
    }
}

impl GameState {
    /// Start a fresh campaign in the pre-battle camp.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let player = PlayerCharacter::new(name);
        let npcs = create_campaign_npcs();
        let camp = create_camp_state(&player, &npcs, "the assembly fields", 1, CampContext::PreBattle);
        Self {
            phase: GamePhase::Camp,
            seed: 0,
            player,
            npcs,
            battle: None,
            camp: Some(camp),
            campaign: Campaign::default(),
            glory: 0,
            last_report: None,
            logs: vec![String::from(LOG_CAMPAIGN_STARTED)],
            rng_bundle: None,
            story: None,
        }
    }

    /// Attach the campaign seed and derive the RNG streams from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng_bundle = Some(Rc::new(RngBundle::from_user_seed(seed)));
        self.logs.push(String::from(LOG_SEED_SET));
        self
    }

    /// Re-attach RNG streams and story data after a load.
    #[must_use]
    pub fn rehydrate(mut self, story: StoryData) -> Self {
        self.rng_bundle = Some(Rc::new(RngBundle::from_user_seed(self.seed)));
        self.story = Some(story);
        self
    }

    /// Friendly share code for this campaign's seed.
    #[must_use]
    pub fn share_code(&self) -> String {
        encode_friendly(self.seed)
    }

    fn ensure_rng_bundle(&mut self) -> Rc<RngBundle> {
        if self.rng_bundle.is_none() {
            self.rng_bundle = Some(Rc::new(RngBundle::from_user_seed(self.seed)));
        }
        self.rng_bundle.clone().expect("bundle just ensured")
    }

    /// The live battle.
    ///
    /// # Panics
    ///
    /// Panics when no battle is active; resolving battle logic without a
    /// battle is a programmer error.
    #[must_use]
    pub fn battle(&self) -> &BattleState {
        self.battle.as_ref().expect("no active battle")
    }

    /// Mutable access to the live battle. Same panics as [`Self::battle`].
    #[must_use]
    pub fn battle_mut(&mut self) -> &mut BattleState {
        self.battle.as_mut().expect("no active battle")
    }

    /// Camp → Battle transition.
    ///
    /// Copies the camp meters back onto the persistent character, rebuilds
    /// a fresh battle from it, and advances `current_battle` to
    /// `next_battle` unless the camp being left was the pre-battle camp.
    ///
    /// # Panics
    ///
    /// Panics outside the Camp phase.
    pub fn enter_battle(&mut self) {
        assert_eq!(self.phase, GamePhase::Camp, "enter_battle requires the Camp phase");
        let camp = self.camp.take().expect("Camp phase without camp state");

        self.player.health = camp.health;
        self.player.morale = camp.morale;
        self.player.stamina = camp.stamina;
        self.player.clamp();

        if camp.context != CampContext::PreBattle {
            self.campaign.current_battle = self.campaign.next_battle;
        }
        self.campaign.day = self.campaign.day.saturating_add(camp.days);

        let battle = BattleState::from_character(&self.player, &self.npcs)
            .with_battle_part(self.campaign.current_battle);
        if debug_log_enabled() {
            println!(
                "Entering battle {} at {} (health {}%, morale {}, stamina {}%)",
                self.campaign.current_battle,
                battle_site(self.campaign.current_battle),
                self.player.health,
                self.player.morale,
                self.player.stamina
            );
        }
        self.battle = Some(battle);
        self.phase = GamePhase::Battle;
        self.logs.push(String::from(LOG_BATTLE_ENTERED));
    }

    /// Battle → Camp transition.
    ///
    /// Writes battle deltas back to the persistent character (attributes,
    /// reputation and NCO approval verbatim; pools converted back to
    /// percentages as the exact inverse of the factory scaling), syncs the
    /// roster, banks glory, advances campaign counters and constructs the
    /// post-battle camp.
    ///
    /// # Panics
    ///
    /// Panics when no battle exists.
    pub fn end_battle(&mut self) {
        assert_eq!(self.phase, GamePhase::Battle, "end_battle requires the Battle phase");
        let battle = self.battle.take().expect("Battle phase without battle state");

        self.player.attributes = battle.player.attributes;
        self.player.reputation = battle.player.reputation;
        self.player.nco_approval = battle.player.nco_approval;
        self.player.grace = battle.player.grace;
        self.player.health = pct_from_pool(battle.player.health, battle.player.max_health);
        self.player.stamina = pct_from_pool(battle.player.stamina, battle.player.max_stamina);
        self.player.morale = battle.player.morale;
        self.player.clamp();

        sync_battle_to_npcs(&mut self.npcs, &battle);
        self.logs.push(String::from(LOG_NPC_SYNCED));

        self.glory += battle.glory_earned;
        self.campaign.battles_fought = self.campaign.battles_fought.saturating_add(1);
        self.campaign.day = self.campaign.day.saturating_add(1);
        self.campaign.next_battle = (self.campaign.current_battle + 1).min(CAMPAIGN_BATTLES);
        self.last_report = Some(battle_report(&battle));

        let site = battle_site(self.campaign.current_battle);
        self.camp = Some(create_camp_state(
            &self.player,
            &self.npcs,
            site,
            POST_BATTLE_CAMP_DAYS,
            CampContext::PostBattle,
        ));
        self.phase = GamePhase::Camp;
        self.logs.push(String::from(LOG_CAMP_ENTERED));
    }

    /// Take position in the line (leave the battle intro).
    pub fn begin_battle_line(&mut self) {
        self.battle_mut().begin_line_phase();
    }

    /// Resolve one drill step of the current volley.
    pub fn resolve_volley(&mut self) -> Vec<NarrativeEntry> {
        let bundle = self.ensure_rng_bundle();
        let battle = self.battle.as_mut().expect("no active battle");
        crate::volley::resolve_volley_step(battle, &mut *bundle.volley())
    }

    /// Resolve a gorge volley against the chosen target.
    pub fn resolve_gorge(&mut self, target: GorgeTarget) -> Vec<NarrativeEntry> {
        let bundle = self.ensure_rng_bundle();
        let battle = self.battle.as_mut().expect("no active battle");
        crate::volley::resolve_gorge_volley(battle, target, &mut *bundle.volley())
    }

    /// Play the pending charge story beat, entering the melee.
    pub fn advance_story(&mut self) -> Vec<NarrativeEntry> {
        let story = self
            .story
            .clone()
            .unwrap_or_else(StoryData::default_config);
        let battle = self.battle.as_mut().expect("no active battle");
        crate::volley::play_story_beat(battle, &story)
    }

    /// Resolve one melee round for the chosen action.
    pub fn resolve_melee(&mut self, action: MeleeAction) -> Vec<RoundEntry> {
        let bundle = self.ensure_rng_bundle();
        let battle = self.battle.as_mut().expect("no active battle");
        crate::melee::resolve_melee_round(battle, action, &mut *bundle.melee())
    }

    /// Spend banked glory on a permanent attribute increase.
    ///
    /// Returns false (leaving everything unchanged) when glory is short.
    pub fn spend_glory_on_stat(&mut self, attribute: Attribute) -> bool {
        if self.glory < GLORY_STAT_COST {
            return false;
        }
        self.glory -= GLORY_STAT_COST;
        let current = self.player.attributes.get(attribute);
        self.player
            .attributes
            .set(attribute, current + GLORY_STAT_INCREASE);
        self.logs.push(String::from(LOG_GLORY_STAT));
        true
    }

    /// Spend banked glory on a grace point, respecting the cap.
    pub fn spend_glory_on_grace(&mut self) -> bool {
        if self.glory < GLORY_GRACE_COST || self.player.grace >= GRACE_CAP {
            return false;
        }
        self.glory -= GLORY_GRACE_COST;
        self.player.add_grace();
        self.logs.push(String::from(LOG_GLORY_GRACE));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattlePhase;

    #[test]
    fn campaign_starts_in_the_pre_battle_camp() {
        let state = GameState::new("Théodore");
        assert_eq!(state.phase, GamePhase::Camp);
        let camp = state.camp.as_ref().unwrap();
        assert_eq!(camp.context, CampContext::PreBattle);
        assert_eq!(state.campaign.current_battle, 1);
        assert!(state.battle.is_none());
    }

    #[test]
    fn leaving_pre_battle_camp_does_not_consume_a_slot() {
        let mut state = GameState::new("Test").with_seed(11);
        state.enter_battle();
        assert_eq!(state.campaign.current_battle, 1);
        assert_eq!(state.phase, GamePhase::Battle);
        assert_eq!(state.battle().battle_part, 1);
        assert!(state.camp.is_none());
    }

    #[test]
    fn post_battle_camp_advances_to_next_battle() {
        let mut state = GameState::new("Test").with_seed(13);
        state.enter_battle();
        state.end_battle();
        assert_eq!(state.phase, GamePhase::Camp);
        assert_eq!(state.campaign.next_battle, 2);
        assert_eq!(state.campaign.battles_fought, 1);
        let camp = state.camp.as_ref().unwrap();
        assert_eq!(camp.context, CampContext::PostBattle);

        state.enter_battle();
        assert_eq!(state.campaign.current_battle, 2);
        assert_eq!(state.battle().battle_part, 2);
    }

    #[test]
    fn battle_to_camp_recovers_percentages_within_rounding() {
        let mut state = GameState::new("Test").with_seed(17);
        state.player.health = 73;
        state.player.stamina = 41;
        state.camp.as_mut().unwrap().health = 73;
        state.camp.as_mut().unwrap().stamina = 41;
        state.enter_battle();
        state.end_battle();
        assert!((state.player.health - 73).abs() <= 1);
        assert!((state.player.stamina - 41).abs() <= 1);
    }

    #[test]
    fn end_battle_banks_glory_and_reports() {
        let mut state = GameState::new("Test").with_seed(19);
        state.enter_battle();
        state.battle_mut().glory_earned = 75;
        state.battle_mut().mercy_shown = 1;
        state.end_battle();
        assert_eq!(state.glory, 75);
        let report = state.last_report.as_ref().unwrap();
        assert_eq!(report.glory_earned, 75);
        assert_eq!(report.mercy_shown, 1);
    }

    #[test]
    fn glory_purchases_respect_costs_and_caps() {
        let mut state = GameState::new("Test");
        state.glory = GLORY_STAT_COST - 1;
        assert!(!state.spend_glory_on_stat(Attribute::Elan));
        state.glory = GLORY_STAT_COST + GLORY_GRACE_COST;
        let elan_before = state.player.attributes.elan;
        assert!(state.spend_glory_on_stat(Attribute::Elan));
        assert_eq!(state.player.attributes.elan, elan_before + GLORY_STAT_INCREASE);

        state.player.grace = GRACE_CAP;
        assert!(!state.spend_glory_on_grace());
        state.player.grace = 0;
        assert!(state.spend_glory_on_grace());
        assert_eq!(state.player.grace, 1);
        assert_eq!(state.glory, 0);
    }

    #[test]
    fn volley_wrapper_uses_the_seeded_stream() {
        let mut first = GameState::new("Test").with_seed(99);
        let mut second = GameState::new("Test").with_seed(99);
        for state in [&mut first, &mut second] {
            state.enter_battle();
            state.begin_battle_line();
        }
        for _ in 0..8 {
            if first.battle().phase != BattlePhase::Line || first.battle().battle_over {
                break;
            }
            let a = first.resolve_volley();
            let b = second.resolve_volley();
            assert_eq!(a, b, "same seed must replay identically");
        }
    }

    #[test]
    #[should_panic(expected = "no active battle")]
    fn resolving_without_a_battle_panics() {
        let mut state = GameState::new("Test");
        let _ = state.resolve_volley();
    }

    #[test]
    #[should_panic(expected = "enter_battle requires the Camp phase")]
    fn double_enter_battle_panics() {
        let mut state = GameState::new("Test").with_seed(3);
        state.enter_battle();
        state.enter_battle();
    }
}
