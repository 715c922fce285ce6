//! Fusillade Game Engine
//!
//! Platform-agnostic core game logic for Fusillade, a narrative Napoleonic
//! line-infantry battle game. This crate provides all battle, melee, camp
//! and campaign mechanics without UI or platform-specific dependencies.

pub mod battle;
pub mod camp;
pub mod character;
pub mod constants;
pub mod data;
pub mod game;
pub mod melee;
pub mod npc;
pub mod numbers;
pub mod result;
pub mod rng;
pub mod seed;
pub mod tiers;
pub mod volley;

// Re-export commonly used types
pub use battle::{
    BattleOutcome, BattlePhase, BattlePlayer, BattleState, DrillStep, EnemyForce, EnemyQuality,
    EntryKind, LineState, MoraleShift, NarrativeEntry, health_capacity, stamina_capacity,
};
pub use camp::{CampContext, CampEvent, CampState, create_camp_state};
pub use character::{
    Attribute, Attributes, Equipment, MilitaryRank, PlayerCharacter, Reputation,
};
pub use data::{StoryBeat, StoryData, StoryDataError};
pub use game::{Campaign, GamePhase, GameState};
pub use melee::{
    AttackKind, BodyPart, MeleeAction, MeleeAlly, MeleeOpponent, MeleeState, OpponentKind,
    RoundEntry, Side, Stance, WaveEvent, available_actions, begin_melee, hit_chance,
    resolve_melee_round, set_stance, set_target,
};
pub use npc::{
    Npc, NpcRole, Officer, OfficerStatus, Soldier, SoldierRank, create_campaign_npcs,
    npc_to_officer, npc_to_soldier, officer_abbreviation, sync_battle_to_npcs,
};
pub use result::{BattleReport, battle_report};
pub use rng::{CountingRng, RngBundle};
pub use seed::{decode_to_seed, encode_friendly, generate_code_from_entropy};
pub use tiers::{
    FatigueTier, HealthState, MoraleThreshold, fatigue_tier, fatigue_tier_from_ratio,
    health_state, health_state_from_ratio, morale_threshold, morale_threshold_from_ratio,
};
pub use volley::{
    GorgeTarget, VolleyStep, current_volley_is_gorge, detonate_wagon, play_story_beat,
    resolve_gorge_volley, resolve_volley_step, volley_table,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the charge story-beat data from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the story data cannot be loaded.
    fn load_story_data(&self) -> Result<StoryData, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save game state
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be saved.
    fn save_game(&self, save_name: &str, game_state: &GameState) -> Result<(), Self::Error>;

    /// Load game state
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<GameState>, Self::Error>;

    /// Delete saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;

    /// Persist the cross-campaign glory counter
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be saved.
    fn save_glory(&self, glory: i32) -> Result<(), Self::Error>;

    /// Load the cross-campaign glory counter
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be loaded.
    fn load_glory(&self) -> Result<Option<i32>, Self::Error>;
}

/// Main game engine for managing campaign instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Create a new campaign with the specified name and seed
    ///
    /// # Errors
    ///
    /// Returns an error if the story data cannot be loaded.
    pub fn create_campaign(&self, name: &str, seed: u64) -> Result<GameState, L::Error> {
        let story = self.data_loader.load_story_data()?;
        let mut state = GameState::new(name).with_seed(seed);
        state.story = Some(story);
        Ok(state)
    }

    /// Save a campaign and its glory counter
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be saved.
    pub fn save_game(&self, save_name: &str, game_state: &GameState) -> Result<(), S::Error> {
        self.storage.save_game(save_name, game_state)?;
        self.storage.save_glory(game_state.glory)
    }

    /// Load a campaign, rehydrating RNG streams and story data
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be loaded or rehydrated.
    pub fn load_game(&self, save_name: &str) -> Result<Option<GameState>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        if let Some(game_state) = self.storage.load_game(save_name).map_err(Into::into)? {
            let story = self.data_loader.load_story_data().map_err(Into::into)?;
            let mut game_state = game_state.rehydrate(story);
            if let Some(glory) = self.storage.load_glory().map_err(Into::into)? {
                game_state.glory = glory;
            }
            Ok(Some(game_state))
        } else {
            Ok(None)
        }
    }
}
