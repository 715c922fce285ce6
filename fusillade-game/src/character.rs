//! Persistent player character model.
//!
//! A `PlayerCharacter` spans the whole campaign. It is created once at
//! campaign start and only mutated through the explicit phase-boundary sync
//! functions in [`crate::game`]; battle code never writes to it directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::GRACE_CAP;

/// Military ranks used across the campaign.
///
/// The battle-local `Soldier`/`Officer` projections coarsen this vocabulary
/// down to their own narrow rank sets; see [`crate::npc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MilitaryRank {
    #[default]
    Private,
    Corporal,
    Sergeant,
    Lieutenant,
    Captain,
    Major,
    Colonel,
}

impl MilitaryRank {
    pub const ALL: [Self; 7] = [
        Self::Private,
        Self::Corporal,
        Self::Sergeant,
        Self::Lieutenant,
        Self::Captain,
        Self::Major,
        Self::Colonel,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Corporal => "corporal",
            Self::Sergeant => "sergeant",
            Self::Lieutenant => "lieutenant",
            Self::Captain => "captain",
            Self::Major => "major",
            Self::Colonel => "colonel",
        }
    }
}

impl fmt::Display for MilitaryRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilitaryRank {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "corporal" => Ok(Self::Corporal),
            "sergeant" => Ok(Self::Sergeant),
            "lieutenant" => Ok(Self::Lieutenant),
            "captain" => Ok(Self::Captain),
            "major" => Ok(Self::Major),
            "colonel" => Ok(Self::Colonel),
            _ => Err(()),
        }
    }
}

/// Selector for one of the nine base attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Valor,
    Musketry,
    Elan,
    Strength,
    Endurance,
    Constitution,
    Charisma,
    Intelligence,
    Awareness,
}

/// The nine base attributes, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub valor: i32,
    pub musketry: i32,
    pub elan: i32,
    pub strength: i32,
    pub endurance: i32,
    pub constitution: i32,
    pub charisma: i32,
    pub intelligence: i32,
    pub awareness: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            valor: 40,
            musketry: 45,
            elan: 40,
            strength: 45,
            endurance: 40,
            constitution: 45,
            charisma: 35,
            intelligence: 40,
            awareness: 40,
        }
    }
}

impl Attributes {
    #[must_use]
    pub const fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Valor => self.valor,
            Attribute::Musketry => self.musketry,
            Attribute::Elan => self.elan,
            Attribute::Strength => self.strength,
            Attribute::Endurance => self.endurance,
            Attribute::Constitution => self.constitution,
            Attribute::Charisma => self.charisma,
            Attribute::Intelligence => self.intelligence,
            Attribute::Awareness => self.awareness,
        }
    }

    /// Set a single attribute, clamped to the documented 0-100 range.
    pub fn set(&mut self, attribute: Attribute, value: i32) {
        let clamped = value.clamp(0, 100);
        match attribute {
            Attribute::Valor => self.valor = clamped,
            Attribute::Musketry => self.musketry = clamped,
            Attribute::Elan => self.elan = clamped,
            Attribute::Strength => self.strength = clamped,
            Attribute::Endurance => self.endurance = clamped,
            Attribute::Constitution => self.constitution = clamped,
            Attribute::Charisma => self.charisma = clamped,
            Attribute::Intelligence => self.intelligence = clamped,
            Attribute::Awareness => self.awareness = clamped,
        }
    }

    /// Clamp every attribute to the 0-100 range.
    pub fn clamp(&mut self) {
        self.valor = self.valor.clamp(0, 100);
        self.musketry = self.musketry.clamp(0, 100);
        self.elan = self.elan.clamp(0, 100);
        self.strength = self.strength.clamp(0, 100);
        self.endurance = self.endurance.clamp(0, 100);
        self.constitution = self.constitution.clamp(0, 100);
        self.charisma = self.charisma.clamp(0, 100);
        self.intelligence = self.intelligence.clamp(0, 100);
        self.awareness = self.awareness.clamp(0, 100);
    }
}

/// Standing with the three audiences that matter to a soldier of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    pub soldier: i32,
    pub officer: i32,
    pub napoleon: i32,
}

impl Default for Reputation {
    fn default() -> Self {
        Self {
            soldier: 10,
            officer: 5,
            napoleon: 0,
        }
    }
}

impl Reputation {
    pub fn clamp(&mut self) {
        self.soldier = self.soldier.clamp(0, 100);
        self.officer = self.officer.clamp(0, 100);
        self.napoleon = self.napoleon.clamp(0, 100);
    }
}

/// Equipment condition meters (percentage scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub musket_condition: i32,
    pub uniform_condition: i32,
    pub boots_condition: i32,
}

impl Default for Equipment {
    fn default() -> Self {
        Self {
            musket_condition: 100,
            uniform_condition: 100,
            boots_condition: 100,
        }
    }
}

impl Equipment {
    pub fn clamp(&mut self) {
        self.musket_condition = self.musket_condition.clamp(0, 100);
        self.uniform_condition = self.uniform_condition.clamp(0, 100);
        self.boots_condition = self.boots_condition.clamp(0, 100);
    }
}

/// Persistent, campaign-spanning character record.
///
/// Condition meters (`health`, `morale`, `stamina`) live on a percentage
/// scale here; the battle factory scales them onto absolute pools and the
/// battle-to-camp sync converts them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCharacter {
    pub name: String,
    pub rank: MilitaryRank,
    pub attributes: Attributes,
    /// Health percentage, 0-100.
    pub health: i32,
    /// Morale, 0-100.
    pub morale: i32,
    /// Stamina percentage, 0-100.
    pub stamina: i32,
    /// Second-chance resource, capped at [`GRACE_CAP`].
    #[serde(default)]
    pub grace: u8,
    #[serde(default)]
    pub reputation: Reputation,
    #[serde(default)]
    pub nco_approval: i32,
    #[serde(default)]
    pub equipment: Equipment,
}

impl Default for PlayerCharacter {
    fn default() -> Self {
        Self::new("Recruit")
    }
}

impl PlayerCharacter {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rank: MilitaryRank::Private,
            attributes: Attributes::default(),
            health: 100,
            morale: 100,
            stamina: 100,
            grace: 1,
            reputation: Reputation::default(),
            nco_approval: 10,
            equipment: Equipment::default(),
        }
    }

    /// Clamp all meters and attributes to their documented ranges.
    pub fn clamp(&mut self) {
        self.health = self.health.clamp(0, 100);
        self.morale = self.morale.clamp(0, 100);
        self.stamina = self.stamina.clamp(0, 100);
        if self.grace > GRACE_CAP {
            self.grace = GRACE_CAP;
        }
        self.nco_approval = self.nco_approval.clamp(0, 100);
        self.attributes.clamp();
        self.reputation.clamp();
        self.equipment.clamp();
    }

    /// Grant a grace point, respecting the cap.
    pub const fn add_grace(&mut self) {
        if self.grace < GRACE_CAP {
            self.grace += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_round_trips_through_str() {
        for rank in MilitaryRank::ALL {
            assert_eq!(rank.as_str().parse::<MilitaryRank>(), Ok(rank));
        }
        assert!("marshal".parse::<MilitaryRank>().is_err());
    }

    #[test]
    fn attribute_setter_clamps_to_stat_range() {
        let mut attributes = Attributes::default();
        attributes.set(Attribute::Valor, 250);
        assert_eq!(attributes.valor, 100);
        attributes.set(Attribute::Musketry, -5);
        assert_eq!(attributes.musketry, 0);
        assert_eq!(attributes.get(Attribute::Musketry), 0);
    }

    #[test]
    fn clamp_restores_all_ranges() {
        let mut pc = PlayerCharacter::new("Test");
        pc.health = 180;
        pc.morale = -20;
        pc.stamina = 101;
        pc.grace = 9;
        pc.reputation.napoleon = 400;
        pc.clamp();
        assert_eq!(pc.health, 100);
        assert_eq!(pc.morale, 0);
        assert_eq!(pc.stamina, 100);
        assert_eq!(pc.grace, GRACE_CAP);
        assert_eq!(pc.reputation.napoleon, 100);
    }

    #[test]
    fn grace_respects_cap() {
        let mut pc = PlayerCharacter::new("Test");
        pc.grace = GRACE_CAP;
        pc.add_grace();
        assert_eq!(pc.grace, GRACE_CAP);
    }
}
