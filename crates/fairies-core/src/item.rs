//! The closed set of deliverable items.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A deliverable ingredient.
///
/// Each item carries an authored numeric code; one item type (ingredient
/// family) occupies an entire decade, so `code / 10` is the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Item {
    // Tutorial
    Sideritis,

    // Intro
    Chamomile,
    Honey,
    Eucalyptus,

    // Cough
    Oil,
    Salt,

    // Fever
    Alcohol,
    Glass,
    Basil,
    Apiganos,

    // Delirium
    Vitriol,
    Soda,
    Gunpowder,
    Garlic,
    Mint,
    Sage,

    // Climax
    Artemisian,
    Turtle,
    Hay,
}

impl Item {
    /// Every item, in code order.
    pub const ALL: [Item; 19] = [
        Item::Sideritis,
        Item::Chamomile,
        Item::Honey,
        Item::Eucalyptus,
        Item::Oil,
        Item::Salt,
        Item::Alcohol,
        Item::Glass,
        Item::Basil,
        Item::Apiganos,
        Item::Vitriol,
        Item::Soda,
        Item::Gunpowder,
        Item::Garlic,
        Item::Mint,
        Item::Sage,
        Item::Artemisian,
        Item::Turtle,
        Item::Hay,
    ];

    /// Returns the authored numeric code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Item::Sideritis => 10,
            Item::Chamomile => 20,
            Item::Honey => 21,
            Item::Eucalyptus => 22,
            Item::Oil => 30,
            Item::Salt => 31,
            Item::Alcohol => 40,
            Item::Glass => 41,
            Item::Basil => 42,
            Item::Apiganos => 43,
            Item::Vitriol => 50,
            Item::Soda => 51,
            Item::Gunpowder => 52,
            Item::Garlic => 53,
            Item::Mint => 54,
            Item::Sage => 55,
            Item::Artemisian => 60,
            Item::Turtle => 61,
            Item::Hay => 62,
        }
    }

    /// Returns the item type: the decade the code falls in.
    #[must_use]
    pub fn item_type(self) -> u16 {
        self.code() / 10
    }

    /// Returns `true` if both items belong to the same type.
    #[must_use]
    pub fn is_same_type_as(self, other: Item) -> bool {
        self.item_type() == other.item_type()
    }

    /// Returns the lowercase name used in cue paths.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Item::Sideritis => "sideritis",
            Item::Chamomile => "chamomile",
            Item::Honey => "honey",
            Item::Eucalyptus => "eucalyptus",
            Item::Oil => "oil",
            Item::Salt => "salt",
            Item::Alcohol => "alcohol",
            Item::Glass => "glass",
            Item::Basil => "basil",
            Item::Apiganos => "apiganos",
            Item::Vitriol => "vitriol",
            Item::Soda => "soda",
            Item::Gunpowder => "gunpowder",
            Item::Garlic => "garlic",
            Item::Mint => "mint",
            Item::Sage => "sage",
            Item::Artemisian => "artemisian",
            Item::Turtle => "turtle",
            Item::Hay => "hay",
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Item {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|item| item.as_str() == s)
            .ok_or_else(|| CoreError::UnknownItem(s.to_owned()))
    }
}
