// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.
//!
//! Persisted attribute names are short and stable; existing stored data
//! depends on them.

pub mod activity;
pub mod athlete;
pub mod check_in;
pub mod host;
pub mod location;
pub mod marker;
pub mod pet;
pub mod reward;

pub use activity::{Activity, ActivityPatch, NewActivity};
pub use athlete::{Athlete, AthletePatch, NewAthlete, WeekState};
pub use check_in::{CheckIn, PetCheckIn};
pub use host::{Host, HostPatch, NewHost};
pub use location::{Location, LocationPatch, NewLocation, MAX_ACTIVITIES_PER_LOCATION};
pub use marker::{MarkerError, WeeklyMarker};
pub use pet::{NewPet, Pet, PetPatch};
pub use reward::{NewReward, NewRewardClaim, Reward, RewardClaim, RewardPatch, RewardScope};

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::keys::Keys;

/// Persisted attribute names referenced by update operations.
pub mod fields {
    pub const UPDATED_AT: &str = "ua";
    pub const NAME: &str = "n";
    pub const EMAIL: &str = "em";
    pub const ICON: &str = "ic";
    pub const ENABLED: &str = "en";
    pub const ADDRESS: &str = "adr";
    pub const ACTIVITY_IDS: &str = "aids";
    pub const LOCATION_IDS: &str = "lids";
    pub const REWARD_IDS: &str = "rids";
    pub const PASSPHRASE: &str = "pw";
    pub const DISCLAIMER: &str = "dis";
    pub const FIRST_NAME: &str = "fn";
    pub const LAST_NAME: &str = "ln";
    pub const EMERGENCY_NAME: &str = "ecn";
    pub const EMERGENCY_PHONE: &str = "ecp";
    pub const LAST_WEEK: &str = "lw";
    pub const GLOBAL_COUNT: &str = "gc";
    pub const HOST_COUNTS: &str = "hc";
    pub const DISCLAIMERS: &str = "ds";
    pub const DELETED: &str = "del";
    pub const REVISION: &str = "rv";
    pub const ACTIVITY: &str = "act";
    pub const THRESHOLD: &str = "cnt";
    pub const G1SK: &str = "g1sk";
    pub const G2PK: &str = "g2pk";
    pub const G2SK: &str = "g2sk";
}

/// Entity type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Host,
    Location,
    Activity,
    Athlete,
    Pet,
    CheckIn,
    PetCheckIn,
    Reward,
    RewardClaim,
}

/// Shape shared by every stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(flatten)]
    pub keys: Keys,
    /// Type discriminator
    #[serde(rename = "et")]
    pub entity_type: EntityType,
    /// Stable identifier
    pub id: String,
    /// Created at (RFC3339, ms)
    #[serde(rename = "ca")]
    pub created_at: String,
    /// Updated at (RFC3339, ms)
    #[serde(rename = "ua")]
    pub updated_at: String,
}

impl ItemMeta {
    pub fn new(keys: Keys, entity_type: EntityType, id: String, now: &str) -> Self {
        Self {
            keys,
            entity_type,
            id,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// A sparse set of changes to one entity.
///
/// Only fields listed on the implementing struct can be changed; the
/// repository adds the `ua` timestamp.
pub trait Patch {
    fn into_ops(self) -> Vec<UpdateOp>;

    fn is_empty(&self) -> bool;
}

/// Push a `Set` for every present optional field.
pub(crate) fn set_if_some<T: Into<serde_json::Value>>(
    ops: &mut Vec<UpdateOp>,
    field: &str,
    value: Option<T>,
) {
    if let Some(value) = value {
        ops.push(UpdateOp::set(field, value));
    }
}

/// New stable identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
