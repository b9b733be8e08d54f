// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key schema for the single item table.
//!
//! Every entity lives in one logical table. Its primary key (`pk`/`sk`) and
//! its secondary-index keys are derived here from identity and ownership:
//!
//! - ByOwner (`g1pk`/`g1sk`): items owned by a host (or an athlete, for pets),
//!   sorted by recency.
//! - ByName (`g2pk`/`g2sk`): a type discriminator plus an uppercased
//!   `LAST#FIRST#id` name or lowercased email, for prefix search.
//!
//! Sort values of cursor-paged indexes end in the owning ID, so no two items
//! in one partition share a sort value.
//! - ByDate (`g3pk`/`g3sk`): events keyed by calendar date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::RewardScope;

/// Sort key for entity-of-record items.
pub const METADATA: &str = "METADATA";

/// Reserved key prefixes.
pub mod prefix {
    pub const HOST: &str = "HOST#";
    pub const LOCATION: &str = "LOC#";
    pub const ACTIVITY: &str = "ACT#";
    pub const ATHLETE: &str = "ATH#";
    pub const PET: &str = "PET#";
    pub const REWARD: &str = "RWD#";
    pub const CHECK_IN: &str = "CHK#";
    pub const PET_CHECK_IN: &str = "PCHK#";
    pub const CLAIM: &str = "CLM#";
    pub const DATE: &str = "DATE#";
}

/// Type discriminators used as ByName partitions and reward owners.
pub mod partition {
    pub const HOSTS: &str = "HOST";
    pub const ACTIVITIES: &str = "ACTIVITY";
    pub const ATHLETES: &str = "ATHLETE";
    pub const DELETED_ATHLETES: &str = "ATHLETE#DELETED";
    pub const GLOBAL_REWARDS: &str = "REWARDS#GLOBAL";
    pub const PET_REWARDS: &str = "REWARDS#PET";
}

/// Primary key of a single item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Key of an entity-of-record item.
    pub fn metadata(pk: impl Into<String>) -> Self {
        Self::new(pk, METADATA)
    }

    /// Stable document ID for backends that address items by a single string.
    pub fn doc_id(&self) -> String {
        urlencoding::encode(&format!("{}|{}", self.pk, self.sk)).into_owned()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Secondary indexes of the item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Primary,
    ByOwner,
    ByName,
    ByDate,
}

impl Index {
    /// Attribute holding the partition value for this index.
    pub fn partition_attr(self) -> &'static str {
        match self {
            Index::Primary => "pk",
            Index::ByOwner => "g1pk",
            Index::ByName => "g2pk",
            Index::ByDate => "g3pk",
        }
    }

    /// Attribute holding the sort value for this index.
    pub fn sort_attr(self) -> &'static str {
        match self {
            Index::Primary => "sk",
            Index::ByOwner => "g1sk",
            Index::ByName => "g2sk",
            Index::ByDate => "g3sk",
        }
    }
}

/// All key attributes of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    pub pk: String,
    pub sk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g1pk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g1sk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g2pk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g2sk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g3pk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g3sk: Option<String>,
}

impl Keys {
    fn primary(pk: String, sk: String) -> Self {
        Self {
            pk,
            sk,
            g1pk: None,
            g1sk: None,
            g2pk: None,
            g2sk: None,
            g3pk: None,
            g3sk: None,
        }
    }

    fn by_owner(mut self, pk: String, sk: String) -> Self {
        self.g1pk = Some(pk);
        self.g1sk = Some(sk);
        self
    }

    fn by_name(mut self, pk: &str, sk: String) -> Self {
        self.g2pk = Some(pk.to_string());
        self.g2sk = Some(sk);
        self
    }

    fn by_date(mut self, pk: String, sk: String) -> Self {
        self.g3pk = Some(pk);
        self.g3sk = Some(sk);
        self
    }

    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.pk.clone(), self.sk.clone())
    }

    pub fn host(id: &str, email: &str) -> Self {
        Self::primary(host_pk(id), METADATA.to_string())
            .by_name(partition::HOSTS, email_sort_key(email))
    }

    pub fn location(id: &str, host_id: &str, created_at: &str) -> Self {
        Self::primary(location_pk(id), METADATA.to_string())
            .by_owner(host_pk(host_id), format!("{}{}", prefix::LOCATION, created_at))
    }

    pub fn activity(id: &str, name: &str) -> Self {
        Self::primary(activity_pk(id), METADATA.to_string())
            .by_name(partition::ACTIVITIES, name.trim().to_uppercase())
    }

    pub fn athlete(id: &str, last_name: &str, first_name: &str, deleted: bool) -> Self {
        let partition = if deleted {
            partition::DELETED_ATHLETES
        } else {
            partition::ATHLETES
        };
        Self::primary(athlete_pk(id), METADATA.to_string())
            .by_name(partition, name_sort_key(last_name, first_name, id))
    }

    pub fn pet(id: &str, athlete_id: &str, created_at: &str) -> Self {
        Self::primary(pet_pk(id), METADATA.to_string())
            .by_owner(athlete_pk(athlete_id), format!("{}{}", prefix::PET, created_at))
    }

    pub fn check_in(athlete_id: &str, host_id: &str, timestamp: &str, date: NaiveDate) -> Self {
        Self::primary(athlete_pk(athlete_id), check_in_sk(timestamp))
            .by_owner(host_pk(host_id), event_sort_key(prefix::CHECK_IN, timestamp, athlete_id))
            .by_date(
                date_pk(date),
                event_sort_key(prefix::CHECK_IN, timestamp, athlete_id),
            )
    }

    pub fn pet_check_in(pet_id: &str, host_id: &str, timestamp: &str, date: NaiveDate) -> Self {
        Self::primary(pet_pk(pet_id), pet_check_in_sk(timestamp))
            .by_owner(host_pk(host_id), event_sort_key(prefix::PET_CHECK_IN, timestamp, pet_id))
            .by_date(
                date_pk(date),
                event_sort_key(prefix::PET_CHECK_IN, timestamp, pet_id),
            )
    }

    pub fn reward(id: &str, scope: RewardScope, host_id: Option<&str>, cnt: u32) -> Self {
        Self::primary(reward_pk(id), METADATA.to_string())
            .by_owner(reward_owner(scope, host_id), reward_owner_sk(cnt))
    }

    pub fn reward_claim(athlete_id: &str, host_id: &str, timestamp: &str) -> Self {
        Self::primary(athlete_pk(athlete_id), claim_sk(timestamp))
            .by_owner(host_pk(host_id), event_sort_key(prefix::CLAIM, timestamp, athlete_id))
    }
}

pub fn host_pk(id: &str) -> String {
    format!("{}{}", prefix::HOST, id)
}

pub fn location_pk(id: &str) -> String {
    format!("{}{}", prefix::LOCATION, id)
}

pub fn activity_pk(id: &str) -> String {
    format!("{}{}", prefix::ACTIVITY, id)
}

pub fn athlete_pk(id: &str) -> String {
    format!("{}{}", prefix::ATHLETE, id)
}

pub fn pet_pk(id: &str) -> String {
    format!("{}{}", prefix::PET, id)
}

pub fn reward_pk(id: &str) -> String {
    format!("{}{}", prefix::REWARD, id)
}

pub fn check_in_sk(timestamp: &str) -> String {
    format!("{}{}", prefix::CHECK_IN, timestamp)
}

pub fn pet_check_in_sk(timestamp: &str) -> String {
    format!("{}{}", prefix::PET_CHECK_IN, timestamp)
}

pub fn claim_sk(timestamp: &str) -> String {
    format!("{}{}", prefix::CLAIM, timestamp)
}

pub fn date_pk(date: NaiveDate) -> String {
    format!("{}{}", prefix::DATE, date.format("%Y-%m-%d"))
}

/// ByOwner partition of a reward: its host, or the global/pet catalog.
pub fn reward_owner(scope: RewardScope, host_id: Option<&str>) -> String {
    match (scope, host_id) {
        (RewardScope::Host, Some(host_id)) => host_pk(host_id),
        (RewardScope::Pet, _) => partition::PET_REWARDS.to_string(),
        _ => partition::GLOBAL_REWARDS.to_string(),
    }
}

/// Zero-padded so rewards list in threshold order.
pub fn reward_owner_sk(cnt: u32) -> String {
    format!("{}{:06}", prefix::REWARD, cnt)
}

/// Index sort value of an event: `PREFIX<timestamp>#<owner>`.
pub fn event_sort_key(prefix: &str, timestamp: &str, owner_id: &str) -> String {
    format!("{}{}#{}", prefix, timestamp, owner_id)
}

/// Uppercased `LAST#FIRST#id`; prefix search matches on the name part.
pub fn name_sort_key(last_name: &str, first_name: &str, id: &str) -> String {
    format!(
        "{}#{}#{}",
        last_name.trim().to_uppercase(),
        first_name.trim().to_uppercase(),
        id
    )
}

pub fn email_sort_key(email: &str) -> String {
    email.trim().to_lowercase()
}
