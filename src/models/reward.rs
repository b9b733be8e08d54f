// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward definitions and claim records.

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::keys::{self, Keys};
use crate::models::{fields, set_if_some, ItemMeta, Patch};

/// Which counter a reward is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardScope {
    /// Lifetime weekly counter (`gc`), independent of host.
    Global,
    /// Check-ins at the owning host.
    Host,
    /// Companion check-ins of one pet.
    Pet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Required count
    #[serde(rename = "cnt")]
    pub threshold: u32,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "ic", default)]
    pub icon: String,
    #[serde(rename = "sc")]
    pub scope: RewardScope,
    /// Owning host, for host-scoped rewards only
    #[serde(rename = "hid", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
}

impl Reward {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Threshold reached at `count`.
    pub fn is_met(&self, count: u32) -> bool {
        count >= self.threshold
    }

    /// Exactly one check-in short of the threshold.
    pub fn is_one_away(&self, count: u32) -> bool {
        self.threshold > 0 && count == self.threshold - 1
    }
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub scope: RewardScope,
    pub host_id: Option<String>,
    pub name: String,
    pub icon: String,
    pub threshold: u32,
}

/// Mutable reward fields. The scope and owner are fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct RewardPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub threshold: Option<u32>,
}

impl Patch for RewardPatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::NAME, self.name);
        set_if_some(&mut ops, fields::ICON, self.icon);
        if let Some(threshold) = self.threshold {
            ops.push(UpdateOp::set(fields::THRESHOLD, threshold));
            // The owner index sorts by threshold.
            ops.push(UpdateOp::set(
                fields::G1SK,
                keys::reward_owner_sk(threshold),
            ));
        }
        ops
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.icon.is_none() && self.threshold.is_none()
    }
}

/// Append-only record that a reward was granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardClaim {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(rename = "aid")]
    pub athlete_id: String,
    #[serde(rename = "rid")]
    pub reward_id: String,
    #[serde(rename = "hid")]
    pub host_id: String,
    #[serde(rename = "lid")]
    pub location_id: String,
    #[serde(rename = "pid", default, skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<String>,
    #[serde(rename = "ts")]
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct NewRewardClaim {
    pub athlete_id: String,
    pub reward_id: String,
    pub host_id: String,
    pub location_id: String,
    pub pet_id: Option<String>,
}

impl NewRewardClaim {
    pub fn keys(&self, timestamp: &str) -> Keys {
        Keys::reward_claim(&self.athlete_id, &self.host_id, timestamp)
    }
}
