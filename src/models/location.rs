// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location model: a physical check-in point belonging to a host.

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::models::{fields, set_if_some, ItemMeta, Patch};

/// Most activities a single location may offer.
pub const MAX_ACTIVITIES_PER_LOCATION: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Owning host ID
    #[serde(rename = "hid")]
    pub host_id: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "adr", default)]
    pub address: String,
    /// Assigned activity IDs (at most 3)
    #[serde(rename = "aids", default)]
    pub activity_ids: Vec<String>,
}

impl Location {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn offers(&self, activity_id: &str) -> bool {
        self.activity_ids.iter().any(|a| a == activity_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub host_id: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub activity_ids: Option<Vec<String>>,
}

impl Patch for LocationPatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::NAME, self.name);
        set_if_some(&mut ops, fields::ADDRESS, self.address);
        set_if_some(&mut ops, fields::ACTIVITY_IDS, self.activity_ids);
        ops
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.activity_ids.is_none()
    }
}
