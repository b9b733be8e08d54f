// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity model: a kind of attendance-worthy action ("Run", "Bike").

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::models::{fields, set_if_some, ItemMeta, Patch};

/// Global activity catalog entry, referenced by ID from locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(rename = "n")]
    pub name: String,
    /// Icon reference
    #[serde(rename = "ic", default)]
    pub icon: String,
    /// Globally enabled
    #[serde(rename = "en", default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Activity {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
}

impl Patch for ActivityPatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::NAME, self.name);
        set_if_some(&mut ops, fields::ICON, self.icon);
        set_if_some(&mut ops, fields::ENABLED, self.enabled);
        ops
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.icon.is_none() && self.enabled.is_none()
    }
}
