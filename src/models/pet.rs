// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pet model: an animal companion of an athlete.

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::models::{fields, set_if_some, ItemMeta, Patch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Owning athlete ID
    #[serde(rename = "aid")]
    pub athlete_id: String,
    #[serde(rename = "n")]
    pub name: String,
}

impl Pet {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

#[derive(Debug, Clone)]
pub struct NewPet {
    pub athlete_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PetPatch {
    pub name: Option<String>,
}

impl Patch for PetPatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::NAME, self.name);
        ops
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}
