// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Host model: an organization operating one or more locations.

use serde::{Deserialize, Serialize};

use crate::db::UpdateOp;
use crate::models::{fields, set_if_some, ItemMeta, Patch};

/// Host record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Display name
    #[serde(rename = "n")]
    pub name: String,
    /// Contact email
    #[serde(rename = "em")]
    pub email: String,
    /// Subject of the host account at the identity provider
    #[serde(rename = "xid", default, skip_serializing_if = "Option::is_none")]
    pub identity_ref: Option<String>,
    /// Admin passphrase, HMAC-SHA256 hex
    #[serde(rename = "pw", default)]
    pub passphrase_hash: String,
    /// Owned location IDs
    #[serde(rename = "lids", default)]
    pub location_ids: Vec<String>,
    /// Liability disclaimer text members must sign
    #[serde(rename = "dis", default)]
    pub disclaimer: String,
    /// Custom (host-scoped) reward IDs
    #[serde(rename = "rids", default)]
    pub reward_ids: Vec<String>,
}

impl Host {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// Input for creating a host.
#[derive(Debug, Clone)]
pub struct NewHost {
    pub name: String,
    pub email: String,
    pub identity_ref: Option<String>,
    pub passphrase_hash: String,
    pub disclaimer: String,
}

/// Mutable host fields.
///
/// A changed email also moves the host in the email index; the repository
/// handles that. Location and reward ID lists change only through the
/// repository's guarded list rewrites.
#[derive(Debug, Clone, Default)]
pub struct HostPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub passphrase_hash: Option<String>,
    pub disclaimer: Option<String>,
}

impl Patch for HostPatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::NAME, self.name);
        set_if_some(&mut ops, fields::EMAIL, self.email);
        set_if_some(&mut ops, fields::PASSPHRASE, self.passphrase_hash);
        set_if_some(&mut ops, fields::DISCLAIMER, self.disclaimer);
        ops
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.passphrase_hash.is_none()
            && self.disclaimer.is_none()
    }
}
