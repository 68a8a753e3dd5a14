//! Payload transformers.
//!
//! Each [`Transformer`] variant resolves to a plain function value. The set is
//! closed: a routing table that names a transformer outside this set fails to
//! deserialize, so a bad name is caught at startup rather than at request time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::Payload;

/// Signature shared by every transform function.
pub type TransformFn = fn(&Payload) -> Payload;

/// Named, statically known payload transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformer {
    /// Identity mapping.
    #[default]
    Passthrough,
    /// Reduces a membership payload to `{user_id}` for user validation.
    #[serde(alias = "membership_to_user_validation_format")]
    MembershipToUserValidation,
}

impl Transformer {
    /// Every known transformer.
    pub const ALL: [Transformer; 2] = [
        Transformer::Passthrough,
        Transformer::MembershipToUserValidation,
    ];

    /// Wire name of this transformer, as used in routing tables.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Transformer::Passthrough => "passthrough",
            Transformer::MembershipToUserValidation => "membership_to_user_validation",
        }
    }

    /// The function this transformer resolves to.
    #[must_use]
    pub fn function(self) -> TransformFn {
        match self {
            Transformer::Passthrough => passthrough,
            Transformer::MembershipToUserValidation => membership_to_user_validation,
        }
    }

    /// Applies the transform. The input is never modified.
    #[must_use]
    pub fn apply(self, payload: &Payload) -> Payload {
        (self.function())(payload)
    }
}

impl fmt::Display for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns a copy of the payload.
#[must_use]
pub fn passthrough(payload: &Payload) -> Payload {
    payload.clone()
}

/// Keeps only `user_id`. Absent maps to `null`.
#[must_use]
pub fn membership_to_user_validation(payload: &Payload) -> Payload {
    let mut out = Map::new();
    out.insert(
        "user_id".to_string(),
        payload.get("user_id").cloned().unwrap_or(Value::Null),
    );
    out
}
