//! Lux core: small selection and normalization helpers shared by the build tooling.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

mod fields;
mod best;

pub use fields::{pick, pick_json, Picked, Record};
pub use best::{best_by, best_by_winner};

pub mod prelude {
    pub use super::{
        best_by, best_by_winner, maybe_array, pick, pick_json, OneOrMany, Picked, Record,
    };
}

/// Either a bare value or an ordered sequence of values.
///
/// Deserializes from a JSON array (`Many`) or any other single value (`One`),
/// so config fields can accept `"esm"` as well as `["esm", "commonjs"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// Borrow as a slice. `Many` yields the slice it already holds.
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(v) => v.as_slice(),
            OneOrMany::One(x) => std::slice::from_ref(x),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(x) => vec![x],
        }
    }

    pub fn len(&self) -> usize { self.as_slice().len() }
    pub fn is_empty(&self) -> bool { self.as_slice().is_empty() }
}

/// Normalize to a sequence. A `Many` is handed back as-is (same allocation, no copy).
pub fn maybe_array<T>(thing: OneOrMany<T>) -> Vec<T> {
    thing.into_vec()
}
