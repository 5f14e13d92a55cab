//! Helpers for partial update request bodies.

use serde::{Deserialize, Deserializer};

/// Deserialize a field that is present in the body, keeping an explicit
/// `null` as `Some(None)` so that it can be told apart from a missing field.
///
/// Use together with `#[serde(default)]` so that a missing field is `None`.
pub(crate) fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
