//! Shared small types and serde helpers

use serde::{Deserialize, Deserializer, Serialize};

/// Publication status of a conformance resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Active,
    Retired,
    Unknown,
}

/// Reference data type as used inside conformance resources (STU3 `valueSetReference`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept either a single value or a list.
///
/// STU3 declares `type.profile` and `type.targetProfile` as single URIs while
/// R4 turned them into lists.
pub fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    }))
}
