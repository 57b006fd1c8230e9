//! Composite resource identifiers.
//!
//! Resources owned by a project are identified locally as
//! `"<project_id>:<entity_id>"`.

use crate::error::ProviderError;

/// Separator between the parent container ID and the entity ID.
pub const ID_DELIMITER: &str = ":";

/// Join a parent container ID and an entity ID into a resource identifier.
///
/// # Examples
///
/// ```
/// use dbtcloud_provider::id::{format_id, split_id_to_ints};
///
/// let id = format_id(12, 345);
/// assert_eq!(id, "12:345");
/// assert_eq!(split_id_to_ints(&id, "dbtcloud_repository").unwrap(), (12, 345));
/// ```
pub fn format_id(parent_id: i64, entity_id: i64) -> String {
    format!("{parent_id}{ID_DELIMITER}{entity_id}")
}

/// Split a resource identifier back into its two integer parts.
///
/// Fails with [`ProviderError::InvalidId`] naming `resource_type` when the
/// identifier does not consist of exactly two base-10 integers.
pub fn split_id_to_ints(id: &str, resource_type: &str) -> Result<(i64, i64), ProviderError> {
    let invalid = || {
        ProviderError::InvalidId(format!(
            "unexpected format of ID ({id}) for {resource_type}, expected <project_id>{ID_DELIMITER}<id>"
        ))
    };

    let parts: Vec<&str> = id.split(ID_DELIMITER).collect();
    let [parent, entity] = parts.as_slice() else {
        return Err(invalid());
    };

    let parent = parent.parse::<i64>().map_err(|_| invalid())?;
    let entity = entity.parse::<i64>().map_err(|_| invalid())?;
    Ok((parent, entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for (parent, entity) in [(1, 1), (7, 9_001), (123_456, 98_765_432), (i64::MAX, 1)] {
            let id = format_id(parent, entity);
            assert_eq!(
                split_id_to_ints(&id, "dbtcloud_synapse_credential").unwrap(),
                (parent, entity)
            );
        }
    }

    #[test]
    fn test_wrong_separator_count() {
        for id in ["12", "12:34:56", "", "12-34"] {
            let err = split_id_to_ints(id, "dbtcloud_synapse_credential").unwrap_err();
            assert!(matches!(err, ProviderError::InvalidId(_)));
            assert!(err.message().contains("dbtcloud_synapse_credential"));
            assert!(err.message().contains(id));
        }
    }

    #[test]
    fn test_non_integer_parts() {
        let err = split_id_to_ints("abc:12", "dbtcloud_repository").unwrap_err();
        assert!(err.message().contains("dbtcloud_repository"));

        assert!(split_id_to_ints("12:", "dbtcloud_repository").is_err());
        assert!(split_id_to_ints("12: 3", "dbtcloud_repository").is_err());
    }
}
