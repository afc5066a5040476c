//! Join controller: validates a candidate alias against the roster snapshot and
//! commits it to the roster store.

use thiserror::Error;

use crate::{
    dao::{models::PlayerRecord, roster_store::RosterStore, storage::StorageError},
    state::roster::PlayerEntry,
};

/// Shortest accepted alias, in characters, after trimming.
pub const MIN_ALIAS_CHARS: usize = 2;
/// Longest accepted alias, in characters, after trimming.
pub const MAX_ALIAS_CHARS: usize = 30;

/// Reasons a join can be refused.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Nobody walks into this city without a name, capisce?")]
    EmptyAlias,
    #[error("Your alias is too short. The Family needs something memorable.")]
    AliasTooShort,
    #[error("This name is already taken by another member of the Family.")]
    DuplicateAlias,
    #[error("Your alias is too long. The Family keeps it to {MAX_ALIAS_CHARS} characters.")]
    AliasTooLong,
    /// The roster store refused or never acknowledged the write.
    #[error("The Family could not record your alias. Try again.")]
    Failed(#[source] StorageError),
}

impl JoinError {
    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::EmptyAlias => "empty_alias",
            JoinError::AliasTooShort => "alias_too_short",
            JoinError::DuplicateAlias => "duplicate_alias",
            JoinError::AliasTooLong => "alias_too_long",
            JoinError::Failed(_) => "join_failed",
        }
    }
}

/// Validate `candidate` against `roster`, returning the trimmed alias.
///
/// Rules are checked in a fixed order and the first failure wins: empty,
/// too short, case-insensitive duplicate, too long.
pub fn validate_alias(candidate: &str, roster: &[PlayerEntry]) -> Result<String, JoinError> {
    let alias = candidate.trim();
    if alias.is_empty() {
        return Err(JoinError::EmptyAlias);
    }

    let length = alias.chars().count();
    if length < MIN_ALIAS_CHARS {
        return Err(JoinError::AliasTooShort);
    }

    let folded = alias.to_lowercase();
    if roster
        .iter()
        .any(|entry| entry.nickname.to_lowercase() == folded)
    {
        return Err(JoinError::DuplicateAlias);
    }

    if length > MAX_ALIAS_CHARS {
        return Err(JoinError::AliasTooLong);
    }

    Ok(alias.to_string())
}

/// Validate `candidate` and append it to `store`, stamped with `now_ms`.
///
/// Nothing is written when validation fails. The returned entry carries the
/// identifier assigned by the store, if any.
pub async fn join(
    candidate: &str,
    roster: &[PlayerEntry],
    store: &dyn RosterStore,
    now_ms: i64,
) -> Result<PlayerEntry, JoinError> {
    let nickname = validate_alias(candidate, roster)?;
    let record = PlayerRecord {
        nickname: nickname.clone(),
        timestamp: now_ms,
    };

    let id = store.append(record).await.map_err(JoinError::Failed)?;
    Ok(PlayerEntry {
        id,
        nickname,
        joined_at: now_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::roster_store::memory::MemoryRosterStore;

    fn roster(names: &[&str]) -> Vec<PlayerEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| PlayerEntry {
                id: Some(format!("id{i}")),
                nickname: (*name).to_string(),
                joined_at: i as i64,
            })
            .collect()
    }

    #[test]
    fn trimming_does_not_change_the_verdict() {
        let existing = roster(&["Vito"]);
        for alias in ["Al", "Vito", "x", "Michael"] {
            let padded = format!("  {alias}  ");
            let bare = validate_alias(alias, &existing).map_err(|e| e.code());
            let trimmed = validate_alias(&padded, &existing).map_err(|e| e.code());
            assert_eq!(bare, trimmed, "alias {alias:?}");
        }
    }

    #[test]
    fn rejects_empty_and_single_character_aliases() {
        assert!(matches!(validate_alias("", &[]), Err(JoinError::EmptyAlias)));
        assert!(matches!(validate_alias(" \t ", &[]), Err(JoinError::EmptyAlias)));
        assert!(matches!(validate_alias("A", &[]), Err(JoinError::AliasTooShort)));
        assert!(matches!(validate_alias("  é ", &[]), Err(JoinError::AliasTooShort)));
    }

    #[test]
    fn duplicates_are_case_insensitive() {
        let existing = roster(&["Al"]);
        assert!(matches!(
            validate_alias("al", &existing),
            Err(JoinError::DuplicateAlias)
        ));
        assert!(matches!(
            validate_alias("  AL ", &existing),
            Err(JoinError::DuplicateAlias)
        ));
        assert_eq!(validate_alias(" Alfredo ", &existing).unwrap(), "Alfredo");
    }

    #[test]
    fn length_cap_counts_characters() {
        let thirty = "é".repeat(MAX_ALIAS_CHARS);
        assert_eq!(validate_alias(&thirty, &[]).unwrap(), thirty);
        let too_long = "a".repeat(MAX_ALIAS_CHARS + 1);
        assert!(matches!(
            validate_alias(&too_long, &[]),
            Err(JoinError::AliasTooLong)
        ));
    }

    #[tokio::test]
    async fn join_writes_trimmed_alias_once() {
        let store = MemoryRosterStore::new();
        let entry = join("  Vito  ", &[], &store, 1_000).await.unwrap();
        assert_eq!(entry.nickname, "Vito");
        assert_eq!(entry.joined_at, 1_000);
        assert!(entry.id.is_some());

        let mut subscription = store.subscribe().await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn rejected_join_leaves_store_untouched() {
        let store = MemoryRosterStore::new();
        let existing = roster(&["Al"]);
        let err = join("al", &existing, &store, 1_000).await.unwrap_err();
        assert_eq!(err.code(), "duplicate_alias");

        let mut subscription = store.subscribe().await.unwrap();
        assert!(subscription.next().await.unwrap().is_empty());
    }
}
