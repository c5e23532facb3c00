//! Story authorization policy.
//!
//! Pure functions deciding whether a principal may mutate, delete, or manage
//! the collaborators of a story. Handlers pass the validated principal in
//! explicitly; `None` stands for "no authenticated principal" and is always
//! denied.

use crate::types::ObjectId;

/// Owner or any listed collaborator may edit the story content.
pub fn can_mutate(
    principal: Option<&ObjectId>,
    owner_id: &ObjectId,
    collaborators: &[ObjectId],
) -> bool {
    match principal {
        Some(p) => p == owner_id || collaborators.contains(p),
        None => false,
    }
}

/// Only the owner may delete a story. Collaborators never can.
pub fn can_delete(principal: Option<&ObjectId>, owner_id: &ObjectId) -> bool {
    principal == Some(owner_id)
}

/// Only the owner may add or remove collaborators.
pub fn can_manage_collaborators(principal: Option<&ObjectId>, owner_id: &ObjectId) -> bool {
    can_delete(principal, owner_id)
}

/// Reject a collaborator list that names the owner.
///
/// Duplicates are tolerated; only owner membership is policed.
pub fn validate_collaborators(
    owner_id: &ObjectId,
    collaborators: &[ObjectId],
) -> Result<(), String> {
    if collaborators.contains(owner_id) {
        return Err(format!(
            "Owner {owner_id} cannot be listed as a collaborator on their own story"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ObjectId, ObjectId, ObjectId) {
        (ObjectId::new(), ObjectId::new(), ObjectId::new())
    }

    #[test]
    fn owner_can_always_mutate() {
        let (owner, collab, _) = ids();
        assert!(can_mutate(Some(&owner), &owner, &[]));
        assert!(can_mutate(Some(&owner), &owner, &[collab]));
    }

    #[test]
    fn collaborator_can_mutate() {
        let (owner, collab, other) = ids();
        assert!(can_mutate(Some(&collab), &owner, &[other, collab]));
    }

    #[test]
    fn stranger_cannot_mutate() {
        let (owner, collab, stranger) = ids();
        assert!(!can_mutate(Some(&stranger), &owner, &[collab]));
    }

    #[test]
    fn missing_principal_is_denied_everywhere() {
        let (owner, collab, _) = ids();
        assert!(!can_mutate(None, &owner, &[collab]));
        assert!(!can_delete(None, &owner));
        assert!(!can_manage_collaborators(None, &owner));
    }

    #[test]
    fn collaborator_cannot_delete() {
        let (owner, collab, _) = ids();
        assert!(can_delete(Some(&owner), &owner));
        assert!(!can_delete(Some(&collab), &owner));
        assert!(!can_manage_collaborators(Some(&collab), &owner));
    }

    #[test]
    fn collaborator_list_may_not_contain_owner() {
        let (owner, collab, _) = ids();
        assert!(validate_collaborators(&owner, &[collab, collab]).is_ok());
        assert!(validate_collaborators(&owner, &[collab, owner]).is_err());
    }
}
