//! Scope resolver: does the user's department reach cover the resource?

use uuid::Uuid;

use crate::authz::catalog::OrgRole;

/// Evaluate department reach.
///
/// `owner_role` is the org role of the resource's current owner, when known.
/// Admins and sub-admins see each other's resources across departments; that
/// cross-role visibility does not extend to members.
pub fn in_scope(
    user_role: OrgRole,
    user_department: Option<Uuid>,
    resource_department: Option<Uuid>,
    owner_role: Option<OrgRole>,
) -> bool {
    // A resource with no department is visible to everyone in the org.
    let Some(resource_department) = resource_department else {
        return true;
    };

    match user_role {
        OrgRole::Superadmin | OrgRole::Owner => true,
        OrgRole::Admin | OrgRole::SubAdmin => {
            let same_department = user_department == Some(resource_department);
            let owner_is_manager = matches!(
                owner_role,
                Some(OrgRole::Owner) | Some(OrgRole::Admin) | Some(OrgRole::SubAdmin)
            );
            same_department || owner_is_manager
        }
        OrgRole::Member => user_department == Some(resource_department),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn org_owner_reaches_every_department() {
        let (a, b) = (dept(), dept());
        assert!(in_scope(OrgRole::Owner, Some(a), Some(b), Some(OrgRole::Member)));
    }

    #[test]
    fn member_is_confined_to_their_department() {
        let (a, b) = (dept(), dept());
        assert!(in_scope(OrgRole::Member, Some(a), Some(a), Some(OrgRole::Member)));
        assert!(!in_scope(OrgRole::Member, Some(a), Some(b), Some(OrgRole::Member)));
        // Members get no cross-role visibility, even toward admins.
        assert!(!in_scope(OrgRole::Member, Some(a), Some(b), Some(OrgRole::Admin)));
    }

    #[test]
    fn admin_sees_own_department_and_other_managers() {
        let (a, b) = (dept(), dept());
        assert!(in_scope(OrgRole::Admin, Some(a), Some(a), Some(OrgRole::Member)));
        assert!(!in_scope(OrgRole::Admin, Some(a), Some(b), Some(OrgRole::Member)));
        assert!(in_scope(OrgRole::Admin, Some(a), Some(b), Some(OrgRole::SubAdmin)));
        assert!(in_scope(OrgRole::SubAdmin, Some(a), Some(b), Some(OrgRole::Owner)));
    }

    #[test]
    fn departmentless_resources_are_always_in_scope() {
        assert!(in_scope(OrgRole::Member, Some(dept()), None, None));
        assert!(in_scope(OrgRole::Member, None, None, None));
    }

    #[test]
    fn user_without_department_cannot_reach_departmental_resources() {
        assert!(!in_scope(OrgRole::Member, None, Some(dept()), Some(OrgRole::Member)));
    }
}
