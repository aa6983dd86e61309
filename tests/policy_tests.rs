//! Authorization table tests
//!
//! Exercises `authorize` across roles and ownership without touching the
//! database or HTTP layer.

use picce::{
    auth::policy::{authorize, may_self_register_as, require, Action, Decision, DenyReason},
    types::{Actor, AppError, Role},
};
use rstest::rstest;

fn actor(id: i64, role: Role) -> Actor {
    Actor {
        id,
        username: format!("user{}", id),
        role,
        institution_id: None,
    }
}

#[rstest]
#[case(Action::GetAllUsers)]
#[case(Action::DeleteUser)]
#[case(Action::UpdateUser)]
#[case(Action::CreateAddress)]
#[case(Action::DeleteInstitution)]
#[case(Action::UpdateClassroom)]
#[case(Action::GetAllClassrooms)]
#[case(Action::AcceptTerms)]
fn admin_is_always_allowed(#[case] action: Action) {
    let admin = actor(1, Role::Admin);
    // Admin does not need to own the target
    assert_eq!(authorize(Some(&admin), action, Some(99)), Decision::Allow);
}

#[rstest]
#[case(Action::AcceptTerms)]
#[case(Action::UpdateUser)]
#[case(Action::CreateAddress)]
#[case(Action::CreateClassroom)]
#[case(Action::UpdateClassroom)]
#[case(Action::DeleteClassroom)]
fn guest_cannot_mutate(#[case] action: Action) {
    let guest = actor(1, Role::Guest);
    // Even as the nominal owner
    assert_eq!(
        authorize(Some(&guest), action, Some(1)),
        Decision::Deny(DenyReason::GuestReadOnly)
    );
}

#[rstest]
#[case(Action::CheckSignIn)]
#[case(Action::RenewSignIn)]
#[case(Action::GetInstitution)]
#[case(Action::GetAllInstitutions)]
#[case(Action::GetClassroom)]
#[case(Action::GetClassroomsByInstitution)]
fn guest_can_read(#[case] action: Action) {
    let guest = actor(1, Role::Guest);
    assert!(authorize(Some(&guest), action, None).is_allowed());
}

#[rstest]
#[case(Action::GetAddress)]
#[case(Action::GetAllAddresses)]
#[case(Action::GetAddressId)]
#[case(Action::GetAddressesByState)]
fn address_reads_are_public(#[case] action: Action) {
    assert!(authorize(None, action, None).is_allowed());
}

#[rstest]
#[case(Action::CheckSignIn)]
#[case(Action::GetInstitution)]
#[case(Action::CreateClassroom)]
#[case(Action::GetUser)]
fn anonymous_is_unauthenticated(#[case] action: Action) {
    assert_eq!(
        authorize(None, action, None),
        Decision::Deny(DenyReason::Unauthenticated)
    );
    assert!(matches!(require(None, action, None), Err(AppError::Auth(_))));
}

#[rstest]
#[case(Role::User, false)]
#[case(Role::Applier, true)]
#[case(Role::Publisher, true)]
#[case(Role::Coordinator, true)]
#[case(Role::Admin, true)]
fn create_classroom_requires_applier(#[case] role: Role, #[case] allowed: bool) {
    let caller = actor(5, role);
    assert_eq!(
        authorize(Some(&caller), Action::CreateClassroom, None).is_allowed(),
        allowed
    );
}

#[rstest]
#[case(Action::GetUser)]
#[case(Action::UpdateUser)]
#[case(Action::UpdateClassroom)]
#[case(Action::DeleteClassroom)]
fn ownership_rules(#[case] action: Action) {
    let caller = actor(7, Role::Coordinator);

    assert!(authorize(Some(&caller), action, Some(7)).is_allowed());
    assert_eq!(
        authorize(Some(&caller), action, Some(8)),
        Decision::Deny(DenyReason::NotOwner)
    );
    assert!(matches!(
        require(Some(&caller), action, Some(8)),
        Err(AppError::Unauthorized(_))
    ));
}

#[rstest]
#[case(Role::User)]
#[case(Role::Applier)]
#[case(Role::Publisher)]
#[case(Role::Coordinator)]
fn admin_only_actions_deny_everyone_else(#[case] role: Role) {
    let caller = actor(3, role);
    for action in [
        Action::GetAllUsers,
        Action::DeleteUser,
        Action::CreateAddress,
        Action::UpdateAddress,
        Action::DeleteAddress,
        Action::CreateInstitution,
        Action::UpdateInstitution,
        Action::DeleteInstitution,
        Action::GetAllClassrooms,
    ] {
        assert_eq!(
            authorize(Some(&caller), action, Some(3)),
            Decision::Deny(DenyReason::AdminOnly),
            "{:?} should be admin-only",
            action
        );
    }
}

#[rstest]
#[case(Role::Guest, false)]
#[case(Role::User, true)]
#[case(Role::Applier, true)]
#[case(Role::Publisher, true)]
#[case(Role::Coordinator, true)]
#[case(Role::Admin, false)]
fn self_registration_roles(#[case] role: Role, #[case] allowed: bool) {
    assert_eq!(may_self_register_as(role), allowed);
}

#[test]
fn decisions_are_deterministic() {
    let caller = actor(2, Role::Publisher);
    let first = authorize(Some(&caller), Action::UpdateClassroom, Some(4));
    for _ in 0..10 {
        assert_eq!(authorize(Some(&caller), Action::UpdateClassroom, Some(4)), first);
    }
}
