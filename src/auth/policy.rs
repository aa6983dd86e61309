//! Role-based authorization table.
//!
//! [`authorize`] is a pure function of the acting identity, the requested
//! [`Action`] and, for ownership rules, the owner of the target record. Every
//! action maps to exactly one [`Rule`] through an exhaustive match, so a new
//! action cannot be added without deciding who may perform it.
//!
//! Evaluation order:
//! 1. `Public` actions allow everyone, including anonymous callers.
//! 2. Anonymous callers are denied everything else.
//! 3. `Admin` is allowed every action.
//! 4. `Guest` is denied every state-mutating action.
//! 5. The action's rule decides.

use crate::types::{Actor, AppError, Result, Role, UserId};
use std::fmt;

/// Everything a request can ask to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CheckSignIn,
    RenewSignIn,
    AcceptTerms,

    GetAllUsers,
    GetUser,
    UpdateUser,
    DeleteUser,

    CreateAddress,
    UpdateAddress,
    DeleteAddress,
    GetAddress,
    GetAllAddresses,
    GetAddressId,
    GetAddressesByState,

    CreateInstitution,
    UpdateInstitution,
    DeleteInstitution,
    GetInstitution,
    GetAllInstitutions,

    CreateClassroom,
    UpdateClassroom,
    DeleteClassroom,
    GetClassroom,
    GetAllClassrooms,
    GetClassroomsByInstitution,
}

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in identity, guest included.
    Authenticated,
    /// Any signed-in identity except guest.
    NonGuest,
    /// Roles at or above the given one.
    AtLeast(Role),
    /// The owner of the target record, or an admin.
    OwnerOrAdmin,
    AdminOnly,
}

impl Action {
    pub fn rule(&self) -> Rule {
        match self {
            Action::CheckSignIn | Action::RenewSignIn => Rule::Authenticated,
            Action::AcceptTerms => Rule::NonGuest,

            Action::GetAllUsers | Action::DeleteUser => Rule::AdminOnly,
            Action::GetUser | Action::UpdateUser => Rule::OwnerOrAdmin,

            Action::CreateAddress | Action::UpdateAddress | Action::DeleteAddress => {
                Rule::AdminOnly
            }
            Action::GetAddress
            | Action::GetAllAddresses
            | Action::GetAddressId
            | Action::GetAddressesByState => Rule::Public,

            Action::CreateInstitution | Action::UpdateInstitution | Action::DeleteInstitution => {
                Rule::AdminOnly
            }
            Action::GetInstitution | Action::GetAllInstitutions => Rule::Authenticated,

            Action::CreateClassroom => Rule::AtLeast(Role::Applier),
            Action::UpdateClassroom | Action::DeleteClassroom => Rule::OwnerOrAdmin,
            Action::GetClassroom | Action::GetClassroomsByInstitution => Rule::Authenticated,
            Action::GetAllClassrooms => Rule::AdminOnly,
        }
    }

    /// Whether the action changes persisted state.
    pub fn is_mutation(&self) -> bool {
        match self {
            Action::AcceptTerms
            | Action::UpdateUser
            | Action::DeleteUser
            | Action::CreateAddress
            | Action::UpdateAddress
            | Action::DeleteAddress
            | Action::CreateInstitution
            | Action::UpdateInstitution
            | Action::DeleteInstitution
            | Action::CreateClassroom
            | Action::UpdateClassroom
            | Action::DeleteClassroom => true,

            Action::CheckSignIn
            | Action::RenewSignIn
            | Action::GetAllUsers
            | Action::GetUser
            | Action::GetAddress
            | Action::GetAllAddresses
            | Action::GetAddressId
            | Action::GetAddressesByState
            | Action::GetInstitution
            | Action::GetAllInstitutions
            | Action::GetClassroom
            | Action::GetAllClassrooms
            | Action::GetClassroomsByInstitution => false,
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    GuestReadOnly,
    InsufficientRole { required: Role },
    NotOwner,
    AdminOnly,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => write!(f, "a valid session is required"),
            DenyReason::GuestReadOnly => write!(f, "guest sessions are read-only"),
            DenyReason::InsufficientRole { required } => {
                write!(f, "requires role {} or higher", required)
            }
            DenyReason::NotOwner => write!(f, "only the owner or an admin may do this"),
            DenyReason::AdminOnly => write!(f, "requires role ADMIN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into the matching client-facing error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => {
                Err(AppError::Auth(DenyReason::Unauthenticated.to_string()))
            }
            Decision::Deny(reason) => Err(AppError::Unauthorized(reason.to_string())),
        }
    }
}

/// Decides whether `actor` may perform `action` on a record owned by `target_owner`.
pub fn authorize(actor: Option<&Actor>, action: Action, target_owner: Option<UserId>) -> Decision {
    let rule = action.rule();

    if rule == Rule::Public {
        return Decision::Allow;
    }

    let Some(actor) = actor else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    if actor.role == Role::Admin {
        return Decision::Allow;
    }

    if actor.role == Role::Guest && action.is_mutation() {
        return Decision::Deny(DenyReason::GuestReadOnly);
    }

    match rule {
        Rule::Public | Rule::Authenticated => Decision::Allow,
        Rule::NonGuest if actor.role == Role::Guest => Decision::Deny(DenyReason::GuestReadOnly),
        Rule::NonGuest => Decision::Allow,
        Rule::AtLeast(required) if actor.role >= required => Decision::Allow,
        Rule::AtLeast(required) => Decision::Deny(DenyReason::InsufficientRole { required }),
        Rule::OwnerOrAdmin if target_owner == Some(actor.id) => Decision::Allow,
        Rule::OwnerOrAdmin => Decision::Deny(DenyReason::NotOwner),
        Rule::AdminOnly => Decision::Deny(DenyReason::AdminOnly),
    }
}

/// [`authorize`], logging and converting denials into errors.
pub fn require(actor: Option<&Actor>, action: Action, target_owner: Option<UserId>) -> Result<()> {
    let decision = authorize(actor, action, target_owner);
    if let Decision::Deny(reason) = decision {
        tracing::warn!(
            user_id = actor.map(|a| a.id),
            role = actor.map(|a| a.role.as_str()),
            ?action,
            %reason,
            "authorization denied"
        );
    }
    decision.into_result()
}

/// Whether a self-service sign-up may request `role`.
pub fn may_self_register_as(role: Role) -> bool {
    match role {
        Role::Guest | Role::Admin => false,
        Role::User | Role::Applier | Role::Publisher | Role::Coordinator => true,
    }
}
