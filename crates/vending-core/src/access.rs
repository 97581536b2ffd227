//! # Access Rules
//!
//! Pure role and ownership checks. The engine calls these after the session
//! gate has resolved an [`Identity`].
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  authorize(identity, required_role, owner_id)                  │
//! │                                                                │
//! │   identity.account_id == owner_id ?  ── no ──► false           │
//! │          │ yes                                                 │
//! │          ▼                                                     │
//! │   required_role is Some(r) and identity.role != r ? ─► false   │
//! │          │                                                     │
//! │          ▼                                                     │
//! │        true                                                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No hierarchy, no admin override.

use crate::types::{Identity, Role};

/// Actions guarded by [`authorize`]. The label feeds the
/// "insufficient rights to ..." message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deposit,
    ResetDeposit,
    Buy,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    ViewAccount,
    DeleteAccount,
    ChangePassword,
}

impl Action {
    /// Human readable verb phrase.
    pub const fn label(&self) -> &'static str {
        match self {
            Action::Deposit => "make deposit",
            Action::ResetDeposit => "reset deposit",
            Action::Buy => "make purchase",
            Action::CreateProduct => "create product",
            Action::UpdateProduct => "update product",
            Action::DeleteProduct => "delete product",
            Action::ViewAccount => "view account",
            Action::DeleteAccount => "delete account",
            Action::ChangePassword => "change password",
        }
    }

    /// Role the actor must hold, if any.
    pub const fn required_role(&self) -> Option<Role> {
        match self {
            Action::Deposit | Action::ResetDeposit | Action::Buy => Some(Role::Buyer),
            Action::CreateProduct | Action::UpdateProduct | Action::DeleteProduct => {
                Some(Role::Seller)
            }
            Action::ViewAccount | Action::DeleteAccount | Action::ChangePassword => None,
        }
    }
}

/// True when `identity` owns the resource and holds `required_role`.
pub fn authorize(identity: &Identity, required_role: Option<Role>, owner_id: &str) -> bool {
    if identity.account_id != owner_id {
        return false;
    }

    match required_role {
        Some(role) => identity.role == role,
        None => true,
    }
}

/// [`authorize`] with the role taken from `action`.
pub fn permits(identity: &Identity, action: Action, owner_id: &str) -> bool {
    authorize(identity, action.required_role(), owner_id)
}
