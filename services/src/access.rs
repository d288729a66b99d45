//! Which roles may perform which ticket operation.
//!
//! Ownership rules on top of this (e.g. a client only touching their own ticket) are
//! enforced by the services once the ticket is loaded.

use crate::error::ServiceError;
use db::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTicket,
    AcceptTicket,
    EndTicket,
    SendMessage,
    ViewTicket,
    LeaveTicket,
    ListTickets,
}

const RULES: &[(Operation, &[Role])] = &[
    (Operation::CreateTicket, &[Role::Client]),
    (Operation::AcceptTicket, &[Role::Agent]),
    (Operation::EndTicket, &[Role::Client, Role::Agent]),
    (Operation::SendMessage, &[Role::Client, Role::Agent]),
    (Operation::ViewTicket, &[Role::Client, Role::Agent]),
    (Operation::LeaveTicket, &[Role::Client, Role::Agent]),
    (Operation::ListTickets, &[Role::Client, Role::Agent]),
];

impl Operation {
    pub fn allowed_roles(self) -> &'static [Role] {
        RULES
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, roles)| *roles)
            .unwrap_or(&[])
    }

    pub fn permits(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    /// Reject roles outside the operation's allowed set with `InvalidUserRole`.
    pub fn check(self, role: Role) -> Result<(), ServiceError> {
        if self.permits(role) {
            Ok(())
        } else {
            Err(ServiceError::InvalidUserRole)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operation; 7] = [
        Operation::CreateTicket,
        Operation::AcceptTicket,
        Operation::EndTicket,
        Operation::SendMessage,
        Operation::ViewTicket,
        Operation::LeaveTicket,
        Operation::ListTickets,
    ];

    #[test]
    fn matrix() {
        assert!(Operation::CreateTicket.permits(Role::Client));
        assert!(!Operation::CreateTicket.permits(Role::Agent));
        assert!(Operation::AcceptTicket.permits(Role::Agent));
        assert!(!Operation::AcceptTicket.permits(Role::Client));
        assert!(Operation::EndTicket.permits(Role::Client));
        assert!(Operation::SendMessage.permits(Role::Agent));
    }

    #[test]
    fn every_operation_has_a_rule_and_admin_has_none() {
        for op in ALL {
            assert!(!op.allowed_roles().is_empty(), "{op:?} has no rule");
            assert!(matches!(op.check(Role::Admin), Err(ServiceError::InvalidUserRole)));
        }
    }
}
