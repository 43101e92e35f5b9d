//! Exhaustive verification of the route guard against the screen policy
//! table: every (role, screen) pair, plus the absent-identity row.

use registrar::policy::{can_access, policy_for, Access, Role, Screen};

/// The authoritative table, restated independently of `policy_for` so a
/// drift in either direction fails here.
fn expected(role: Role, screen: Screen) -> Access {
    let allowed = match screen {
        Screen::Users | Screen::Teachers | Screen::Parents | Screen::Settings => {
            role == Role::Admin
        }
        Screen::Students | Screen::Classes | Screen::Subjects | Screen::Reports => {
            role == Role::Admin || role == Role::Teacher
        }
        Screen::Attendance | Screen::Exams | Screen::Dashboard => true,
        Screen::Finance => {
            role == Role::Admin || role == Role::Accountant || role == Role::Parent
        }
    };
    if allowed {
        Access::Granted
    } else {
        Access::Forbidden
    }
}

#[test]
fn every_role_screen_pair_matches_the_table() {
    for screen in Screen::ALL {
        for role in Role::ALL {
            assert_eq!(
                can_access(Some(role), policy_for(screen)),
                expected(role, screen),
                "role {role:?} on {}",
                screen.path()
            );
        }
    }
}

#[test]
fn absent_identity_is_denied_on_every_screen() {
    for screen in Screen::ALL {
        assert_eq!(
            can_access(None, policy_for(screen)),
            Access::SignIn,
            "unauthenticated on {}",
            screen.path()
        );
    }
}

#[test]
fn denied_roles_are_forbidden_not_sent_to_login() {
    // A 403 keeps the session; only a missing identity routes to login.
    for role in [Role::Student, Role::Librarian, Role::Receptionist] {
        assert_eq!(
            can_access(Some(role), policy_for(Screen::Users)),
            Access::Forbidden
        );
        assert_eq!(
            can_access(Some(role), policy_for(Screen::Finance)),
            Access::Forbidden
        );
    }
}
