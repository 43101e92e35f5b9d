//! Role set and screen access policy.
//!
//! The role list is closed and the screen table below is the single
//! authority for who may open which management screen. The server enforces
//! the same role sets per operation through `CurrentUser::require_role`.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
    Accountant,
    Librarian,
    Receptionist,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Teacher,
        Role::Student,
        Role::Parent,
        Role::Accountant,
        Role::Librarian,
        Role::Receptionist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Accountant => "accountant",
            Role::Librarian => "librarian",
            Role::Receptionist => "receptionist",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Role::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown role: {s}").into()))
    }
}

/// Client-side screens gated by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Users,
    Teachers,
    Parents,
    Settings,
    Students,
    Classes,
    Subjects,
    Reports,
    Attendance,
    Exams,
    Dashboard,
    Finance,
}

impl Screen {
    pub const ALL: [Screen; 12] = [
        Screen::Users,
        Screen::Teachers,
        Screen::Parents,
        Screen::Settings,
        Screen::Students,
        Screen::Classes,
        Screen::Subjects,
        Screen::Reports,
        Screen::Attendance,
        Screen::Exams,
        Screen::Dashboard,
        Screen::Finance,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Screen::Users => "/users",
            Screen::Teachers => "/teachers",
            Screen::Parents => "/parents",
            Screen::Settings => "/settings",
            Screen::Students => "/students",
            Screen::Classes => "/classes",
            Screen::Subjects => "/subjects",
            Screen::Reports => "/reports",
            Screen::Attendance => "/attendance",
            Screen::Exams => "/exams",
            Screen::Dashboard => "/dashboard",
            Screen::Finance => "/finance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Any authenticated identity may enter.
    AnyAuthenticated,
    /// Only the listed roles may enter.
    Roles(&'static [Role]),
}

/// The screen policy table. Exhaustive over `Screen`, so adding a screen
/// without deciding its policy fails to compile.
pub fn policy_for(screen: Screen) -> AccessPolicy {
    match screen {
        Screen::Users | Screen::Teachers | Screen::Parents | Screen::Settings => {
            AccessPolicy::Roles(&[Role::Admin])
        }
        Screen::Students | Screen::Classes | Screen::Subjects | Screen::Reports => {
            AccessPolicy::Roles(&[Role::Admin, Role::Teacher])
        }
        Screen::Attendance | Screen::Exams | Screen::Dashboard => AccessPolicy::AnyAuthenticated,
        Screen::Finance => AccessPolicy::Roles(&[Role::Admin, Role::Accountant, Role::Parent]),
    }
}

/// Outcome of a route-guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// No identity: route to the login screen.
    SignIn,
    /// Authenticated but outside the allowed set: route to the
    /// unauthorized screen, never back to login.
    Forbidden,
}

/// Pure guard decision. No side effects; the caller performs the redirect
/// its variant names.
pub fn can_access(role: Option<Role>, policy: AccessPolicy) -> Access {
    let Some(role) = role else {
        return Access::SignIn;
    };
    match policy {
        AccessPolicy::AnyAuthenticated => Access::Granted,
        AccessPolicy::Roles(allowed) => {
            if allowed.contains(&role) {
                Access::Granted
            } else {
                Access::Forbidden
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_identity_is_sent_to_login() {
        assert_eq!(
            can_access(None, policy_for(Screen::Dashboard)),
            Access::SignIn
        );
        assert_eq!(can_access(None, policy_for(Screen::Users)), Access::SignIn);
    }

    #[test]
    fn authenticated_but_disallowed_is_forbidden_not_signin() {
        assert_eq!(
            can_access(Some(Role::Student), policy_for(Screen::Users)),
            Access::Forbidden
        );
    }

    #[test]
    fn any_authenticated_screens_admit_every_role() {
        for role in Role::ALL {
            assert_eq!(
                can_access(Some(role), policy_for(Screen::Dashboard)),
                Access::Granted
            );
        }
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("janitor"), None);
    }
}
