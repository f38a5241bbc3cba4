//! User roles, navigation and route access.
//!
//! One static table maps each role to its navigation items and default landing route.
//! [`Role::can_access`] answers whether a role may use a route group.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "doctor")]
    Doctor,
    #[serde(rename = "user")]
    Patient,
}

/// Route groups guarded by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteGroup {
    /// Reachable by any signed-in user.
    Authenticated,
    /// Diagnosis, patients and bundles.
    Doctor,
    /// User and doctor administration.
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    pub href: &'static str,
    pub description: &'static str,
}

const fn nav(name: &'static str, href: &'static str, description: &'static str) -> NavItem {
    NavItem {
        name,
        href,
        description,
    }
}

const ADMIN_NAV: [NavItem; 4] = [
    nav("Dashboard", "/admin/dashboard", "System overview and analytics"),
    nav("Users", "/admin/users", "Manage patient accounts"),
    nav("Doctors", "/admin/doctors", "Manage doctor accounts"),
    nav("Analytics", "/admin/analytics", "System statistics and trends"),
];

const DOCTOR_NAV: [NavItem; 4] = [
    nav("Dashboard", "/doctor/dashboard", "Overview of appointments and patients"),
    nav("Patients", "/doctor/patients", "Manage and search patients"),
    nav("Diagnose", "/doctor/diagnose", "Create diagnoses and prescriptions"),
    nav("Records", "/doctor/records", "View patient medical records"),
];

const PATIENT_NAV: [NavItem; 4] = [
    nav("Dashboard", "/dashboard", "Your health overview"),
    nav("Records", "/records", "Medical history and records"),
    nav("Prescriptions", "/prescriptions", "Current and past prescriptions"),
    nav("Profile", "/profile", "Personal information and settings"),
];

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Doctor, Role::Patient];

    /// Wire name (`admin`, `doctor`, `user`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Patient => "user",
        }
    }

    pub fn navigation(self) -> &'static [NavItem] {
        match self {
            Self::Admin => &ADMIN_NAV,
            Self::Doctor => &DOCTOR_NAV,
            Self::Patient => &PATIENT_NAV,
        }
    }

    /// Landing route after sign-in.
    pub fn default_route(self) -> &'static str {
        match self {
            Self::Admin => "/app/admin/dashboard",
            Self::Doctor => "/app/doctor/dashboard",
            Self::Patient => "/app/dashboard",
        }
    }

    pub fn can_access(self, group: RouteGroup) -> bool {
        match group {
            RouteGroup::Authenticated => true,
            RouteGroup::Doctor => matches!(self, Self::Doctor | Self::Admin),
            RouteGroup::Admin => self == Self::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::EmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| crate::EmrError::InvalidInput(format!("unknown role: {s}")))
    }
}
