use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::stages::Stage;

/// Authorization category of a pre-verified actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Receptionist,
    LabTechnician,
    LabScientist,
    Pathologist,
    Secretary,
    Admin,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Receptionist,
        Role::LabTechnician,
        Role::LabScientist,
        Role::Pathologist,
        Role::Secretary,
        Role::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Receptionist => "receptionist",
            Role::LabTechnician => "lab_technician",
            Role::LabScientist => "lab_scientist",
            Role::Pathologist => "pathologist",
            Role::Secretary => "secretary",
            Role::Admin => "admin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Receptionist => "Receptionist",
            Role::LabTechnician => "Medical Lab Technician",
            Role::LabScientist => "Medical Lab Scientist",
            Role::Pathologist => "Pathologist",
            Role::Secretary => "Secretary/Typist",
            Role::Admin => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

const LAB_STAFF: &[Role] = &[Role::LabTechnician, Role::LabScientist, Role::Admin];

/// Roles allowed to move a specimen *into* `stage`.
///
/// Never empty, and `Role::Admin` is always the last member. The match has no
/// wildcard arm so adding a stage forces a decision here.
pub fn allowed_roles(stage: Stage) -> &'static [Role] {
    match stage {
        Stage::Reception => &[Role::Receptionist, Role::Admin],
        Stage::Grossing
        | Stage::Processing
        | Stage::Embedding
        | Stage::Sectioning
        | Stage::Staining
        | Stage::SlideLabeling
        | Stage::SlideDispatch => LAB_STAFF,
        Stage::Reporting => &[Role::Pathologist, Role::Admin],
        Stage::Verification => &[Role::Secretary, Role::Pathologist, Role::Admin],
        Stage::ReportDispatch => &[Role::Secretary, Role::Receptionist, Role::Admin],
    }
}

pub fn is_allowed(role: Role, stage: Stage) -> bool {
    role == Role::Admin || allowed_roles(stage).contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_has_roles_and_admin_last() {
        for stage in Stage::ALL {
            let roles = allowed_roles(stage);
            assert!(!roles.is_empty(), "{stage} has no roles");
            assert_eq!(roles.last(), Some(&Role::Admin), "{stage}");
        }
    }

    #[test]
    fn test_reference_matrix_rows() {
        assert_eq!(allowed_roles(Stage::Reporting), &[Role::Pathologist, Role::Admin]);
        assert_eq!(allowed_roles(Stage::Reception), &[Role::Receptionist, Role::Admin]);
        assert_eq!(
            allowed_roles(Stage::Grossing),
            &[Role::LabTechnician, Role::LabScientist, Role::Admin]
        );
        assert!(is_allowed(Role::LabTechnician, Stage::Grossing));
        assert!(!is_allowed(Role::Receptionist, Stage::Reporting));
    }

    #[test]
    fn test_admin_allowed_everywhere() {
        for stage in Stage::ALL {
            assert!(is_allowed(Role::Admin, stage));
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("lab_technician".parse::<Role>().unwrap(), Role::LabTechnician);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("janitor".parse::<Role>().is_err());
        assert_eq!(Role::Secretary.label(), "Secretary/Typist");
    }
}
