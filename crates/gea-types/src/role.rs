//! Portal roles and their capability predicates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a portal user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// GEA administrator: full control of the portal
    GeaAdmin,
    /// GEA staff: reviews projects, documents and CPD logs
    GeaStaff,
    /// Administrator of a single GLAB
    GlabAdmin,
    /// Assessor employed by a GLAB, works on assigned projects
    GlabAssessor,
    /// External subject-matter expert assigned to projects
    TechnicalExpert,
    /// Member of a certification decision committee
    CertCommittee,
    /// Contact person of a client organization (read-only)
    ClientUser,
}

impl Role {
    /// GEA admin or staff
    pub fn is_gea(&self) -> bool {
        matches!(self, Role::GeaAdmin | Role::GeaStaff)
    }

    pub fn is_gea_admin(&self) -> bool {
        matches!(self, Role::GeaAdmin)
    }

    /// Can this role review documents, projects and CPD logs?
    pub fn can_review(&self) -> bool {
        self.is_gea()
    }

    /// GLAB admins and assessors work the operational checklist
    pub fn can_edit_operational_checklist(&self) -> bool {
        matches!(self, Role::GlabAdmin | Role::GlabAssessor)
    }

    /// GEA users work the quality-review checklist
    pub fn can_edit_quality_checklist(&self) -> bool {
        self.is_gea()
    }

    /// Roles whose visibility is bounded by a GLAB membership
    pub fn is_glab_side(&self) -> bool {
        matches!(self, Role::GlabAdmin | Role::GlabAssessor)
    }

    /// Roles that must be linked to a GLAB when created
    pub fn requires_glab(&self) -> bool {
        self.is_glab_side()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::GeaAdmin => "gea_admin",
            Role::GeaStaff => "gea_staff",
            Role::GlabAdmin => "glab_admin",
            Role::GlabAssessor => "glab_assessor",
            Role::TechnicalExpert => "technical_expert",
            Role::CertCommittee => "cert_committee",
            Role::ClientUser => "client_user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gea_admin" => Ok(Role::GeaAdmin),
            "gea_staff" => Ok(Role::GeaStaff),
            "glab_admin" => Ok(Role::GlabAdmin),
            "glab_assessor" => Ok(Role::GlabAssessor),
            "technical_expert" => Ok(Role::TechnicalExpert),
            "cert_committee" => Ok(Role::CertCommittee),
            "client_user" => Ok(Role::ClientUser),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Function of a GEA staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffFunction {
    ReviewTeam,
    QualityTeam,
    Operations,
    Finance,
    Registry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gea_predicates() {
        assert!(Role::GeaAdmin.is_gea());
        assert!(Role::GeaStaff.is_gea());
        assert!(!Role::GlabAdmin.is_gea());
        assert!(Role::GeaAdmin.is_gea_admin());
        assert!(!Role::GeaStaff.is_gea_admin());
    }

    #[test]
    fn test_checklist_predicates_are_disjoint() {
        for role in [
            Role::GeaAdmin,
            Role::GeaStaff,
            Role::GlabAdmin,
            Role::GlabAssessor,
            Role::TechnicalExpert,
            Role::CertCommittee,
            Role::ClientUser,
        ] {
            assert!(
                !(role.can_edit_operational_checklist() && role.can_edit_quality_checklist()),
                "{} edits both checklists",
                role
            );
        }
    }

    #[test]
    fn test_role_string_roundtrip() {
        let role: Role = "glab_assessor".parse().unwrap();
        assert_eq!(role, Role::GlabAssessor);
        assert_eq!(role.to_string(), "glab_assessor");
        assert!("superuser".parse::<Role>().is_err());
    }
}
