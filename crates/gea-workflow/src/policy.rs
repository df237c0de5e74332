//! Access policy
//!
//! Every check returns an [`AccessDecision`]; handlers turn a denial into
//! a `403`. GEA users see everything. GLAB-side users are bounded by their
//! GLAB, assessors further by their assignments, and experts, committee
//! members and client users by their own projects.

use crate::{WorkflowError, WorkflowResult};
use gea_types::{Client, ClientId, GlabId, Project, Role, User, UserId};
use serde::{Deserialize, Serialize};

/// The authenticated user, as far as access checks care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub glab_id: Option<GlabId>,
    pub client_id: Option<ClientId>,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            glab_id: user.glab_id,
            client_id: user.client_id,
        }
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDecision {
    Allow,
    Deny { reason: String },
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self::Allow
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    fn when(cond: bool, reason: &str) -> Self {
        if cond {
            Self::Allow
        } else {
            Self::deny(reason)
        }
    }

    /// `Allow` only if both allow; the first denial wins
    pub fn and(self, other: AccessDecision) -> Self {
        match self {
            Self::Allow => other,
            deny => deny,
        }
    }

    pub fn into_result(self) -> WorkflowResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny { reason } => Err(WorkflowError::AccessDenied(reason)),
        }
    }
}

impl Actor {
    fn in_glab(&self, glab: GlabId) -> bool {
        self.glab_id == Some(glab)
    }

    fn is_glab_admin_of(&self, glab: GlabId) -> bool {
        self.role == Role::GlabAdmin && self.in_glab(glab)
    }

    pub fn require_gea(&self) -> AccessDecision {
        AccessDecision::when(self.role.is_gea(), "GEA access required")
    }

    pub fn require_gea_admin(&self) -> AccessDecision {
        AccessDecision::when(self.role.is_gea_admin(), "GEA administrator access required")
    }

    pub fn view_glab(&self, glab: GlabId) -> AccessDecision {
        AccessDecision::when(self.role.is_gea() || self.in_glab(glab), "not a member of this GLAB")
    }

    pub fn view_client(&self, client: &Client) -> AccessDecision {
        let allowed = match self.role {
            Role::GeaAdmin | Role::GeaStaff => true,
            Role::GlabAdmin | Role::GlabAssessor => self.in_glab(client.glab_id),
            Role::ClientUser => self.client_id == Some(client.id),
            Role::TechnicalExpert | Role::CertCommittee => false,
        };
        AccessDecision::when(allowed, "client belongs to another GLAB")
    }

    /// GEA, or the administrator of the owning GLAB
    pub fn manage_clients(&self, glab: GlabId) -> AccessDecision {
        AccessDecision::when(
            self.role.is_gea() || self.is_glab_admin_of(glab),
            "only GEA or the GLAB administrator may manage clients",
        )
    }

    pub fn view_project(&self, project: &Project) -> AccessDecision {
        let allowed = match self.role {
            Role::GeaAdmin | Role::GeaStaff => true,
            Role::GlabAdmin => self.in_glab(project.glab_id),
            Role::GlabAssessor => self.in_glab(project.glab_id) && project.is_assessor(self.id),
            Role::TechnicalExpert | Role::CertCommittee => project.is_participant(self.id),
            Role::ClientUser => self.client_id == Some(project.client_id),
        };
        AccessDecision::when(allowed, "no access to this project")
    }

    pub fn create_project(&self, glab: GlabId) -> AccessDecision {
        match self.role {
            Role::GeaAdmin | Role::GeaStaff => AccessDecision::allow(),
            Role::GlabAdmin if self.in_glab(glab) => AccessDecision::allow(),
            Role::GlabAssessor => AccessDecision::deny("assessors cannot create projects"),
            _ => AccessDecision::deny("not permitted to create projects for this GLAB"),
        }
    }

    /// Fees and payments: GEA or the owning GLAB's administrator
    pub fn manage_project(&self, project: &Project) -> AccessDecision {
        AccessDecision::when(
            self.role.is_gea() || self.is_glab_admin_of(project.glab_id),
            "only GEA or the GLAB administrator may manage this project",
        )
    }

    /// GEA, the GLAB administrator, or an assigned assessor
    pub fn advance_project(&self, project: &Project) -> AccessDecision {
        let allowed = self.role.is_gea()
            || self.is_glab_admin_of(project.glab_id)
            || (self.role == Role::GlabAssessor
                && self.in_glab(project.glab_id)
                && project.is_assessor(self.id));
        AccessDecision::when(allowed, "not permitted to advance this project")
    }

    pub fn toggle_checklist(&self, project: &Project) -> AccessDecision {
        if self.role.is_gea() {
            return AccessDecision::deny("only GLAB users can mark checklist items");
        }
        AccessDecision::when(
            self.role.can_edit_operational_checklist(),
            "only GLAB users can mark checklist items",
        )
        .and(self.view_project(project))
    }

    pub fn toggle_quality_checklist(&self) -> AccessDecision {
        AccessDecision::when(
            self.role.can_edit_quality_checklist(),
            "only GEA users can mark quality checks",
        )
    }

    pub fn upload_document(&self, project: &Project) -> AccessDecision {
        let role_ok = matches!(
            self.role,
            Role::GeaAdmin
                | Role::GeaStaff
                | Role::GlabAdmin
                | Role::GlabAssessor
                | Role::TechnicalExpert
        );
        AccessDecision::when(role_ok, "not permitted to upload documents")
            .and(self.view_project(project))
    }

    /// Project chat is between GEA and the GLAB working the project
    pub fn chat(&self, project: &Project) -> AccessDecision {
        let allowed = self.role.is_gea()
            || (self.role.is_glab_side() && self.view_project(project).is_allowed());
        AccessDecision::when(allowed, "no access to this project's chat")
    }

    pub fn assign_assessor(&self, project: &Project, assessor: &User) -> AccessDecision {
        if !(self.role.is_gea() || self.is_glab_admin_of(project.glab_id)) {
            return AccessDecision::deny("only GEA or the GLAB administrator may assign assessors");
        }
        if assessor.role != Role::GlabAssessor || !assessor.is_active {
            return AccessDecision::deny("user is not an active assessor");
        }
        AccessDecision::when(
            assessor.glab_id == Some(project.glab_id),
            "assessor does not belong to the project's GLAB",
        )
    }

    pub fn assign_expert(&self, expert: &User) -> AccessDecision {
        self.require_gea().and(AccessDecision::when(
            expert.role == Role::TechnicalExpert && expert.is_active,
            "user is not an active technical expert",
        ))
    }

    pub fn assign_committee(&self, member: &User) -> AccessDecision {
        self.require_gea_admin().and(AccessDecision::when(
            member.role == Role::CertCommittee && member.is_active,
            "user is not an active committee member",
        ))
    }

    pub fn submit_cpd(&self) -> AccessDecision {
        AccessDecision::when(
            self.role == Role::GlabAssessor,
            "only assessors can submit CPD logs",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gea_types::{FeeSchedule, FeeSplit};

    fn actor(role: Role, glab: Option<GlabId>) -> Actor {
        Actor {
            id: UserId::generate(),
            role,
            glab_id: glab,
            client_id: None,
        }
    }

    fn project(glab: GlabId) -> Project {
        Project::new(
            "GL-2025-0001",
            glab,
            ClientId::generate(),
            FeeSchedule::default(),
            FeeSplit::default(),
        )
    }

    #[test]
    fn test_gea_sees_everything_but_cannot_toggle() {
        let p = project(GlabId::generate());
        let gea = actor(Role::GeaStaff, None);
        assert!(gea.view_project(&p).is_allowed());
        assert!(gea.toggle_quality_checklist().is_allowed());
        assert_eq!(
            gea.toggle_checklist(&p),
            AccessDecision::deny("only GLAB users can mark checklist items")
        );
    }

    #[test]
    fn test_other_glab_cannot_view_or_mutate() {
        let mine = GlabId::generate();
        let p = project(GlabId::generate());
        let admin = actor(Role::GlabAdmin, Some(mine));
        assert!(!admin.view_project(&p).is_allowed());
        assert!(!admin.manage_project(&p).is_allowed());
        assert!(!admin.advance_project(&p).is_allowed());
        assert!(!admin.toggle_checklist(&p).is_allowed());
        assert!(!admin.upload_document(&p).is_allowed());
        assert!(!admin.create_project(p.glab_id).is_allowed());
        assert!(!admin.view_glab(p.glab_id).is_allowed());
    }

    #[test]
    fn test_assessor_needs_assignment() {
        let glab = GlabId::generate();
        let mut p = project(glab);
        let assessor = actor(Role::GlabAssessor, Some(glab));
        assert!(!assessor.view_project(&p).is_allowed());
        p.assessors.push(assessor.id);
        assert!(assessor.view_project(&p).is_allowed());
        assert!(assessor.toggle_checklist(&p).is_allowed());
        assert!(assessor.advance_project(&p).is_allowed());
        assert!(!assessor.create_project(glab).is_allowed());
    }

    #[test]
    fn test_assessor_must_belong_to_project_glab() {
        let glab = GlabId::generate();
        let p = project(glab);
        let admin = actor(Role::GlabAdmin, Some(glab));
        let outsider =
            User::new("a", "a@x.test", "", Role::GlabAssessor).with_glab(GlabId::generate());
        let insider = User::new("b", "b@x.test", "", Role::GlabAssessor).with_glab(glab);
        assert!(!admin.assign_assessor(&p, &outsider).is_allowed());
        assert!(admin.assign_assessor(&p, &insider).is_allowed());

        let staff = User::new("c", "c@x.test", "", Role::GeaStaff);
        assert!(!admin.assign_assessor(&p, &staff).is_allowed());
    }

    #[test]
    fn test_client_user_sees_own_projects() {
        let p = project(GlabId::generate());
        let mut client = actor(Role::ClientUser, None);
        assert!(!client.view_project(&p).is_allowed());
        client.client_id = Some(p.client_id);
        assert!(client.view_project(&p).is_allowed());
        assert!(!client.upload_document(&p).is_allowed());
        assert!(!client.chat(&p).is_allowed());
    }

    #[test]
    fn test_expert_sees_assigned_projects() {
        let mut p = project(GlabId::generate());
        let expert = actor(Role::TechnicalExpert, None);
        assert!(!expert.view_project(&p).is_allowed());
        p.technical_experts.push(expert.id);
        assert!(expert.view_project(&p).is_allowed());
        assert!(!expert.toggle_checklist(&p).is_allowed());
    }

    #[test]
    fn test_denial_maps_to_error() {
        let err = actor(Role::ClientUser, None)
            .require_gea_admin()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AccessDenied(_)));
    }
}
