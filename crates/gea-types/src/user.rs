//! Portal user accounts

use crate::{ClientId, GlabId, Role, StaffFunction, UserId};
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Assessor certificates are valid for three years
pub const RECERTIFICATION_MONTHS: u32 = 36;

/// A portal user of any role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Login name (unique)
    pub username: String,

    /// Contact email (unique)
    pub email: String,

    /// Salted password digest, never serialized to API clients
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,

    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,

    /// Stored file name of the profile photo
    pub profile_photo: Option<String>,

    /// Role of the user
    pub role: Role,

    /// Function within GEA (GEA staff only)
    pub staff_function: Option<StaffFunction>,

    /// GLAB membership (GLAB admins and assessors)
    pub glab_id: Option<GlabId>,

    /// Client membership (client users)
    pub client_id: Option<ClientId>,

    /// Assessor certificate identifier
    pub assessor_certificate: Option<String>,

    /// Date the assessor was certified
    pub certification_date: Option<NaiveDate>,

    /// Date the assessor certificate must be renewed
    pub recertification_due: Option<NaiveDate>,

    /// Assessor specializations or technical-expert domains
    #[serde(default)]
    pub specializations: Vec<String>,

    /// Soft-deactivation flag
    pub is_active: bool,

    /// Whether the user wants email copies of notifications
    pub email_notifications: bool,

    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Create an active user with the given identity and role
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            full_name: None,
            phone: None,
            bio: None,
            profile_photo: None,
            role,
            staff_function: None,
            glab_id: None,
            client_id: None,
            assessor_certificate: None,
            certification_date: None,
            recertification_due: None,
            specializations: Vec::new(),
            is_active: true,
            email_notifications: true,
            created_at: Utc::now(),
            created_by: None,
            last_login: None,
        }
    }

    pub fn with_glab(mut self, glab_id: GlabId) -> Self {
        self.glab_id = Some(glab_id);
        self
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Record the certification date and derive the recertification deadline
    pub fn certify(&mut self, date: NaiveDate) {
        self.certification_date = Some(date);
        self.recertification_due = date.checked_add_months(Months::new(RECERTIFICATION_MONTHS));
    }

    /// Name shown to other users
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }

    /// Copy without the password digest, for API responses
    pub fn redacted(&self) -> Self {
        Self {
            password_hash: String::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certify_sets_three_year_deadline() {
        let mut user = User::new("a1", "a1@glab.test", "x", Role::GlabAssessor);
        user.certify(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(
            user.recertification_due,
            NaiveDate::from_ymd_opt(2027, 2, 28)
        );
    }

    #[test]
    fn test_redacted_hides_password() {
        let user = User::new("admin", "admin@gea.test", "salt$digest", Role::GeaAdmin);
        let json = serde_json::to_value(user.redacted()).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = User::new("jdoe", "j@x.test", "x", Role::ClientUser);
        assert_eq!(user.display_name(), "jdoe");
        let named = user.with_full_name("Jane Doe");
        assert_eq!(named.display_name(), "Jane Doe");
    }
}
