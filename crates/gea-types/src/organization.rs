//! Organization registry: GLABs and their clients

use crate::{ClientId, GlabId, UserId};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// License renewal cadence of a GLAB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    #[default]
    Annual,
    Triennial,
}

impl LicenseType {
    /// Days between license payments
    pub fn renewal_days(&self) -> i64 {
        match self {
            LicenseType::Annual => 365,
            LicenseType::Triennial => 365 * 3,
        }
    }
}

/// Operating status of a GLAB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlabStatus {
    #[default]
    Active,
    Suspended,
    Terminated,
}

/// A licensed assessment body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Glab {
    pub id: GlabId,
    pub name: String,

    /// License number (unique); prefixes project reference numbers
    pub license_number: String,

    pub country: String,
    pub address: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,

    pub license_type: LicenseType,
    pub license_start_date: Option<NaiveDate>,
    pub license_expiry_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,

    /// Drives license payment reminders
    pub next_payment_due: Option<NaiveDate>,

    pub status: GlabStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
}

impl Glab {
    pub fn new(
        name: impl Into<String>,
        license_number: impl Into<String>,
        country: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            id: GlabId::generate(),
            name: name.into(),
            license_number: license_number.into(),
            country: country.into(),
            address: None,
            contact_email: contact_email.into(),
            contact_phone: None,
            license_type: LicenseType::Annual,
            license_start_date: None,
            license_expiry_date: None,
            last_payment_date: None,
            next_payment_due: None,
            status: GlabStatus::Active,
            created_at: Utc::now(),
            created_by: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GlabStatus::Active
    }

    /// Record a license payment and schedule the next one
    pub fn record_license_payment(&mut self, paid_on: NaiveDate) {
        self.last_payment_date = Some(paid_on);
        self.next_payment_due = Some(paid_on + Duration::days(self.license_type.renewal_days()));
    }
}

/// An organization seeking certification, owned by one GLAB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub country: String,
    pub registered_address: Option<String>,
    pub industry_sector: Option<String>,
    pub total_employees: Option<u32>,

    /// Multi-site clients attract a fee premium
    pub number_of_sites: u32,

    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub primary_contact_phone: Option<String>,

    /// Owning GLAB
    pub glab_id: GlabId,

    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
}

impl Client {
    pub fn new(name: impl Into<String>, country: impl Into<String>, glab_id: GlabId) -> Self {
        Self {
            id: ClientId::generate(),
            name: name.into(),
            country: country.into(),
            registered_address: None,
            industry_sector: None,
            total_employees: None,
            number_of_sites: 1,
            primary_contact_name: None,
            primary_contact_email: None,
            primary_contact_phone: None,
            glab_id,
            created_at: Utc::now(),
            created_by: None,
        }
    }

    pub fn is_multi_site(&self) -> bool {
        self.number_of_sites > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annual_license_payment() {
        let mut glab = Glab::new("Acme", "GL-001", "Kenya", "ops@acme.test");
        glab.record_license_payment(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(glab.next_payment_due, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_triennial_license_payment() {
        let mut glab = Glab::new("Acme", "GL-001", "Kenya", "ops@acme.test");
        glab.license_type = LicenseType::Triennial;
        glab.record_license_payment(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(glab.next_payment_due, NaiveDate::from_ymd_opt(2028, 1, 1));
    }
}
