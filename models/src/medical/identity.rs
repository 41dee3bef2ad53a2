// models/src/medical/identity.rs
// Staff and patients share one record shape; the role-specific part lives in
// the `IdentityKind` variant.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Assistant,
    Patient,
}

impl Role {
    pub const STAFF: [Role; 2] = [Role::Doctor, Role::Assistant];

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Doctor | Role::Assistant)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Assistant => "assistant",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "assistant" => Ok(Role::Assistant),
            "patient" => Ok(Role::Patient),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// Emails are compared case-insensitively; this is the stored form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityBase {
    pub id: RecordId,
    pub name: String,
    pub mobile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credential-bearing part of a doctor or assistant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub email: String,
    pub password_hash: String,
    /// SHA-256 hex digest of the outstanding reset token, never the raw token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IdentityKind {
    Doctor(StaffProfile),
    Assistant(StaffProfile),
    Patient(PatientProfile),
}

/// A stored identity. Contains the password hash, so it is never serialized
/// to clients; use [`Identity::view`] for outbound payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub base: IdentityBase,
    pub kind: IdentityKind,
}

impl Identity {
    /// Creates a doctor or assistant record around an already hashed password.
    pub fn new_staff(
        role: Role,
        name: String,
        mobile: String,
        email: &str,
        password_hash: String,
    ) -> ValidationResult<Self> {
        let profile = StaffProfile {
            email: normalize_email(email),
            password_hash,
            reset_token_hash: None,
            reset_token_expires_at: None,
            image: None,
            description: None,
        };
        let kind = match role {
            Role::Doctor => IdentityKind::Doctor(profile),
            Role::Assistant => IdentityKind::Assistant(profile),
            Role::Patient => return Err(ValidationError::UnknownRole("patient".to_string())),
        };
        Ok(Self { base: IdentityBase::fresh(name, mobile), kind })
    }

    pub fn new_patient(name: String, mobile: String, email: Option<&str>) -> Self {
        Self {
            base: IdentityBase::fresh(name, mobile),
            kind: IdentityKind::Patient(PatientProfile {
                email: email.map(normalize_email),
            }),
        }
    }

    pub fn id(&self) -> RecordId {
        self.base.id
    }

    pub fn role(&self) -> Role {
        match self.kind {
            IdentityKind::Doctor(_) => Role::Doctor,
            IdentityKind::Assistant(_) => Role::Assistant,
            IdentityKind::Patient(_) => Role::Patient,
        }
    }

    pub fn staff(&self) -> Option<&StaffProfile> {
        match &self.kind {
            IdentityKind::Doctor(profile) | IdentityKind::Assistant(profile) => Some(profile),
            IdentityKind::Patient(_) => None,
        }
    }

    pub fn staff_mut(&mut self) -> Option<&mut StaffProfile> {
        match &mut self.kind {
            IdentityKind::Doctor(profile) | IdentityKind::Assistant(profile) => Some(profile),
            IdentityKind::Patient(_) => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match &self.kind {
            IdentityKind::Doctor(profile) | IdentityKind::Assistant(profile) => Some(&profile.email),
            IdentityKind::Patient(profile) => profile.email.as_deref(),
        }
    }

    /// The staff email index key, `None` for patients.
    pub fn staff_email(&self) -> Option<&str> {
        self.staff().map(|profile| profile.email.as_str())
    }

    pub fn touch(&mut self) {
        self.base.updated_at = Utc::now();
    }

    pub fn view(&self) -> IdentityView {
        let (image, description) = match self.staff() {
            Some(profile) => (profile.image.clone(), profile.description.clone()),
            None => (None, None),
        };
        IdentityView {
            id: self.base.id,
            role: self.role(),
            name: self.base.name.clone(),
            mobile: self.base.mobile.clone(),
            email: self.email().map(str::to_string),
            image,
            description,
            created_at: self.base.created_at,
            updated_at: self.base.updated_at,
        }
    }

    pub fn contact(&self) -> ContactView {
        ContactView {
            id: self.base.id,
            name: self.base.name.clone(),
            email: self.email().map(str::to_string),
            mobile: self.base.mobile.clone(),
        }
    }
}

impl IdentityBase {
    fn fresh(name: String, mobile: String) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            name: name.trim().to_string(),
            mobile: mobile.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outbound projection of an identity, without credential fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: RecordId,
    pub role: Role,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `name email mobile` slice embedded in booking payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: RecordId,
    pub name: String,
    pub email: Option<String>,
    pub mobile: String,
}
