// security/src/roles.rs
use models::medical::Role;

/// Which roles an operation admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Doctors and assistants.
    Staff,
    DoctorOnly,
}

impl Access {
    pub fn admits(self, role: Role) -> bool {
        match self {
            Access::Staff => role.is_staff(),
            Access::DoctorOnly => role == Role::Doctor,
        }
    }

    pub fn denial(self) -> &'static str {
        match self {
            Access::Staff => "Staff access required",
            Access::DoctorOnly => "Doctor access required",
        }
    }
}
