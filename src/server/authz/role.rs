use std::fmt;

/// Known permission classes. Anything else parses to [`Role::Unknown`], which
/// never has an entry in the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Administrator,
    Physician,
    Nurse,
    Clerk,
    Auditor,
    Unknown(String),
}

impl Role {
    pub fn known() -> [Role; 5] {
        [
            Role::Administrator,
            Role::Physician,
            Role::Nurse,
            Role::Clerk,
            Role::Auditor,
        ]
    }

    /// Parses a stored role name. Comparison is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase();
        match normalized.as_str() {
            "administrator" => Role::Administrator,
            "physician" => Role::Physician,
            "nurse" => Role::Nurse,
            "clerk" => Role::Clerk,
            "auditor" => Role::Auditor,
            _ => Role::Unknown(normalized),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Role::Administrator => "administrator",
            Role::Physician => "physician",
            Role::Nurse => "nurse",
            Role::Clerk => "clerk",
            Role::Auditor => "auditor",
            Role::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
