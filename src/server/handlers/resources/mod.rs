pub mod dispatch;

/// Every resource the API serves. Names are passed as-is to the policy
/// engine.
pub const RESOURCES: [&str; 17] = [
    "regions",
    "sites",
    "departments",
    "positions",
    "roles",
    "document_types",
    "service_types",
    "equipment_types",
    "suppliers",
    "persons",
    "employees",
    "patients",
    "appointments",
    "medical_records",
    "prescriptions",
    "medications",
    "equipment",
];

pub fn is_registered(resource: &str) -> bool {
    RESOURCES.contains(&resource)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_registry() {
        let unique: HashSet<&str> = RESOURCES.iter().copied().collect();
        assert_eq!(unique.len(), RESOURCES.len());

        assert!(is_registered("patients"));
        assert!(is_registered("medical_records"));
        assert!(!is_registered("Patients"));
        assert!(!is_registered("whoami"));
        assert!(!is_registered(""));
    }
}
