
use anyhow::{bail, Result};

use super::{Database, IdentityRecord};

pub fn run_all_tests(db: &Database) {
    identity::run_identity_tests(db);
    record::run_record_tests(db);

    test_rollback(db);
}

fn test_rollback(db: &Database) {
    let result: Result<()> = db.with_transaction(|tx| {
        tx.create_identity(&IdentityRecord::new(990001, "clerk", "hash"))?;
        tx.create_record("patients", &serde_json::Map::new())?;
        bail!("rollback");
    });
    assert!(result.is_err());

    db.with_transaction(|tx| {
        assert!(tx.get_identity_by_identifier(990001)?.is_none());
        Ok(())
    })
    .unwrap();
}
