#![no_main]

use libfuzzer_sys::fuzz_target;
use partwall_grid::{AuthoritativeValidator, GridSnapshot};

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<GridSnapshot>(data) else {
        return;
    };
    let report = snapshot.invariant_report();
    let hash = snapshot.state_hash();

    // Loading must agree with the report and never panic.
    match AuthoritativeValidator::from_snapshot(snapshot, 0) {
        Ok(validator) => {
            assert!(!report.has_errors());
            assert_eq!(validator.state_hash(), hash);
        }
        Err(_) => assert!(report.has_errors()),
    }
});
