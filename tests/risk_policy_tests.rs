//! Black-box classification and policy properties, exercised through the
//! public API only.

use shellguard::{
    AbortReason, ExecutionOptions, RiskAssessment, Strategy, classify, select,
};

#[test]
fn any_command_containing_rm_rf_is_severity_five() {
    for command in [
        "rm -rf /",
        "sudo rm -rf /data",
        "cd /srv && RM -RF cache",
        "echo cleanup && rm -rf ./build || true",
    ] {
        let risk = classify(command);
        assert_eq!(risk.severity, 5, "command: {command}");
        assert!(risk.is_risky);
    }
}

#[test]
fn severity_is_the_maximum_over_all_matches() {
    // "sudo" alone is 3, "rm" alone is 2, "rm -rf" is 5. The worst wins;
    // first-match iteration would report 3 or 2 here.
    let risk = classify("sudo rm -rf /data");
    assert_eq!(risk.severity, 5);
}

#[test]
fn harmless_listing_is_severity_one() {
    let risk = classify("ls -la");
    assert_eq!(risk.severity, 1);
    assert!(!risk.is_risky);
    assert_eq!(risk.reason, "no known risk pattern matched");
}

#[test]
fn dry_run_aborts_at_every_severity() {
    let opts = ExecutionOptions {
        dry_run: true,
        execute_requested: true,
        force_sandbox: false,
    };
    for command in ["ls", "sudo ls", "rm -rf /"] {
        let risk = classify(command);
        assert_eq!(
            select(&risk, opts, true),
            Strategy::Abort(AbortReason::DryRun),
            "command: {command}"
        );
    }
}

#[test]
fn severity_four_execute_without_opt_in_aborts() {
    let risk = RiskAssessment {
        is_risky: true,
        severity: 4,
        reason: "Elevated deletion privileges".to_string(),
    };
    let opts = ExecutionOptions {
        execute_requested: true,
        force_sandbox: false,
        dry_run: false,
    };
    assert_eq!(
        select(&risk, opts, true),
        Strategy::Abort(AbortReason::RequiresExplicitSandbox)
    );
}

#[test]
fn severity_three_is_never_direct() {
    let risk = classify("sudo apt update");
    assert_eq!(risk.severity, 3);
    let opts = ExecutionOptions::default();
    assert_eq!(select(&risk, opts, true), Strategy::ContainerIsolated);
    assert_eq!(select(&risk, opts, false), Strategy::ProcessIsolated);
}

#[test]
fn classification_is_idempotent() {
    let command = "tar xzf backup.tgz && mv data /srv";
    assert_eq!(classify(command), classify(command));
}
