use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn normalize_weights_personal_scores() {
    Command::cargo_bin("credit-lens")
        .unwrap()
        .args([
            "normalize",
            "--cibil",
            "760",
            "--crif",
            "748",
            "--equifax",
            "754",
            "--experian",
            "742",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score breakdown (personal)"))
        .stdout(predicate::str::contains("Weighted total: 754.6"))
        .stdout(predicate::str::contains("Normalized score: 755"));
}

#[test]
fn normalize_rejects_unknown_purpose() {
    Command::cargo_bin("credit-lens")
        .unwrap()
        .args([
            "normalize",
            "--cibil",
            "760",
            "--crif",
            "748",
            "--equifax",
            "754",
            "--experian",
            "742",
            "--purpose",
            "unknown",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown loan purpose"));
}

#[test]
fn weights_is_the_default_command() {
    Command::cargo_bin("credit-lens")
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("purpose"))
        .stdout(predicate::str::contains("education"))
        .stdout(predicate::str::contains("0.15"));
}
