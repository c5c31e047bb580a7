use std::{error::Error, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_alphabet_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;

    cmd.arg("500.0").args(["-f", "not_real.txt"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not_real.txt"));
    Ok(())
}

#[test]
fn test_negative_error() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;

    cmd.arg("500.0").arg("--error=-1");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("`-1` is less than zero"));
    Ok(())
}

#[test]
fn test_no_masses() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("NoMasses"));
    Ok(())
}

#[test]
fn test_run_peptide() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.env("RUST_LOG", "info");
    cmd.args(["128.09496", "342.17", "-e", "0.002", "-o", "-"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            "query\ttarget\tcomposition\tmass\terror",
        ))
        .stdout(predicate::str::contains("0\t128.09496\tK1\t"))
        .stdout(predicate::str::contains("1\t342.17\tG1V1W1\t"))
        .stdout(predicate::str::contains("Q1").not())
        .stderr(predicate::str::contains("Compositions Found: 2"));
    Ok(())
}

#[test]
fn test_run_text_alphabet_json() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.args([
        "892.3172",
        "-f",
        "tests/data/glycans.txt",
        "-e",
        "0.01",
        "--format",
        "json",
        "-m",
        "recursive",
        "-P",
        "0.01",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"formula\":\"Hex3HexNAc2\""));
    Ok(())
}

#[test]
fn test_run_toml_alphabet_gcd() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.args([
        "215.09061",
        "-f",
        "tests/data/residues.toml",
        "-e",
        "0.005",
        "--gcd",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("G1A1S1"));
    Ok(())
}

#[test]
fn test_dual_mass_mismatch() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.args([
        "892.3172",
        "600.0",
        "-f",
        "tests/data/glycans.txt",
        "-d",
        "1102.55195",
        "--dual-alphabet-file",
        "tests/data/glycans_labeled.txt",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("DualMassCountMismatch"));
    Ok(())
}

#[test]
fn test_run_dual() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.args([
        "892.3172",
        "-f",
        "tests/data/glycans.txt",
        "-d",
        "1102.55195",
        "--dual-alphabet-file",
        "tests/data/glycans_labeled.txt",
        "-e",
        "0.01",
        "--dual-error",
        "0.01",
        "-P",
        "0.01",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "query\ttarget\tcomposition\tmass\terror\tdual_target\tdual_mass",
        ))
        .stdout(predicate::str::contains("Hex3HexNAc2"));
    Ok(())
}

#[test]
fn test_run_ppm() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.env("RUST_LOG", "info");
    cmd.args(["342.17", "-p", "5", "-o", "-"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0\t342.17\tG1V1W1\t"))
        .stderr(predicate::str::contains("Compositions Found: 1"));
    Ok(())
}

#[test]
fn test_run_count_only() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzdecomposer")?;
    cmd.args(["128.09496", "-e", "0.002", "-c", "-o", "-"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("query\ttarget\tcount"))
        .stdout(predicate::str::contains("0\t128.09496\t1"));
    Ok(())
}
