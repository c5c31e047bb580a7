use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzdecomposer::{ArgAlphabet, ArgMethod, MZDecomposer, OutputFormat};

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_peptide_config() {
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/peptide_test.toml"));
    let driver: MZDecomposer = config.extract().unwrap();
    assert_eq!(driver.masses.len(), 3);
    assert_eq!(driver.alphabet, ArgAlphabet::Peptide);
    assert_eq!(driver.method, ArgMethod::Residue);
    assert_eq!(driver.format, OutputFormat::Json);
    assert_eq!(driver.dual_error, 0.05);
    assert!(driver.alphabet_file.is_none());
    driver.main().unwrap();
}

#[test_log::test]
fn test_glycan_dual_config() {
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/glycan_dual_test.toml"));
    let driver: MZDecomposer = config.extract().unwrap();
    assert!(driver.count_only);
    assert_eq!(driver.dual_masses, vec![1102.55195]);
    driver.main().unwrap();
}

#[test]
fn test_config_defaults() {
    let driver: MZDecomposer = Figment::new().extract().unwrap();
    assert!(driver.masses.is_empty());
    assert_eq!(driver.error, 0.05);
    assert_eq!(driver.precision, 1e-3);
    assert!(driver.main().is_err());
}
