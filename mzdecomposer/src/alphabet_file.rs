use std::collections::BTreeMap;
use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use mzdecompose::alphabet::formula_mass;
use mzdecompose::{Alphabet, AlphabetEntry, DecompositionError};

#[derive(Debug, Error)]
pub enum AlphabetFileError {
    #[error("Failed to read alphabet file: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to parse TOML alphabet file: {0}")]
    TomlError(
        #[source]
        #[from]
        toml::de::Error,
    ),
    #[error("Malformed alphabet entry on line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("Alphabet entry {0:?} must give exactly one of `mass` or `formula`")]
    AmbiguousEntry(String),
    #[error(transparent)]
    DecompositionError(#[from] DecompositionError),
}

#[derive(Debug, Clone, Deserialize)]
struct TomlEntry {
    name: String,
    mass: Option<f64>,
    formula: Option<BTreeMap<String, i32>>,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlAlphabet {
    residues: Vec<TomlEntry>,
}

impl TryFrom<TomlEntry> for AlphabetEntry {
    type Error = AlphabetFileError;

    fn try_from(value: TomlEntry) -> Result<Self, Self::Error> {
        match (value.mass, value.formula) {
            (Some(mass), None) => Ok(AlphabetEntry::new(value.name, mass)),
            (None, Some(formula)) => {
                let pairs: Vec<(&str, i32)> =
                    formula.iter().map(|(e, c)| (e.as_str(), *c)).collect();
                let mass = formula_mass(&pairs)?;
                Ok(AlphabetEntry::new(value.name, mass))
            }
            _ => Err(AlphabetFileError::AmbiguousEntry(value.name)),
        }
    }
}

/// Parse a TOML document with one `[[residues]]` table per entry
pub fn parse_toml_alphabet(text: &str) -> Result<Alphabet, AlphabetFileError> {
    let doc: TomlAlphabet = toml::from_str(text)?;
    doc.residues
        .into_iter()
        .map(AlphabetEntry::try_from)
        .collect()
}

/// Read whitespace separated `name mass` pairs, one per line. Blank lines and
/// anything after a `#` are skipped.
pub fn read_text_alphabet<R: BufRead>(reader: R) -> Result<Alphabet, AlphabetFileError> {
    let mut alphabet = Alphabet::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let mut tokens = content.split_whitespace();
        let entry = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(name), Some(mass), None) => mass
                .parse::<f64>()
                .ok()
                .map(|mass| AlphabetEntry::new(name, mass)),
            _ => None,
        };
        match entry {
            Some(entry) => alphabet.extend([entry]),
            None => {
                return Err(AlphabetFileError::MalformedLine {
                    line: i + 1,
                    content: line.clone(),
                })
            }
        }
    }
    Ok(alphabet)
}

/// Load an alphabet from `path`, reading it as TOML if the extension is `.toml` and as
/// plain text otherwise.
pub fn load_alphabet(path: &Path) -> Result<Alphabet, AlphabetFileError> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let alphabet = if is_toml {
        parse_toml_alphabet(&fs::read_to_string(path)?)?
    } else {
        read_text_alphabet(io::BufReader::new(fs::File::open(path)?))?
    };
    debug!(
        "Read {} alphabet entries from {}",
        alphabet.len(),
        path.display()
    );
    Ok(alphabet)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_text_alphabet() {
        let text = "# glycan monosaccharides\nHex 162.05282\n\nHexNAc\t203.07937 # N-acetyl\nFuc 146.05791\n";
        let alphabet = read_text_alphabet(io::Cursor::new(text)).unwrap();
        assert_eq!(alphabet.len(), 3);
        assert_eq!(alphabet.name(1), "HexNAc");
        assert_eq!(alphabet.mass(2), 146.05791);

        let err = read_text_alphabet(io::Cursor::new("Hex 162.05282\nHexNAc\n")).unwrap_err();
        assert!(matches!(err, AlphabetFileError::MalformedLine { line: 2, .. }));
        let err = read_text_alphabet(io::Cursor::new("Hex abc\n")).unwrap_err();
        assert!(matches!(err, AlphabetFileError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn test_toml_alphabet() {
        let text = r#"
[[residues]]
name = "G"
mass = 57.02146

[[residues]]
name = "Water"
formula = { H = 2, O = 1 }
"#;
        let alphabet = parse_toml_alphabet(text).unwrap();
        assert_eq!(alphabet.len(), 2);
        assert_eq!(alphabet.mass(0), 57.02146);
        assert!((alphabet.mass(1) - 18.010565).abs() < 1e-4);

        let text = r#"
[[residues]]
name = "G"
"#;
        assert!(matches!(
            parse_toml_alphabet(text),
            Err(AlphabetFileError::AmbiguousEntry(_))
        ));
        let text = r#"
[[residues]]
name = "X"
formula = { Qq = 1 }
"#;
        assert!(matches!(
            parse_toml_alphabet(text),
            Err(AlphabetFileError::DecompositionError(
                DecompositionError::UnknownElement(_)
            ))
        ));
    }
}
