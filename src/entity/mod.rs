use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("failed to read entity list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate entity name '{0}' in entity list")]
    DuplicateName(String),
}

/// What the external client transfers for this entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Data,
    Metadata,
    ScanOnly,
}

impl RunMode {
    /// The mode flag value passed to the external client.
    pub fn flag(&self) -> &'static str {
        match self {
            RunMode::Data => "data",
            RunMode::Metadata => "metadata",
            RunMode::ScanOnly => "scan-only",
        }
    }
}

impl FromStr for RunMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(RunMode::Data),
            "metadata" => Ok(RunMode::Metadata),
            "scan-only" => Ok(RunMode::ScanOnly),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// One monitored data-transfer job. Identity is `name`; immutable for the
/// duration of a batch.
#[derive(Debug, Clone)]
pub struct MonitoredEntity {
    pub name: String,
    pub config_ref: PathBuf,
    pub run_mode: RunMode,
}

/// Load the ordered entity list from a file.
///
/// One record per line: `<config_ref> <name> <run_mode>`, whitespace
/// delimited. Blank lines and `#` comments are ignored. Malformed records
/// are skipped with a warning; a duplicate name is a hard error because
/// entity name keys the working log and archive paths.
pub fn load_entities(path: &Path) -> Result<Vec<MonitoredEntity>, EntityError> {
    let content = std::fs::read_to_string(path).map_err(|source| EntityError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entities = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let record = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(config_ref), Some(name), Some(mode)) => {
                match RunMode::from_str(mode) {
                    Ok(run_mode) => Some(MonitoredEntity {
                        name: name.to_string(),
                        config_ref: PathBuf::from(config_ref),
                        run_mode,
                    }),
                    Err(()) => {
                        warn!(
                            line = lineno + 1,
                            mode = %mode,
                            "skipping entity record with unrecognized run mode"
                        );
                        None
                    }
                }
            }
            _ => {
                warn!(line = lineno + 1, record = %line, "skipping malformed entity record");
                None
            }
        };

        if let Some(entity) = record {
            if !seen.insert(entity.name.clone()) {
                return Err(EntityError::DuplicateName(entity.name));
            }
            entities.push(entity);
        }
    }

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_list(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_ordered_records() {
        let file = write_list(
            "# comment\n\
             /etc/upmon/a.cfg study-a data\n\
             /etc/upmon/b.cfg study-b metadata\n\
             \n\
             /etc/upmon/c.cfg study-c scan-only\n",
        );
        let entities = load_entities(file.path()).unwrap();
        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0].name, "study-a");
        assert_eq!(entities[1].run_mode, RunMode::Metadata);
        assert_eq!(entities[2].run_mode, RunMode::ScanOnly);
    }

    #[test]
    fn test_skips_malformed_records() {
        let file = write_list(
            "/etc/upmon/a.cfg study-a data\n\
             only-two tokens\n\
             /etc/upmon/b.cfg study-b sideways\n\
             /etc/upmon/c.cfg study-c data\n",
        );
        let entities = load_entities(file.path()).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "study-a");
        assert_eq!(entities[1].name, "study-c");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let file = write_list(
            "/a.cfg study-a data\n\
             /b.cfg study-a data\n",
        );
        assert!(matches!(
            load_entities(file.path()),
            Err(EntityError::DuplicateName(_))
        ));
    }
}
