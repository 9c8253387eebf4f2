use crate::classify::Classifier;
use crate::config::parse::load_config;
use crate::entity::{MonitoredEntity, RunMode};
use crate::logparse::LineFormat;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Offline classification of an existing log artifact.
///
/// Uses the configured line format when a config is available, defaults
/// otherwise. The freshness-since-invocation comparison is skipped (there is
/// no invocation); the absolute staleness window still applies.
pub fn check(
    log_path: &Path,
    entity_name: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (format, window) = match config_path {
        Some(path) => {
            let config = load_config(&path)?;
            let window = chrono::Duration::from_std(config.run.staleness_window)
                .unwrap_or_else(|_| chrono::Duration::hours(23));
            (
                LineFormat {
                    severity_column: config.parser.severity_column,
                    data_marker: config.parser.data_marker,
                },
                window,
            )
        }
        None => (LineFormat::default(), chrono::Duration::hours(23)),
    };

    let name = entity_name.unwrap_or_else(|| {
        log_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    });
    let entity = MonitoredEntity {
        name,
        config_ref: log_path.to_path_buf(),
        run_mode: RunMode::ScanOnly,
    };

    let classifier = Classifier::new(format, window);
    let outcome = classifier.classify(&entity, log_path, None);
    let report = crate::report::compose(&entity, &outcome, Utc::now(), log_path);

    println!("{}", report.subject);
    println!();
    println!("{}", report.body);
    Ok(())
}
