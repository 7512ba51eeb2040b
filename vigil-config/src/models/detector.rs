use anyhow::{Context, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
};

use vigil_core::DetectorSettings;

use crate::sources::EnvConfig;

const DEFAULT_DETECTOR_FILES: &[&str] = &[
    "detector.toml",
    "detector.json",
    "config/detector.toml",
    "config/detector.json",
];

/// Source that produced the detector settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectorConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Load detector settings outside the main config file.
/// Evaluation order:
/// 1) `$DETECTOR_CONFIG_PATH` (TOML or JSON file),
/// 2) `$DETECTOR_CONFIG_JSON` (inline JSON),
/// 3) the first existing default file,
/// 4) defaults.
pub fn load_detector_settings(
    env: &EnvConfig,
) -> anyhow::Result<(DetectorSettings, DetectorConfigSource)> {
    if let Some(path) = env.detector_config_path.as_ref() {
        let settings = load_from_file(path)?;
        return Ok((settings, DetectorConfigSource::EnvPath(path.clone())));
    }

    if let Some(raw) = env.detector_config_json.as_deref()
        && !raw.trim().is_empty()
    {
        let parsed: DetectorSettings = serde_json::from_str(raw)
            .context("failed to parse DETECTOR_CONFIG_JSON")?;
        return Ok((parsed, DetectorConfigSource::EnvInline));
    }

    if let Some(path) = find_default_file() {
        let settings = load_from_file(&path)?;
        return Ok((settings, DetectorConfigSource::File(path)));
    }

    Ok((DetectorSettings::default(), DetectorConfigSource::Default))
}

pub fn load_from_file(path: &Path) -> anyhow::Result<DetectorSettings> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("failed to read detector config from {}", path.display())
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents).with_context(|| {
            format!("invalid detector config {}", path.display())
        }),
        Some("toml") | Some("tml") => toml::from_str(&contents).map_err(|err| {
            anyhow!("invalid detector config {}: {}", path.display(), err)
        }),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> anyhow::Result<DetectorSettings> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse detector config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

fn find_default_file() -> Option<PathBuf> {
    DEFAULT_DETECTOR_FILES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_path_wins_over_inline_json() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "auto_delete = true\n[rules]\nnumbers = false\n[heuristics]\nconsonant_run = 6"
        )
        .unwrap();

        let env = EnvConfig {
            detector_config_path: Some(file.path().to_path_buf()),
            detector_config_json: Some(r#"{"log_flags": true}"#.to_string()),
            ..EnvConfig::default()
        };
        let (settings, source) = load_detector_settings(&env).unwrap();
        assert_eq!(source, DetectorConfigSource::EnvPath(file.path().to_path_buf()));
        assert!(settings.auto_delete);
        assert!(!settings.log_flags);
        assert_eq!(settings.rules.get("numbers"), Some(&false));
        assert_eq!(settings.heuristics.consonant_run, 6);
        assert_eq!(settings.scan_batch_size, DetectorSettings::default().scan_batch_size);
    }

    #[test]
    fn inline_json_is_parsed() {
        let env = EnvConfig {
            detector_config_json: Some(
                r#"{"recheck_cleared": true, "rules": {"spam_words": false}}"#.to_string(),
            ),
            ..EnvConfig::default()
        };
        let (settings, source) = load_detector_settings(&env).unwrap();
        assert_eq!(source, DetectorConfigSource::EnvInline);
        assert!(settings.recheck_cleared);
        assert_eq!(settings.rules.get("spam_words"), Some(&false));
    }

    #[test]
    fn bad_inline_json_is_an_error() {
        let env = EnvConfig {
            detector_config_json: Some("{not json".to_string()),
            ..EnvConfig::default()
        };
        let err = load_detector_settings(&env).unwrap_err();
        assert!(err.to_string().contains("DETECTOR_CONFIG_JSON"));
    }

    #[test]
    fn extensionless_files_try_both_formats() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"scan_batch_size": 7}}"#).unwrap();
        let settings = load_from_file(file.path()).unwrap();
        assert_eq!(settings.scan_batch_size, 7);
    }
}
