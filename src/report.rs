use std::{fs, io, path::Path};

use crate::driver::RunSummary;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    IO(#[from] io::Error),
    #[error(transparent)]
    Decode(#[from] toml::de::Error),
    #[error(transparent)]
    Encode(#[from] toml::ser::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub fn save_report(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let content = toml::to_string(summary)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content.as_bytes())?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<RunSummary, ReportError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn to_json(summary: &RunSummary) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(summary)?)
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::{timing::RunResult, workload::SizeMode};

    fn summary() -> RunSummary {
        RunSummary {
            mode: SizeMode::Large,
            seed: 12,
            operation_count: 10,
            allocations: 7,
            frees: 3,
            peak_live: 5,
            result: RunResult {
                candidate_ns: 2_000,
                baseline_ns: 1_500,
            },
        }
    }

    #[test]
    fn saved_report_loads_back() {
        let path = env::temp_dir()
            .join(format!("alloc-diff-{}", std::process::id()))
            .join("report.toml");
        save_report(&summary(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("mode = \"large\""));
        assert_eq!(load_report(&path).unwrap(), summary());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn missing_report() {
        let err = load_report(Path::new("/nonexistent/alloc-diff/report.toml")).unwrap_err();
        assert!(matches!(err, ReportError::IO(e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn json_fields() {
        let json = to_json(&summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result"]["candidate_ns"], 2_000);
        assert_eq!(value["mode"], "large");
    }
}
