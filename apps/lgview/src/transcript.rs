use anyhow::{anyhow, Result};
use lgview_model::{DiagnosticMethod, Location};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Export of one finished run. Written on request, never read back.
#[derive(Debug, Serialize)]
pub struct Transcript {
    pub version: String,
    pub location: Location,
    pub method: DiagnosticMethod,
    pub target: String,
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub outcome: String,
    pub output: String,
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json)
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .map_err(|err| anyhow!("failed to create directory {:?}: {}", parent, err))?;
    }

    let tmp_path = temp_path(path);
    let mut file = fs::File::create(&tmp_path)
        .map_err(|err| anyhow!("failed to create temp file {:?}: {}", tmp_path, err))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .map_err(|err| anyhow!("failed to write temp file {:?}: {}", tmp_path, err))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(anyhow!("failed to write transcript {:?}: {}", path, err));
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("transcript.json");
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    path.with_file_name(format!(".{}.part-{}-{}", file_name, std::process::id(), stamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        Transcript {
            version: "0.1.0".to_string(),
            location: Location {
                id: "ams".to_string(),
                name: "Amsterdam".to_string(),
                url: "http://ams".to_string(),
            },
            method: DiagnosticMethod::Mtr,
            target: "1.1.1.1".to_string(),
            started_at_utc: "2026-10-18T10:00:00Z".to_string(),
            finished_at_utc: "2026-10-18T10:00:12Z".to_string(),
            outcome: "cancelled".to_string(),
            output: "HOST: ams\n\n--- Cancelled by user ---".to_string(),
        }
    }

    #[test]
    fn transcript_is_written_and_temp_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("mtr.json");

        write_json(&path, &sample()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["method"], "mtr");
        assert_eq!(written["location"]["id"], "ams");
        assert_eq!(written["outcome"], "cancelled");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".part-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn existing_transcript_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, "stale").unwrap();

        write_json(&path, &sample()).unwrap();

        assert!(fs::read_to_string(&path).unwrap().contains("\"target\": \"1.1.1.1\""));
    }
}
