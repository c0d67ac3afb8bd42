//! Commander journal ingestion
//!
//! Journals are JSON-lines files named `Journal*.log`. Only the handful of
//! event types the reports need are modelled; everything else deserializes
//! to `Other` and is dropped. Events are merged across files and sorted by
//! timestamp.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One sale line inside a SellOrganicData event
#[derive(Debug, Clone, Deserialize)]
pub struct BioDataEntry {
    #[serde(rename = "Species")]
    pub species: Option<String>,
    #[serde(rename = "Genus_Localised")]
    pub genus_localised: Option<String>,
    #[serde(rename = "Species_Localised")]
    pub species_localised: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum JournalEvent {
    Touchdown {
        #[serde(rename = "StarSystem")]
        star_system: Option<String>,
    },
    ScanOrganic {
        #[serde(rename = "ScanType")]
        scan_type: String,
        #[serde(rename = "Species")]
        species: Option<String>,
        #[serde(rename = "SystemAddress")]
        system_address: Option<i64>,
        #[serde(rename = "Body")]
        body: Option<i32>,
    },
    SellOrganicData {
        #[serde(rename = "BioData")]
        bio_data: Option<Vec<BioDataEntry>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: JournalEvent,
}

/// Default journal location under the user's home directory
pub fn default_journal_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Saved Games")
            .join("Frontier Developments")
            .join("Elite Dangerous")
    })
}

/// Read every `Journal*.log` under `dir` and return the relevant events,
/// sorted by timestamp across all files. Unparsable lines are skipped with
/// a warning; an unreadable directory is an error.
pub fn read_entries(dir: &Path) -> Result<Vec<JournalEntry>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("Journal") && n.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), "no journal files found");
    }

    let mut entries = Vec::new();
    for path in &files {
        let count_before = entries.len();
        read_file(path, &mut entries)
            .with_context(|| format!("reading journal {}", path.display()))?;
        debug!(
            file = %path.display(),
            events = entries.len() - count_before,
            "journal file read"
        );
    }

    entries.sort_by_key(|e| e.timestamp);
    Ok(entries)
}

fn read_file(path: &Path, entries: &mut Vec<JournalEntry>) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(JournalEntry {
                event: JournalEvent::Other,
                ..
            }) => {}
            Ok(entry) => entries.push(entry),
            Err(error) => {
                warn!(
                    file = %path.display(),
                    line = number + 1,
                    %error,
                    "skipping unparsable journal line"
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_journal(dir: &Path, name: &str, lines: &[&str]) {
        let mut file = File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn test_reads_and_sorts_events_across_files() {
        let dir = tempfile::tempdir().unwrap();

        write_journal(
            dir.path(),
            "Journal.2024-02-01T000000.01.log",
            &[
                r#"{"timestamp":"2024-02-01T10:00:00Z","event":"Touchdown","StarSystem":"Beta"}"#,
            ],
        );
        write_journal(
            dir.path(),
            "Journal.2024-01-01T000000.01.log",
            &[
                r#"{"timestamp":"2024-01-01T10:00:00Z","event":"Touchdown","StarSystem":"Alpha"}"#,
                r#"{"timestamp":"2024-01-01T10:05:00Z","event":"ScanOrganic","ScanType":"Analyse","Species":"S1","SystemAddress":42,"Body":7}"#,
                r#"{"timestamp":"2024-01-01T10:06:00Z","event":"Music","MusicTrack":"Exploration"}"#,
            ],
        );
        // Not a journal file
        write_journal(dir.path(), "Status.json", &[r#"{"Flags":0}"#]);

        let entries = read_entries(dir.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            &entries[0].event,
            JournalEvent::Touchdown { star_system: Some(s) } if s == "Alpha"
        ));
        assert!(matches!(
            &entries[1].event,
            JournalEvent::ScanOrganic { scan_type, body: Some(7), .. } if scan_type == "Analyse"
        ));
        assert!(matches!(
            &entries[2].event,
            JournalEvent::Touchdown { star_system: Some(s) } if s == "Beta"
        ));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_journal(
            dir.path(),
            "Journal.2024-01-01T000000.01.log",
            &[
                "not json at all",
                r#"{"timestamp":"2024-01-01T10:00:00Z","event":"Touchdown","StarSystem":"Alpha"}"#,
            ],
        );

        let entries = read_entries(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_sell_organic_data_payload() {
        let dir = tempfile::tempdir().unwrap();
        write_journal(
            dir.path(),
            "Journal.2024-01-01T000000.01.log",
            &[
                r#"{"timestamp":"2024-01-01T12:00:00Z","event":"SellOrganicData","BioData":[{"Species":"$Codex_Ent_Stratum_02_F_Name;","Species_Localised":"Stratum Tectonicas","Genus_Localised":"Stratum","Value":19010800}]}"#,
            ],
        );

        let entries = read_entries(dir.path()).unwrap();
        let JournalEvent::SellOrganicData { bio_data: Some(data) } = &entries[0].event else {
            panic!("expected SellOrganicData");
        };
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].species_localised.as_deref(), Some("Stratum Tectonicas"));
        assert_eq!(data[0].value, Some(19_010_800.0));
    }
}
