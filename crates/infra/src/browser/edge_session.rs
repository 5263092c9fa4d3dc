//! Edge session-file scraping
//!
//! Last-resort strategy when Edge's history database cannot be read: scan
//! the newest binary session file for printable ASCII runs and pick the
//! last embedded http(s) URL. Results carry `Heuristic` confidence and are
//! never preferred over a structured lookup.

use std::path::{Path, PathBuf};

use tempo_domain::errors::{Result, TempoError};
use tempo_domain::types::{ChromiumBrowser, TabInfo};

use super::chromium;

/// Minimum printable-run length considered a candidate string.
const MIN_RUN_LEN: usize = 8;

pub fn resolve() -> Result<Option<TabInfo>> {
    let dir = chromium::default_profile_dir(ChromiumBrowser::Edge)?.join("Sessions");
    if !dir.is_dir() {
        return Err(TempoError::ProfileNotFound(format!(
            "no Edge session directory at {}",
            dir.display()
        )));
    }

    let Some(file) = newest_file(&dir)? else {
        return Ok(None);
    };
    let bytes = std::fs::read(file)?;
    Ok(extract_last_url(&bytes).map(TabInfo::heuristic))
}

fn newest_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(stamp, _)| modified > *stamp) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Scan binary data for the last printable run that looks like an http(s)
/// URL. Session files are append-heavy, so the last occurrence is the best
/// guess at the current tab.
pub fn extract_last_url(bytes: &[u8]) -> Option<String> {
    printable_runs(bytes)
        .into_iter()
        .filter(|run| run.starts_with("http://") || run.starts_with("https://"))
        .next_back()
}

fn printable_runs(bytes: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for &b in bytes {
        if (0x20..0x7f).contains(&b) {
            current.push(b as char);
        } else {
            if current.len() >= MIN_RUN_LEN {
                runs.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.len() >= MIN_RUN_LEN {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use tempo_domain::types::Confidence;

    use super::*;

    fn session_bytes(strings: &[&str]) -> Vec<u8> {
        let mut bytes = vec![0u8, 1, 2, 3];
        for s in strings {
            bytes.extend_from_slice(s.as_bytes());
            bytes.extend_from_slice(&[0, 0xff, 0]);
        }
        bytes
    }

    #[test]
    fn picks_the_last_embedded_url() {
        let bytes = session_bytes(&[
            "https://first.example/page",
            "some tab title here",
            "https://second.example/page",
        ]);
        assert_eq!(
            extract_last_url(&bytes).as_deref(),
            Some("https://second.example/page")
        );
    }

    #[test]
    fn short_runs_and_non_urls_are_ignored() {
        let bytes = session_bytes(&["http://", "ftp://files.example/x", "not a url at all"]);
        assert!(extract_last_url(&bytes).is_none());
    }

    #[test]
    fn empty_data_yields_none() {
        assert!(extract_last_url(&[]).is_none());
    }

    #[test]
    fn scraped_urls_are_heuristic() {
        let tab = TabInfo::heuristic("https://a.example");
        assert_eq!(tab.confidence, Confidence::Heuristic);
        assert!(tab.title.is_none());
    }
}
