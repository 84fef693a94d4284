//! Opaque loader for MOTD and rules files.
//!
//! `tld` blocks name a MOTD and a rules file; both are read once at commit
//! time and cached on the record, stamped with the time they were read so the
//! daemon can answer "MOTD last changed" queries. Rehash re-reads them.

use chrono::{DateTime, Utc};

/// Reads a text file into lines plus the timestamp of the read.
pub fn read_text_file(path: &str) -> std::io::Result<(Vec<String>, DateTime<Utc>)> {
    let data = std::fs::read_to_string(path)?;
    let lines = data.lines().map(|l| l.trim_end().to_string()).collect();
    Ok((lines, Utc::now()))
}
