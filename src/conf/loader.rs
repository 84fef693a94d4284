//! File loading and include expansion.
//!
//! `load_conf` reads a file, parses it, appends the result to the load's
//! ordered file list, and then recursively loads anything named by top-level
//! `include` directives. On POSIX the include value is a glob pattern; on
//! Windows it is expanded by enumerating the directory named by the pattern's
//! prefix. Either way a pattern that matches nothing is an error, while an
//! empty file contributes no entries and no error.

use crate::conf::diag::Diag;
use crate::conf::parser::{ConfigFile, parse};
use crate::conf::records::IncludeRecord;
use crate::error::RookdError;

/// Upper bound on files a single include pattern may expand to.
pub const INCLUDE_LIMIT: usize = 1024;

/// Every file parsed during one load, in include-encounter order, plus the
/// include patterns that produced them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadedConf {
    pub files: Vec<ConfigFile>,
    pub includes: Vec<IncludeRecord>,
}

/// Loads `filename` and everything it includes into `loaded`.
pub fn load_conf(
    loaded: &mut LoadedConf,
    filename: &str,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    diag.progress(format!("Loading config file {filename} .."));
    let data = match std::fs::read_to_string(filename) {
        Ok(data) => data,
        Err(source) => {
            diag.error(format!("Couldn't open \"{filename}\": {source}"));
            return Err(RookdError::Io {
                path: filename.to_string(),
                source,
            });
        }
    };
    if data.is_empty() {
        return Ok(());
    }
    let cf = parse(filename, &data, diag)?;

    // pull the include values out before the file moves into the list
    let includes: Vec<(String, u32)> = cf
        .roots
        .iter()
        .filter_map(|&id| {
            let entry = cf.entry(id);
            if entry.name == "include" {
                entry.value.clone().map(|v| (v, entry.line))
            } else {
                None
            }
        })
        .collect();

    loaded.files.push(cf);

    if !includes.is_empty() {
        diag.progress(format!("Searching through {filename} for include files.."));
    }
    for (pattern, line) in includes {
        expand_include(loaded, filename, line, &pattern, diag)?;
    }
    Ok(())
}

#[cfg(not(windows))]
fn expand_include(
    loaded: &mut LoadedConf,
    parent: &str,
    line: u32,
    pattern: &str,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    let matches = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(err) => {
            let msg = format!("{parent}:{line}: include {pattern}: {err}");
            diag.error(&msg);
            return Err(RookdError::Include(msg));
        }
    };
    let mut files: Vec<String> = Vec::new();
    for path in matches {
        match path {
            Ok(path) => files.push(path.to_string_lossy().into_owned()),
            Err(err) => diag.status(format!(
                "{parent}:{line}: include {pattern}: skipping unreadable path: {err}"
            )),
        }
        if files.len() > INCLUDE_LIMIT {
            let msg = format!(
                "{parent}:{line}: include {pattern}: more than {INCLUDE_LIMIT} files"
            );
            diag.error(&msg);
            return Err(RookdError::Include(msg));
        }
    }
    if files.is_empty() {
        let msg = format!("{parent}:{line}: include {pattern}: invalid file given");
        diag.error(&msg);
        return Err(RookdError::Include(msg));
    }
    loaded.includes.push(IncludeRecord {
        file: pattern.to_string(),
    });
    for file in files {
        load_conf(loaded, &file, diag)?;
    }
    Ok(())
}

#[cfg(windows)]
fn expand_include(
    loaded: &mut LoadedConf,
    parent: &str,
    line: u32,
    pattern: &str,
    diag: &mut Diag,
) -> Result<(), RookdError> {
    use crate::mask::match_mask;
    use std::path::Path;

    // split the pattern into a directory prefix and a filename mask
    let normalized = pattern.replace('\\', "/");
    let (dir, filemask) = match normalized.rfind('/') {
        Some(idx) => (&normalized[..idx], &normalized[idx + 1..]),
        None => (".", normalized.as_str()),
    };
    let entries = match std::fs::read_dir(Path::new(dir)) {
        Ok(entries) => entries,
        Err(err) => {
            let msg = format!("{parent}:{line}: include {pattern}: {err}");
            diag.error(&msg);
            return Err(RookdError::Include(msg));
        }
    };
    let mut files: Vec<String> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if match_mask(filemask, &name) && entry.path().is_file() {
            files.push(entry.path().to_string_lossy().into_owned());
        }
    }
    if files.is_empty() {
        let msg = format!("{parent}:{line}: include {pattern}: invalid file given");
        diag.error(&msg);
        return Err(RookdError::Include(msg));
    }
    // enumeration order is filesystem-dependent; sort for a stable load order
    files.sort();
    loaded.includes.push(IncludeRecord {
        file: pattern.to_string(),
    });
    for file in files {
        load_conf(loaded, &file, diag)?;
    }
    Ok(())
}
