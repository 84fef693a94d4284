//! Auth descriptors.
//!
//! A `password` entry in the configuration either carries a plaintext secret
//! or a hash plus a child naming the hash type:
//!
//! ```text
//! password "s3cret";
//! password "$1$abcdef..." { md5; };
//! ```
//!
//! The descriptor only stores the credential material; comparing a presented
//! password against it is the job of an external verifier.

use serde::Serialize;

use crate::conf::diag::Diag;
use crate::conf::parser::{ConfigFile, EntryId};

/// How the stored credential material is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthKind {
    Plain,
    Crypt,
    Md5,
    Sha1,
    Ripemd160,
}

impl AuthKind {
    pub fn from_name(name: &str) -> Option<AuthKind> {
        match name {
            "plain" | "plaintext" => Some(AuthKind::Plain),
            "crypt" => Some(AuthKind::Crypt),
            "md5" => Some(AuthKind::Md5),
            "sha1" => Some(AuthKind::Sha1),
            "ripemd160" => Some(AuthKind::Ripemd160),
            _ => None,
        }
    }
}

/// Credential material attached to a record. The material itself never makes
/// it into serialized dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthDescriptor {
    pub kind: AuthKind,
    #[serde(skip_serializing)]
    pub data: String,
}

/// Builds an [AuthDescriptor] from a `password`-shaped entry. The caller has
/// already validated the entry, so failures here are internal errors.
pub fn convert(cf: &ConfigFile, id: EntryId) -> Result<AuthDescriptor, String> {
    let entry = cf.entry(id);
    let data = entry
        .value
        .clone()
        .ok_or_else(|| format!("{}::{} has no contents", cf.filename, entry.name))?;
    let kind = match cf.children(id).first() {
        None => AuthKind::Plain,
        Some(&child) => {
            let name = &cf.entry(child).name;
            AuthKind::from_name(name)
                .ok_or_else(|| format!("unknown auth type {name}"))?
        }
    };
    Ok(AuthDescriptor { kind, data })
}

/// Validator-side check of a `password`-shaped entry: contents required, at
/// most one child, and the child (if any) must name a known auth type.
pub fn validate(cf: &ConfigFile, id: EntryId, what: &str, diag: &mut Diag) -> usize {
    let entry = cf.entry(id);
    let mut errors = 0;
    if entry.value.is_none() {
        diag.error(format!(
            "{}:{}: {} without contents",
            cf.filename, entry.line, what
        ));
        errors += 1;
    }
    let children = cf.children(id);
    if children.len() > 1 {
        diag.error(format!(
            "{}:{}: {} has more than one auth type",
            cf.filename, entry.line, what
        ));
        errors += 1;
    }
    if let Some(&child) = children.first() {
        let cname = &cf.entry(child).name;
        if AuthKind::from_name(cname).is_none() {
            diag.error(format!(
                "{}:{}: {}: unknown auth type {}",
                cf.filename,
                cf.entry(child).line,
                what,
                cname
            ));
            errors += 1;
        }
    }
    errors
}
