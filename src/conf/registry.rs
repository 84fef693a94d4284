//! The directive registry.
//!
//! Maps a top-level directive name to its committer and validator. The table
//! MUST stay alphabetized: lookup is a binary search. A directive may have a
//! validator but no committer (`include` — the loader handles it); a name
//! missing from the table entirely is a validation error.

use crate::conf::commit;
use crate::conf::diag::Diag;
use crate::conf::parser::{ConfigFile, EntryId};
use crate::conf::store::ConfigStore;
use crate::conf::validate;
use crate::error::RookdError;

pub type TestFn = fn(&ConfigFile, EntryId, &mut Diag);
pub type ApplyFn = fn(&mut ConfigStore, &ConfigFile, EntryId, &mut Diag) -> Result<(), RookdError>;

pub struct ConfigCommand {
    pub name: &'static str,
    pub apply: Option<ApplyFn>,
    pub test: TestFn,
}

pub static CONFIG_COMMANDS: &[ConfigCommand] = &[
    ConfigCommand {
        name: "admin",
        apply: Some(commit::conf_admin),
        test: validate::test_admin,
    },
    ConfigCommand {
        name: "alias",
        apply: Some(commit::conf_alias),
        test: validate::test_alias,
    },
    ConfigCommand {
        name: "allow",
        apply: Some(commit::conf_allow),
        test: validate::test_allow,
    },
    ConfigCommand {
        name: "ban",
        apply: Some(commit::conf_ban),
        test: validate::test_ban,
    },
    ConfigCommand {
        name: "class",
        apply: Some(commit::conf_class),
        test: validate::test_class,
    },
    ConfigCommand {
        name: "deny",
        apply: Some(commit::conf_deny),
        test: validate::test_deny,
    },
    ConfigCommand {
        name: "drpass",
        apply: Some(commit::conf_drpass),
        test: validate::test_drpass,
    },
    ConfigCommand {
        name: "except",
        apply: Some(commit::conf_except),
        test: validate::test_except,
    },
    ConfigCommand {
        name: "help",
        apply: Some(commit::conf_help),
        test: validate::test_help,
    },
    ConfigCommand {
        name: "include",
        apply: None,
        test: validate::test_include,
    },
    ConfigCommand {
        name: "link",
        apply: Some(commit::conf_link),
        test: validate::test_link,
    },
    ConfigCommand {
        name: "listen",
        apply: Some(commit::conf_listen),
        test: validate::test_listen,
    },
    ConfigCommand {
        name: "log",
        apply: Some(commit::conf_log),
        test: validate::test_log,
    },
    ConfigCommand {
        name: "me",
        apply: Some(commit::conf_me),
        test: validate::test_me,
    },
    ConfigCommand {
        name: "oper",
        apply: Some(commit::conf_oper),
        test: validate::test_oper,
    },
    ConfigCommand {
        name: "tld",
        apply: Some(commit::conf_tld),
        test: validate::test_tld,
    },
    ConfigCommand {
        name: "ulines",
        apply: Some(commit::conf_ulines),
        test: validate::test_ulines,
    },
    ConfigCommand {
        name: "vhost",
        apply: Some(commit::conf_vhost),
        test: validate::test_vhost,
    },
];

/// Binary search over the alphabetized table.
pub fn find_command(name: &str) -> Option<&'static ConfigCommand> {
    CONFIG_COMMANDS
        .binary_search_by(|cmd| cmd.name.cmp(name))
        .ok()
        .map(|idx| &CONFIG_COMMANDS[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_alphabetized() {
        for pair in CONFIG_COMMANDS.windows(2) {
            assert!(
                pair[0].name < pair[1].name,
                "registry out of order at {}",
                pair[1].name
            );
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(find_command("me").map(|c| c.name), Some("me"));
        assert_eq!(find_command("vhost").map(|c| c.name), Some("vhost"));
        assert_eq!(find_command("admin").map(|c| c.name), Some("admin"));
        assert!(find_command("bogus").is_none());
        assert!(find_command("include").map(|c| c.apply.is_none()).unwrap());
    }
}
