//! The configuration lexer/parser.
//!
//! The grammar is the classic brace/semicolon block form:
//!
//! ```text
//! entry    := NAME [ VALUE ] ( ';' | '{' entry* '}' ';' )
//! ```
//!
//! Values are double-quoted strings (`\"` escapes a literal quote) or bare
//! words terminated by whitespace, `=`, `;` or a newline. `=` between name
//! and value is accepted as sugar. Comments come in three forms: `# ...`,
//! `// ...` and nesting `/* ... */`. Carriage returns are treated as spaces.
//!
//! Parsing produces an arena-backed tree: a [ConfigFile] owns all its
//! [ParseEntry] nodes and hands out [EntryId] indices, so entries can carry
//! parent back-references without lifetime cycles. The tree only lives across
//! a single validate-and-commit cycle.

use crate::conf::diag::Diag;
use crate::error::RookdError;

/// Index of a [ParseEntry] within its [ConfigFile] arena.
pub type EntryId = usize;

/// One parsed entry: a name, an optional scalar value, and an optional block
/// of child entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntry {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<EntryId>,
    pub parent: Option<EntryId>,
    /// Line the name token appeared on.
    pub line: u32,
    /// Line the block opened on, when this entry has one.
    pub block_line: Option<u32>,
    /// Byte offsets of the entry within the source buffer.
    pub span: (usize, usize),
}

/// A parsed file: the arena of entries plus the list of top-level ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub filename: String,
    nodes: Vec<ParseEntry>,
    pub roots: Vec<EntryId>,
}

impl ConfigFile {
    pub fn entry(&self, id: EntryId) -> &ParseEntry {
        &self.nodes[id]
    }

    pub fn children(&self, id: EntryId) -> &[EntryId] {
        &self.nodes[id].children
    }

    /// First child of `parent` with the given name, in entry order.
    pub fn find_child(&self, parent: EntryId, name: &str) -> Option<EntryId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    /// Value of the first child of `parent` with the given name.
    pub fn child_value(&self, parent: EntryId, name: &str) -> Option<&str> {
        self.find_child(parent, name)
            .and_then(|c| self.nodes[c].value.as_deref())
    }

    /// `file:line` of an entry, for diagnostics.
    pub fn loc(&self, id: EntryId) -> String {
        format!("{}:{}", self.filename, self.nodes[id].line)
    }
}

/// Parses a complete buffer into a [ConfigFile]. Fatal syntax errors are
/// reported through `diag` and returned; non-fatal oddities only produce
/// status lines.
pub fn parse(filename: &str, confdata: &str, diag: &mut Diag) -> Result<ConfigFile, RookdError> {
    // Carriage returns behave as spaces everywhere, including inside quotes.
    let data = confdata.replace('\r', " ");
    let b = data.as_bytes();

    let mut cf = ConfigFile {
        filename: filename.to_string(),
        nodes: Vec::new(),
        roots: Vec::new(),
    };

    let mut line: u32 = 1;
    let mut i: usize = 0;
    // entry that has a name but hasn't been closed by ';' yet
    let mut cur: Option<EntryId> = None;
    // stack of open sections
    let mut sections: Vec<EntryId> = Vec::new();

    while i < b.len() {
        match b[i] {
            b';' => {
                match cur.take() {
                    None => {
                        diag.status(format!("{filename}:{line} Ignoring extra semicolon"));
                    }
                    Some(id) => {
                        cf.nodes[id].span.1 = i;
                        attach(&mut cf, &sections, id);
                    }
                }
                i += 1;
            }
            b'{' => {
                match cur {
                    None => {
                        diag.status(format!("{filename}:{line}: No name for section start"));
                    }
                    Some(id) if cf.nodes[id].block_line.is_some() => {
                        diag.status(format!("{filename}:{line}: Ignoring extra section start"));
                    }
                    Some(id) => {
                        cf.nodes[id].block_line = Some(line);
                        sections.push(id);
                        cur = None;
                    }
                }
                i += 1;
            }
            b'}' => {
                if cur.is_some() {
                    let fatal = format!(
                        "{filename}:{line}: Missing semicolon before close brace"
                    );
                    diag.error(&fatal);
                    return Err(RookdError::Parse(fatal));
                }
                match sections.pop() {
                    None => {
                        diag.status(format!("{filename}:{line}: Ignoring extra close brace"));
                    }
                    Some(id) => {
                        cf.nodes[id].span.1 = i;
                        cur = Some(id);
                    }
                }
                i += 1;
            }
            b'#' => {
                while i < b.len() && b[i] != b'\n' {
                    i += 1;
                }
                // leave the newline for the main loop so it counts
            }
            b'/' => {
                if i + 1 < b.len() && b[i + 1] == b'/' {
                    i += 2;
                    while i < b.len() && b[i] != b'\n' {
                        i += 1;
                    }
                } else if i + 1 < b.len() && b[i + 1] == b'*' {
                    let comment_start = line;
                    let mut level = 1;
                    i += 2;
                    while i < b.len() {
                        if b[i] == b'/' && i + 1 < b.len() && b[i + 1] == b'*' {
                            level += 1;
                            i += 2;
                        } else if b[i] == b'*' && i + 1 < b.len() && b[i + 1] == b'/' {
                            level -= 1;
                            i += 2;
                            if level == 0 {
                                break;
                            }
                        } else {
                            if b[i] == b'\n' {
                                line += 1;
                            }
                            i += 1;
                        }
                    }
                    if level > 0 {
                        let fatal = format!(
                            "{filename}:{comment_start} Comment on this line does not end"
                        );
                        diag.error(&fatal);
                        return Err(RookdError::Parse(fatal));
                    }
                } else {
                    // a lone slash is silently ignored
                    i += 1;
                }
            }
            b'"' => {
                let start = i + 1;
                let mut value = String::new();
                let mut seg_start = start;
                let mut j = start;
                let mut terminated = false;
                while j < b.len() {
                    if b[j] == b'\\' && j + 1 < b.len() && b[j + 1] == b'"' {
                        value.push_str(&data[seg_start..j]);
                        value.push('"');
                        j += 2;
                        seg_start = j;
                    } else if b[j] == b'"' || b[j] == b'\n' {
                        terminated = b[j] == b'"';
                        break;
                    } else {
                        j += 1;
                    }
                }
                if !terminated {
                    let fatal = format!("{filename}:{line}: Unterminated quote found");
                    diag.error(&fatal);
                    return Err(RookdError::Parse(fatal));
                }
                value.push_str(&data[seg_start..j]);
                match cur {
                    Some(id) => {
                        if cf.nodes[id].value.is_some() {
                            diag.status(format!("{filename}:{line}: Ignoring extra data"));
                        } else {
                            cf.nodes[id].value = Some(value);
                        }
                    }
                    None => {
                        cur = Some(new_entry(&mut cf, &sections, value, line, start));
                    }
                }
                i = j + 1;
            }
            b'\n' => {
                line += 1;
                i += 1;
            }
            b' ' | b'\t' | b'=' => {
                i += 1;
            }
            _ => {
                if b[i] == b'*' && i + 1 < b.len() && b[i + 1] == b'/' {
                    diag.status(format!("{filename}:{line} Ignoring extra end comment"));
                    i += 2;
                    continue;
                }
                let start = i;
                while i < b.len()
                    && !matches!(b[i], b' ' | b'=' | b'\t' | b'\n' | b';')
                {
                    i += 1;
                }
                if i >= b.len() {
                    let fatal = if let Some(id) = cur {
                        format!(
                            "{filename}: Unexpected EOF for variable starting at {}",
                            cf.nodes[id].line
                        )
                    } else if let Some(&sid) = sections.last() {
                        format!(
                            "{filename}: Unexpected EOF for section starting at {}",
                            cf.nodes[sid].block_line.unwrap_or(cf.nodes[sid].line)
                        )
                    } else {
                        format!("{filename}: Unexpected EOF.")
                    };
                    diag.error(&fatal);
                    return Err(RookdError::Parse(fatal));
                }
                let word = data[start..i].to_string();
                match cur {
                    Some(id) => {
                        if cf.nodes[id].value.is_some() {
                            diag.status(format!("{filename}:{line}: Ignoring extra data"));
                        } else {
                            cf.nodes[id].value = Some(word);
                        }
                    }
                    None => {
                        cur = Some(new_entry(&mut cf, &sections, word, line, start));
                    }
                }
                // let ';' and '\n' be handled by their own arms; other
                // terminators are consumed here
                if !matches!(b[i], b';' | b'\n') {
                    i += 1;
                }
            }
        }
    }

    if let Some(id) = cur {
        let fatal = format!(
            "{filename}: Unexpected EOF for variable starting on line {}",
            cf.nodes[id].line
        );
        diag.error(&fatal);
        return Err(RookdError::Parse(fatal));
    }
    if let Some(&sid) = sections.last() {
        let fatal = format!(
            "{filename}: Unexpected EOF for section starting on line {}",
            cf.nodes[sid].block_line.unwrap_or(cf.nodes[sid].line)
        );
        diag.error(&fatal);
        return Err(RookdError::Parse(fatal));
    }
    Ok(cf)
}

fn new_entry(
    cf: &mut ConfigFile,
    sections: &[EntryId],
    name: String,
    line: u32,
    pos: usize,
) -> EntryId {
    let id = cf.nodes.len();
    cf.nodes.push(ParseEntry {
        name,
        value: None,
        children: Vec::new(),
        parent: sections.last().copied(),
        line,
        block_line: None,
        span: (pos, pos),
    });
    id
}

fn attach(cf: &mut ConfigFile, sections: &[EntryId], id: EntryId) {
    match sections.last() {
        Some(&sid) => cf.nodes[sid].children.push(id),
        None => cf.roots.push(id),
    }
}
