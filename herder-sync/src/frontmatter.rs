//! Minimal front-matter handling for rule, workflow and skill documents.
//!
//! Only flat `key: value` lines between `---` delimiters are understood; no
//! YAML parser is involved, so unquoted globs such as `applyTo: **/*.sh`
//! survive intact. A document whose opening `---` is never closed has no
//! front matter and its bytes are returned untouched.

/// Annotation lines meaningful only to the mirror target's consumer.
pub const ANNOTATION_MARKERS: &[&str] = &["// turbo", "// turbo-all"];

/// A parsed source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Stem without extension, e.g. `00-general`.
    pub name: String,
    /// Glob scope from front matter; empty means repo-wide.
    pub apply_to: String,
    /// Content after the front matter.
    pub body: Vec<u8>,
}

impl SourceFile {
    pub fn parse(name: impl Into<String>, data: &[u8]) -> Self {
        let (apply_to, body) = parse_frontmatter(data);
        Self {
            name: name.into(),
            apply_to,
            body,
        }
    }
}

struct Split {
    keys: Vec<String>,
    body: Vec<u8>,
}

/// Split a document into front-matter lines and body, or `None` when there
/// is no closed front-matter block.
fn split(data: &[u8]) -> Option<Split> {
    let mut lines = scan_lines(data);
    let first = lines.next()?;
    if trim_bytes(first) != b"---" {
        return None;
    }

    let mut keys = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if trim_bytes(line) == b"---" {
            closed = true;
            break;
        }
        keys.push(String::from_utf8_lossy(line).into_owned());
    }
    if !closed {
        return None;
    }

    let mut body = Vec::with_capacity(data.len());
    for line in lines {
        body.extend_from_slice(line);
        body.push(b'\n');
    }
    Some(Split { keys, body })
}

fn lookup(keys: &[String], key: &str) -> Option<String> {
    let prefix = format!("{key}:");
    keys.iter()
        .map(|line| line.trim())
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\'').to_owned())
        .last()
}

/// Extract `applyTo` and the body after the front matter.
///
/// Without a closed front-matter block the whole input is the body and the
/// scope is empty.
pub fn parse_frontmatter(data: &[u8]) -> (String, Vec<u8>) {
    match split(data) {
        Some(split) => (lookup(&split.keys, "applyTo").unwrap_or_default(), split.body),
        None => (String::new(), data.to_vec()),
    }
}

/// The `description` front-matter value, or `""` when absent.
pub fn extract_description(data: &[u8]) -> String {
    split(data)
        .and_then(|split| lookup(&split.keys, "description"))
        .unwrap_or_default()
}

/// Drop every line whose trimmed text is one of [`ANNOTATION_MARKERS`].
pub fn strip_annotations(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for line in body.split_inclusive(|b| *b == b'\n') {
        let text = trim_bytes(line);
        if ANNOTATION_MARKERS.iter().any(|m| text == m.as_bytes()) {
            continue;
        }
        out.extend_from_slice(line);
    }
    out
}

/// Join trimmed parts under `header`, separated by a blank line.
pub fn concat_with_header(header: &str, parts: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(header.as_bytes());
    buf.push(b'\n');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.push(b'\n');
        }
        buf.extend_from_slice(trim_bytes(part));
        buf.push(b'\n');
    }
    buf
}

/// Lines split on `\n` with a trailing `\r` removed; a final newline does
/// not produce an empty trailing line.
fn scan_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let data = data.strip_suffix(b"\n").unwrap_or(data);
    let empty = data.is_empty();
    data.split(|b| *b == b'\n')
        .filter(move |_| !empty)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// ASCII-whitespace trim for byte slices.
pub(crate) fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
