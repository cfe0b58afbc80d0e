//! Jar manifest parsing and writing
//!
//! Handles the `Name: Value` format with 72-byte lines, continuation lines
//! starting with a single space, and blank lines between sections.

/// Location of the manifest inside an archive
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST_VERSION: &str = "Manifest-Version";
const MAX_LINE_BYTES: usize = 72;

type Section = Vec<(String, String)>;

/// Parsed manifest: main attributes plus per-entry sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    main: Section,
    entries: Vec<Section>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    /// Empty manifest with a version attribute
    pub fn new() -> Self {
        Self {
            main: vec![(MANIFEST_VERSION.to_string(), "1.0".to_string())],
            entries: Vec::new(),
        }
    }

    /// Parse manifest bytes; malformed lines are skipped
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut sections: Vec<Section> = vec![Vec::new()];
        let mut pending: Option<String> = None;

        let flush = |pending: &mut Option<String>, sections: &mut Vec<Section>| {
            if let Some(line) = pending.take() {
                if let Some((name, value)) = split_attribute(&line) {
                    if let Some(section) = sections.last_mut() {
                        section.push((name, value));
                    }
                }
            }
        };

        for line in text.split("\r\n").flat_map(|l| l.split(['\n', '\r'])) {
            if let Some(continued) = line.strip_prefix(' ') {
                if let Some(current) = pending.as_mut() {
                    current.push_str(continued);
                }
                continue;
            }
            flush(&mut pending, &mut sections);
            if line.is_empty() {
                if sections.last().is_some_and(|s| !s.is_empty()) {
                    sections.push(Vec::new());
                }
            } else {
                pending = Some(line.to_string());
            }
        }
        flush(&mut pending, &mut sections);

        let mut sections = sections.into_iter().filter(|s| !s.is_empty());
        let main = sections.next().unwrap_or_default();
        Self {
            main,
            entries: sections.collect(),
        }
    }

    /// Look up a main attribute (names are case-insensitive)
    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a main attribute, replacing an existing value in place
    pub fn set_main_attribute(&mut self, name: &str, value: &str) {
        match self.main.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.main.push((name.to_string(), value.to_string())),
        }
    }

    /// Number of per-entry sections
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Remove per-entry digest attributes left by a previous signature
    ///
    /// Sections reduced to their `Name` are dropped. Returns whether
    /// anything changed.
    pub fn strip_entry_digests(&mut self) -> bool {
        let before = self.clone();
        for section in &mut self.entries {
            section.retain(|(name, _)| !is_digest_attribute(name));
        }
        self.entries
            .retain(|section| section.iter().any(|(name, _)| !name.eq_ignore_ascii_case("Name")));
        *self != before
    }

    /// Serialize with CRLF line endings and 72-byte line wrapping
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        // Manifest-Version must come first
        let version = self
            .main
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(MANIFEST_VERSION));
        if let Some((name, value)) = version {
            write_attribute(&mut out, name, value);
        }
        for (name, value) in &self.main {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_attribute(&mut out, name, value);
            }
        }
        out.extend_from_slice(b"\r\n");

        for section in &self.entries {
            for (name, value) in section {
                write_attribute(&mut out, name, value);
            }
            out.extend_from_slice(b"\r\n");
        }
        out
    }
}

fn split_attribute(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.strip_prefix(' ').unwrap_or(value).to_string()))
}

fn is_digest_attribute(name: &str) -> bool {
    name.len() > "-Digest".len() && name.to_ascii_lowercase().ends_with("-digest")
}

fn write_attribute(out: &mut Vec<u8>, name: &str, value: &str) {
    let line = format!("{}: {}", name, value);
    let mut limit = MAX_LINE_BYTES;
    let mut start = 0;
    let mut first = true;

    while start < line.len() {
        let mut end = (start + limit).min(line.len());
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        if !first {
            out.push(b' ');
        }
        out.extend_from_slice(line[start..end].as_bytes());
        out.extend_from_slice(b"\r\n");
        start = end;
        first = false;
        // Continuation lines lose one byte to the leading space
        limit = MAX_LINE_BYTES - 1;
    }
}
