// Copyright 2025 Oxide Computer Company

//! Extraction of structured documentation from handler doc comments.
//!
//! A doc comment is split into a one-sentence description, the remaining
//! narrative ("purpose"), and the `@param` / `@return` tags:
//!
//! ```text
//! Get members living on a planet.
//!
//! Members are grouped by their planet of residence.
//!
//! @param string $planet The planet name
//! @return array The members found
//! ```
//!
//! The description ends at the first blank line or at the first line ending
//! with a period.  A `@param` type may be omitted when the name carries its
//! `$` sigil (`@param $planet The planet name`).

use indexmap::IndexMap;

/// Type name used when neither documentation nor a declaration provides one.
pub const UNKNOWN_TYPE: &str = "unknown";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DocTag {
    pub type_name: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExtractedDoc {
    pub description: String,
    pub purpose: String,
    pub params: IndexMap<String, DocTag>,
    pub returns: Option<DocTag>,
}

enum Section {
    Description,
    Purpose,
    Param(String),
    Return,
    Ignored,
}

impl ExtractedDoc {
    pub fn parse(text: &str) -> ExtractedDoc {
        let mut doc = ExtractedDoc::default();
        let mut purpose: Vec<&str> = Vec::new();
        let mut section = Section::Description;

        for raw in text.lines() {
            let line = normalize_line(raw);

            if let Some(tag) = line.strip_prefix('@') {
                section = doc.add_tag(tag);
                continue;
            }

            match &section {
                Section::Description => {
                    if line.is_empty() {
                        if !doc.description.is_empty() {
                            section = Section::Purpose;
                        }
                        continue;
                    }
                    append_text(&mut doc.description, line);
                    if line.ends_with('.') {
                        section = Section::Purpose;
                    }
                }
                Section::Purpose => purpose.push(line),
                Section::Param(name) => {
                    if let Some(tag) = doc.params.get_mut(name) {
                        append_text(&mut tag.description, line);
                    }
                }
                Section::Return => {
                    if let Some(tag) = doc.returns.as_mut() {
                        append_text(&mut tag.description, line);
                    }
                }
                Section::Ignored => (),
            }
        }

        doc.purpose = join_paragraphs(&purpose);
        doc
    }

    fn add_tag(&mut self, tag: &str) -> Section {
        let (kind, rest) = split_word(tag);
        match kind {
            "param" => {
                let (first, rest) = split_word(rest);
                let (type_name, name, description) =
                    if first.starts_with('$') {
                        (None, first, rest)
                    } else {
                        match split_word(rest) {
                            ("", _) => (None, first, ""),
                            (second, rest) => (Some(first), second, rest),
                        }
                    };
                let name = name.trim_start_matches('$');
                if name.is_empty() {
                    return Section::Ignored;
                }
                self.params.insert(name.to_string(), DocTag {
                    type_name: type_name.map(str::to_string),
                    description: description.to_string(),
                });
                Section::Param(name.to_string())
            }
            "return" | "returns" => {
                let (type_name, description) = split_word(rest);
                self.returns = Some(DocTag {
                    type_name: Some(type_name)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                    description: description.to_string(),
                });
                Section::Return
            }
            // Unrecognized tags (@throws, @see, ...) and their continuation
            // lines are dropped.
            _ => Section::Ignored,
        }
    }

    pub fn param(&self, name: &str) -> Option<&DocTag> {
        self.params.get(name).or_else(|| {
            self.params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }
}

fn normalize_line(raw: &str) -> &str {
    let line = raw.trim();
    let line = line.strip_prefix("/**").unwrap_or(line);
    let line = line.strip_suffix("*/").unwrap_or(line);
    let line = line.trim();
    line.strip_prefix("* ")
        .unwrap_or_else(|| line.strip_prefix('*').unwrap_or(line))
        .trim()
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn append_text(buf: &mut String, line: &str) {
    if line.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(line);
}

fn join_paragraphs(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut pending_break = false;
    for line in lines {
        if line.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }
        if pending_break {
            out.push_str("\n\n");
            pending_break = false;
        } else if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}
