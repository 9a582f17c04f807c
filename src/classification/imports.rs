//! Import statement extraction.
//!
//! A line-prefix grammar per language: each rule names the keyword an import
//! line starts with and how the module name is cut out of the rest of the
//! line. More specific prefixes come first within a language.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

/// How the module name is extracted from the text after the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStyle {
    PythonFrom,
    PythonImport,
    JavaStyle,
    KotlinStyle,
    JsImport,
    ParenRequire,
    GoQuoted,
    RustUse,
    RustExternCrate,
    PhpUse,
    RubyRequire,
    RubyInclude,
    DartImport,
    CSharpUsing,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportRule {
    pub prefix: &'static str,
    pub style: ImportStyle,
}

const fn rule(prefix: &'static str, style: ImportStyle) -> ImportRule {
    ImportRule { prefix, style }
}

/// Lines starting with these are skipped.
const COMMENT_PREFIXES: &[&str] = &["#", "//", "--", "/*"];

lazy_static! {
    /// Import rules keyed by language.
    static ref IMPORT_RULES: HashMap<&'static str, Vec<ImportRule>> = {
        use ImportStyle::*;
        let js = vec![rule("import ", JsImport), rule("require(", ParenRequire)];
        HashMap::from([
            ("Python", vec![rule("from ", PythonFrom), rule("import ", PythonImport)]),
            ("Java", vec![rule("import ", JavaStyle)]),
            ("Kotlin", vec![rule("import ", KotlinStyle)]),
            ("JavaScript", js.clone()),
            ("TypeScript", js),
            ("Go", vec![rule("import \"", GoQuoted)]),
            ("Rust", vec![rule("use ", RustUse), rule("extern crate ", RustExternCrate)]),
            (
                "PHP",
                vec![
                    rule("use ", PhpUse),
                    rule("require_once(", ParenRequire),
                    rule("require(", ParenRequire),
                ],
            ),
            (
                "Ruby",
                vec![
                    rule("require_relative ", RubyRequire),
                    rule("require ", RubyRequire),
                    rule("include ", RubyInclude),
                ],
            ),
            ("Dart", vec![rule("import ", DartImport)]),
            ("C#", vec![rule("using ", CSharpUsing)]),
        ])
    };

    /// A single- or double-quoted string.
    static ref QUOTED: Regex = Regex::new(r#"['"]([^'"]+)['"]"#).unwrap();

    /// Go `import ( ... )` block.
    static ref GO_IMPORT_BLOCK: Regex = Regex::new(r"(?s)import\s*\((.*?)\)").unwrap();
}

/// Find the modules imported by `content`, using the rules for `language`.
///
/// Languages without rules yield an empty set.
pub fn extract_imports(content: &str, language: &str) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();

    let Some(rules) = IMPORT_RULES.get(language) else {
        return imports;
    };

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || COMMENT_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
            continue;
        }

        // First matching rule wins for a line
        if let Some(rule) = rules.iter().find(|r| stripped.starts_with(r.prefix)) {
            if let Some(module) = extract_module_name(&stripped[rule.prefix.len()..], rule.style) {
                imports.insert(module);
            }
        }
    }

    if language == "Go" {
        for block in GO_IMPORT_BLOCK.captures_iter(content) {
            for quoted in QUOTED.captures_iter(&block[1]) {
                imports.insert(quoted[1].to_string());
            }
        }
    }

    imports
}

fn extract_module_name(payload: &str, style: ImportStyle) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    let name = match style {
        ImportStyle::PythonFrom => payload.split_whitespace().next()?.split('.').next()?,
        ImportStyle::PythonImport => payload
            .split_whitespace()
            .next()?
            .split(',')
            .next()?
            .trim()
            .split('.')
            .next()?,
        ImportStyle::JavaStyle | ImportStyle::CSharpUsing | ImportStyle::RustExternCrate => {
            payload.split(';').next()?.trim()
        }
        ImportStyle::KotlinStyle => payload,
        ImportStyle::JsImport => {
            // `import x from 'mod'` and `import 'mod'`: the last quoted string
            return QUOTED
                .captures_iter(payload)
                .last()
                .map(|c| c[1].to_string());
        }
        ImportStyle::ParenRequire => {
            let inner = payload[..payload.find(')')?].trim();
            unquote(inner)?
        }
        ImportStyle::GoQuoted => &payload[..payload.find('"')?],
        ImportStyle::RustUse => head_before_terminators(payload).split("::").next()?.trim(),
        ImportStyle::PhpUse => head_before_terminators(payload),
        ImportStyle::RubyRequire => unquote(payload)?,
        ImportStyle::RubyInclude => payload.split_whitespace().next()?,
        ImportStyle::DartImport => {
            return QUOTED
                .captures(payload)
                .and_then(|c| c[1].split(' ').next().map(|s| s.to_string()));
        }
    };

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Text before the first `;` or `{`, trimmed.
fn head_before_terminators(payload: &str) -> &str {
    let end = payload
        .find(|c: char| c == ';' || c == '{')
        .unwrap_or(payload.len());
    payload[..end].trim()
}

/// Strip one pair of matching quotes; `None` if the text is not quoted.
fn unquote(text: &str) -> Option<&str> {
    if text.len() < 2 {
        return None;
    }
    for quote in ['\'', '"'] {
        if text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

/// Languages that have import rules.
pub fn languages_with_import_rules() -> Vec<&'static str> {
    let mut languages: Vec<&'static str> = IMPORT_RULES.keys().copied().collect();
    languages.sort_unstable();
    languages
}
