//! Extension to language lookup.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::models::{FileChange, Skill};

/// Extension (lower-case, no dot) to language name.
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("py", "Python"),
    ("pyspark", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("cjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("java", "Java"),
    ("c", "C"),
    ("cpp", "C++"),
    ("h", "C++"),
    ("cs", "C#"),
    ("go", "Go"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("kt", "Kotlin"),
    ("kts", "Kotlin"),
    ("rs", "Rust"),
    ("scala", "Scala"),
    ("pl", "Perl"),
    ("lua", "Lua"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("ps1", "PowerShell"),
    ("r", "R"),
    ("dart", "Dart"),
    ("m", "Objective-C"),
    ("jl", "Julia"),
    ("f", "Fortran"),
    ("f90", "Fortran"),
    ("f95", "Fortran"),
    ("f03", "Fortran"),
    ("f08", "Fortran"),
    ("hs", "Haskell"),
    ("erl", "Erlang"),
    ("ex", "Elixir"),
    ("exs", "Elixir"),
    ("clj", "Clojure"),
    ("scm", "Scheme"),
    ("lisp", "Lisp"),
    ("asm", "Assembly"),
    ("s", "Assembly"),
    ("vb", "Visual Basic"),
    ("vba", "Visual Basic for Applications"),
    ("sql", "SQL"),
    ("groovy", "Groovy"),
    ("nim", "Nim"),
    ("zig", "Zig"),
    ("coffee", "CoffeeScript"),
    ("vue", "Vue"),
    ("svelte", "Svelte"),
    ("ipynb", "Jupyter Notebook"),
    ("tcl", "Tcl"),
    ("ada", "Ada"),
    ("pas", "Pascal"),
    ("cob", "COBOL"),
];

lazy_static! {
    static ref LANGUAGE_BY_EXTENSION: HashMap<&'static str, &'static str> =
        EXTENSION_TABLE.iter().copied().collect();
}

/// Language for a file, or `None` (Unknown) for unmapped extensions.
pub fn classify_language(file: &FileChange) -> Option<Skill> {
    language_for_extension(&file.extension)
}

pub fn language_for_extension(extension: &str) -> Option<Skill> {
    let normalized = extension.trim_start_matches('.').to_lowercase();
    LANGUAGE_BY_EXTENSION
        .get(normalized.as_str())
        .map(|language| language.to_string())
}

/// Every language the table can produce.
pub fn known_languages() -> Vec<&'static str> {
    let mut languages: Vec<&'static str> = LANGUAGE_BY_EXTENSION.values().copied().collect();
    languages.sort_unstable();
    languages.dedup();
    languages
}
