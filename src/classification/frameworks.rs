//! Framework detection.
//!
//! Each framework has a fingerprint document built once from its known
//! import strings. A file's imports form a query document that is scored
//! against every fingerprint with TF-IDF weighted cosine similarity; every
//! framework above `SIMILARITY_THRESHOLD` is reported. Content overrides then
//! force-add frameworks the similarity pass can miss.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

use crate::classification::imports::extract_imports;
use crate::models::{FileChange, Skill};

/// Minimum cosine similarity for a framework to be reported (exclusive).
pub const SIMILARITY_THRESHOLD: f64 = 0.1;

/// Known import strings per framework.
const FRAMEWORK_IMPORTS: &[(&str, &[&str])] = &[
    // JavaScript/TypeScript
    ("React", &["react", "react-dom", "react-router", "redux", "react-redux"]),
    ("Vue", &["vue", "vue-router", "vuex", "vuetify", "@vue/"]),
    ("Angular", &["@angular/", "angular", "ng-"]),
    ("Next.js", &["next", "next/router", "next/link", "next/image"]),
    ("Express", &["express", "express-session", "body-parser", "express from"]),
    ("NestJS", &["@nestjs/"]),
    ("jQuery", &["jquery", "$"]),
    ("D3.js", &["d3"]),
    ("Three.js", &["three"]),
    ("Jest", &["jest", "@testing-library/"]),
    // Python
    ("Django", &["django", "django.db", "django.contrib", "django.urls"]),
    ("Flask", &["flask", "flask_", "flask."]),
    ("FastAPI", &["fastapi", "pydantic", "starlette"]),
    ("Pandas", &["pandas", "numpy"]),
    ("Pytest", &["pytest"]),
    ("SQLAlchemy", &["sqlalchemy"]),
    ("PyTorch", &["torch", "torchvision"]),
    ("TensorFlow", &["tensorflow", "tf."]),
    ("Streamlit", &["streamlit"]),
    // Java
    ("Spring", &["org.springframework", "springframework"]),
    ("Hibernate", &["org.hibernate", "javax.persistence", "jakarta.persistence"]),
    ("JUnit", &["org.junit", "junit."]),
    ("Mockito", &["org.mockito", "mockito"]),
    // Go
    ("Gin", &["github.com/gin-gonic/gin", "gin"]),
    ("Echo", &["github.com/labstack/echo", "echo"]),
    ("Fiber", &["github.com/gofiber/fiber", "fiber"]),
    ("GORM", &["gorm.io/gorm", "gorm"]),
    ("Cobra", &["github.com/spf13/cobra"]),
    // Rust
    ("Rocket", &["rocket", "rocket::"]),
    ("Actix", &["actix_web", "actix::"]),
    ("Tokio", &["tokio", "tokio::"]),
    ("Serde", &["serde", "serde_json"]),
    ("Axum", &["axum"]),
    // PHP
    ("Laravel", &["Illuminate\\", "Laravel\\"]),
    ("Symfony", &["Symfony\\", "symfony"]),
    ("WordPress", &["wp_", "WP_"]),
    // Ruby
    ("Rails", &["Rails", "ActiveRecord", "ActionController", "ActionView"]),
    ("Sinatra", &["Sinatra", "sinatra"]),
    // C#
    ("ASP.NET", &["Microsoft.AspNetCore", "System.Web"]),
    ("Entity Framework", &["Microsoft.EntityFrameworkCore", "System.Data.Entity"]),
    ("LINQ", &["System.Linq"]),
    // Mobile
    ("Flutter", &["flutter", "material.dart", "widgets.dart"]),
    ("React Native", &["react-native", "ReactNative"]),
    // Kotlin
    (
        "Ktor",
        &[
            "io.ktor",
            "ktor",
            "io.ktor.server",
            "io.ktor.server.plugins",
            "io.ktor.server.application.*",
        ],
    ),
];

/// A content rule that force-adds a framework.
///
/// Fires when the file's language is in `languages` and, for any one entry of
/// `triggers`, every substring of that entry occurs in the lower-cased content.
#[derive(Debug)]
pub struct ContentOverride {
    pub framework: &'static str,
    pub languages: &'static [&'static str],
    pub triggers: &'static [&'static [&'static str]],
}

const CONTENT_OVERRIDES: &[ContentOverride] = &[
    ContentOverride {
        framework: "React",
        languages: &["JavaScript", "TypeScript"],
        triggers: &[
            &["import react"],
            &["from 'react'"],
            &["from \"react\""],
            &["react.component"],
            &["usestate"],
            &["useeffect"],
        ],
    },
    ContentOverride {
        framework: "Django",
        languages: &["Python"],
        triggers: &[
            &["from django"],
            &["import django"],
            &["models.model"],
            &["class meta:", "models."],
        ],
    },
];

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"[a-zA-Z0-9_\-./]+").unwrap();

    static ref FINGERPRINTS: FingerprintIndex = FingerprintIndex::build(FRAMEWORK_IMPORTS);
}

/// Sparse term-weight vector, L2-normalised.
type TermVector = HashMap<String, f64>;

/// TF-IDF fingerprints for every known framework.
#[derive(Debug)]
pub struct FingerprintIndex {
    idf: HashMap<String, f64>,
    fingerprints: Vec<(&'static str, TermVector)>,
}

impl FingerprintIndex {
    pub fn build(table: &[(&'static str, &[&str])]) -> Self {
        let documents: Vec<(&'static str, Vec<String>)> = table
            .iter()
            .map(|(framework, imports)| (*framework, tokenize(&imports.join(" "))))
            .collect();

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for (_, tokens) in &documents {
            let unique: BTreeSet<&String> = tokens.iter().collect();
            for token in unique {
                *document_frequency.entry(token.clone()).or_insert(0) += 1;
            }
        }

        // Smoothed idf: ln((1 + n) / (1 + df)) + 1
        let n = documents.len() as f64;
        let idf: HashMap<String, f64> = document_frequency
            .into_iter()
            .map(|(token, df)| (token, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();

        let fingerprints = documents
            .into_iter()
            .map(|(framework, tokens)| (framework, weigh(&tokens, &idf)))
            .collect();

        Self { idf, fingerprints }
    }

    /// Cosine similarity of an import document against every fingerprint.
    pub fn scores(&self, document: &str) -> Vec<(&'static str, f64)> {
        let query = weigh(&tokenize(document), &self.idf);
        self.fingerprints
            .iter()
            .map(|(framework, fingerprint)| {
                let dot = query
                    .iter()
                    .filter_map(|(token, w)| fingerprint.get(token).map(|f| w * f))
                    .sum::<f64>();
                (*framework, dot)
            })
            .collect()
    }

    /// Frameworks scoring strictly above `threshold`.
    pub fn matches(&self, document: &str, threshold: f64) -> BTreeSet<Skill> {
        self.scores(document)
            .into_iter()
            .filter(|(_, score)| *score > threshold)
            .map(|(framework, _)| framework.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Lower-cased tokens; characters outside the token pattern separate tokens.
fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Raw term counts scaled by idf, L2-normalised. Out-of-vocabulary tokens are dropped.
fn weigh(tokens: &[String], idf: &HashMap<String, f64>) -> TermVector {
    let mut vector: TermVector = HashMap::new();
    for token in tokens {
        if let Some(weight) = idf.get(token) {
            *vector.entry(token.clone()).or_insert(0.0) += weight;
        }
    }

    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
    vector
}

/// Frameworks detected in a file.
///
/// Files without a language or content have none. Multiple frameworks may be
/// reported for one file; there is no ranking.
pub fn classify_frameworks(file: &FileChange) -> BTreeSet<Skill> {
    let (Some(language), Some(content)) = (file.language.as_deref(), file.content.as_deref())
    else {
        return BTreeSet::new();
    };

    let imports = extract_imports(content, language);
    let mut frameworks = if imports.is_empty() {
        BTreeSet::new()
    } else {
        let document = imports.into_iter().collect::<Vec<_>>().join(" ");
        FINGERPRINTS.matches(&document, SIMILARITY_THRESHOLD)
    };

    frameworks.extend(content_overrides(language, content));
    frameworks
}

/// Frameworks force-added by content overrides.
pub fn content_overrides(language: &str, content: &str) -> BTreeSet<Skill> {
    let lowered = content.to_lowercase();
    CONTENT_OVERRIDES
        .iter()
        .filter(|o| o.languages.contains(&language))
        .filter(|o| {
            o.triggers
                .iter()
                .any(|all| all.iter().all(|needle| lowered.contains(needle)))
        })
        .map(|o| o.framework.to_string())
        .collect()
}

/// Every framework the classifier can report.
pub fn known_frameworks() -> Vec<&'static str> {
    FRAMEWORK_IMPORTS.iter().map(|(framework, _)| *framework).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(path: &str, language: &str, content: &str) -> FileChange {
        let mut file = FileChange::new(path, 1, 0, Some(content.to_string()));
        file.language = Some(language.to_string());
        file
    }

    #[test]
    fn test_fingerprint_for_every_framework() {
        assert_eq!(FINGERPRINTS.len(), FRAMEWORK_IMPORTS.len());
        assert!(known_frameworks().contains(&"Ktor"));
    }

    #[test]
    fn test_ktor_application_import_in_vocabulary() {
        assert!(FINGERPRINTS.idf.contains_key("io.ktor.server.application."));
        let scores = FINGERPRINTS.scores("io.ktor.server.application.*");
        let ktor = scores.iter().find(|(f, _)| *f == "Ktor").unwrap().1;
        assert!(ktor > SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_exact_fingerprint_scores_one() {
        let scores = FINGERPRINTS.scores("pytest");
        let pytest = scores.iter().find(|(f, _)| *f == "Pytest").unwrap().1;
        assert!((pytest - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_tokens_score_zero() {
        assert!(FINGERPRINTS
            .scores("left-pad lodash")
            .iter()
            .all(|(_, score)| *score == 0.0));
    }

    #[test]
    fn test_react_import_detected() {
        let file = classified("app.js", "JavaScript", "import React from 'react';\n");
        let frameworks = classify_frameworks(&file);
        assert!(frameworks.contains("React"));
        assert!(!frameworks.contains("Vue"));
    }

    #[test]
    fn test_go_gin_detected_from_import_block() {
        let code = "package main\n\nimport (\n    \"github.com/gin-gonic/gin\"\n    \"net/http\"\n)\n";
        let frameworks = classify_frameworks(&classified("server.go", "Go", code));
        assert!(frameworks.contains("Gin"));
    }

    #[test]
    fn test_multiple_frameworks_attributed() {
        let code = "import pandas\nimport torch\nimport streamlit\n";
        let frameworks = classify_frameworks(&classified("app.py", "Python", code));
        assert!(frameworks.contains("Pandas"));
        assert!(frameworks.contains("PyTorch"));
        assert!(frameworks.contains("Streamlit"));
    }

    #[test]
    fn test_django_override_without_imports() {
        let code = "class Product(models.Model):\n    name = models.CharField(max_length=100)\n";
        let frameworks = classify_frameworks(&classified("models.py", "Python", code));
        assert!(frameworks.contains("Django"));
    }

    #[test]
    fn test_override_respects_language() {
        assert!(content_overrides("Python", "const [a, setA] = useState(0);").is_empty());
        assert!(content_overrides("TypeScript", "const [a, setA] = useState(0);").contains("React"));
    }

    #[test]
    fn test_no_content_no_frameworks() {
        let mut file = FileChange::new("app.js", 1, 0, None);
        file.language = Some("JavaScript".to_string());
        assert!(classify_frameworks(&file).is_empty());
    }
}
