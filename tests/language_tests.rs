//! Integration tests for language support across the parsing pipeline.
//!
//! These tests verify that each supported language can:
//! 1. Be detected from file extensions
//! 2. Have its parser initialized
//! 3. Extract classes, methods and call names from representative source
//!
//! Uses `test-case` for parameterized coverage across both languages.

use std::path::Path;

use codepecker::indexer::extractor::{extract_file, extract_source, extractor_for, StructureExtractor};
use codepecker::indexer::CodeParser;
use codepecker::types::{ClassRecord, Language, Visibility};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use test_case::test_case;

fn extract(language: Language, source: &str) -> Vec<ClassRecord> {
    let name = match language {
        Language::CSharp => "Test.cs",
        Language::Java => "Test.java",
    };
    extract_source(Path::new(name), source, language).unwrap()
}

// =========================================================================
// Language metadata
// =========================================================================

#[test]
fn all_languages_have_consistent_as_str_from_str_roundtrip() {
    for lang in Language::ALL {
        assert_eq!(Language::from_str_loose(lang.as_str()), Some(lang));
    }
}

#[test]
fn every_extension_maps_back_to_its_language() {
    for lang in Language::ALL {
        for ext in lang.extensions() {
            assert_eq!(Language::from_extension(ext), Some(lang), "{ext}");
        }
    }
}

#[test_case(Language::CSharp)]
#[test_case(Language::Java)]
fn extractor_reports_its_language(lang: Language) {
    assert_eq!(extractor_for(lang).language(), lang);
}

#[test_case(Language::CSharp, "class Empty {}", "compilation_unit")]
#[test_case(Language::Java, "class Empty {}", "program")]
fn parser_initializes(lang: Language, source: &str, root_kind: &str) {
    let tree = CodeParser::new()
        .parse(Path::new("x"), source, lang)
        .unwrap();
    assert_eq!(tree.root_node().kind(), root_kind);
}

// =========================================================================
// Shared extraction rules
// =========================================================================

#[test_case(Language::CSharp, "public class Svc { public void Run() { a.B(); C(); a.B(); } }" ; "csharp")]
#[test_case(Language::Java, "public class Svc { public void Run() { a.B(); C(); a.B(); } }" ; "java")]
fn calls_are_deduplicated_in_emission_order(lang: Language, source: &str) {
    let classes = extract(lang, source);
    assert_eq!(classes[0].methods[0].raw_calls, vec!["B", "C"]);
}

#[test_case(Language::CSharp, "class Svc { void Run() { } }" ; "csharp")]
#[test_case(Language::Java, "class Svc { void Run() { } }" ; "java")]
fn default_visibilities(lang: Language, source: &str) {
    let classes = extract(lang, source);
    assert_eq!(classes[0].visibility, Visibility::Private);
    assert_eq!(classes[0].methods[0].visibility, Visibility::Public);
}

#[test_case(Language::CSharp, "class Svc { public Svc() { Init(); } void Init() { } }" ; "csharp")]
#[test_case(Language::Java, "class Svc { public Svc() { Init(); } void Init() { } }" ; "java")]
fn constructors_are_methods_named_after_the_class(lang: Language, source: &str) {
    let classes = extract(lang, source);
    let names: Vec<&str> = classes[0].methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Svc", "Init"]);
    assert_eq!(classes[0].methods[0].raw_calls, vec!["Init"]);
}

#[test_case(Language::CSharp, "class Svc { void Run() { Go<int>(); } }" ; "csharp")]
#[test_case(Language::Java, "class Svc { void Run() { this.<Integer>Go(); } }" ; "java")]
fn generic_calls_keep_the_identifier(lang: Language, source: &str) {
    let classes = extract(lang, source);
    assert_eq!(classes[0].methods[0].raw_calls, vec!["Go"]);
}

#[test_case(Language::CSharp, "class Svc { void Run() { var f = () => Inner(); } }" ; "csharp")]
#[test_case(Language::Java, "class Svc { void Run() { Runnable f = () -> Inner(); } }" ; "java")]
fn calls_inside_lambdas_belong_to_the_enclosing_method(lang: Language, source: &str) {
    let classes = extract(lang, source);
    assert_eq!(classes[0].methods[0].raw_calls, vec!["Inner"]);
}

#[test]
fn syntax_errors_still_yield_what_parsed() {
    let classes = extract(
        Language::CSharp,
        "public class Ok { public void Fine() { Work(); } }\nclass Broken { void X( }",
    );
    let ok = classes.iter().find(|c| c.name == "Ok").unwrap();
    assert_eq!(ok.methods[0].raw_calls, vec!["Work"]);
}

#[test]
fn file_without_classes_is_empty_not_an_error() {
    let classes = extract(Language::CSharp, "using System;\nnamespace Empty { }");
    assert!(classes.is_empty());
}

// =========================================================================
// File entry point
// =========================================================================

#[test]
fn extract_file_detects_language_and_strips_bom() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Bom.java");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"public class Bom { void a() { b(); } }");
    std::fs::write(&path, bytes).unwrap();

    let (lang, classes) = extract_file(&path).unwrap();
    assert_eq!(lang, Language::Java);
    assert_eq!(classes[0].name, "Bom");
    assert_eq!(classes[0].methods[0].raw_calls, vec!["b"]);
}

#[test]
fn extract_file_missing_is_a_parse_error_with_path() {
    let err = extract_file(Path::new("/no/such/File.cs")).unwrap_err();
    assert!(err.to_string().contains("/no/such/File.cs"));
}
