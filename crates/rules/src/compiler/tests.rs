//! Tests for reflective rule compilation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rulecheck_core::{fingerprint, Annotation, FieldDef, ModuleImage, TypeDef};

use super::*;

const MARKER: &str = "CheckAttribute";

/// Minimal subsystem: `Check("<expr>")` where `<expr>` is one of
/// `ok`, `undefined:<name>`, `sibling:<field>`, or `explode`.
#[derive(Default)]
struct FakeRules {
    binds: AtomicUsize,
}

struct FakeRule<'a> {
    annotation: &'a Annotation,
}

impl RuleSubsystem for FakeRules {
    fn module_name(&self) -> &str {
        "Checks"
    }

    fn marker(&self) -> &str {
        MARKER
    }

    fn bind<'a>(&'a self, annotation: &'a Annotation) -> Option<Box<dyn RuleAttribute + 'a>> {
        self.binds.fetch_add(1, Ordering::Relaxed);
        if annotation.name != "Check" {
            return None;
        }
        Some(Box::new(FakeRule { annotation }))
    }
}

impl RuleAttribute for FakeRule<'_> {
    fn name(&self) -> &str {
        &self.annotation.name
    }

    fn expression(&self) -> &str {
        self.annotation.args.first().map(String::as_str).unwrap_or("")
    }

    fn compile(&self, declaring: &DeclaringType<'_>) -> Result<(), AttributeFault> {
        let expr = self.expression();
        if let Some(name) = expr.strip_prefix("undefined:") {
            return Err(RuleError::new(
                RuleErrorKind::UnresolvedSymbol,
                format!("Identifier '{name}' not known"),
            )
            .into());
        }
        if let Some(field) = expr.strip_prefix("sibling:") {
            return match declaring.member(field) {
                Some(_) => Ok(()),
                None => Err(RuleError::new(
                    RuleErrorKind::UnresolvedSymbol,
                    format!("'{}' has no member '{field}'", declaring.name()),
                )
                .into()),
            };
        }
        if expr == "explode" {
            return Err(AttributeFault::Unclassified("attribute state corrupted".into()));
        }
        Ok(())
    }
}

fn check(expr: &str) -> Annotation {
    Annotation::new("Check").based_on(MARKER).arg(expr)
}

fn module(image: ModuleImage) -> Module {
    Module::new(
        PathBuf::from("/bin/App.rmod"),
        fingerprint(b"App"),
        image,
        Vec::new(),
        Vec::new(),
        1,
    )
}

fn app() -> ModuleImage {
    ModuleImage::new("App").reference("Checks")
}

#[test]
fn module_without_subsystem_reference_is_skipped() {
    let rules = FakeRules::default();
    let m = module(ModuleImage::new("App").with_type(
        TypeDef::class("Model").with_field(FieldDef::new("Name", "string").annotated(check("undefined:x"))),
    ));

    let errors = compile_module(&m, &rules).unwrap();

    assert!(errors.is_empty());
    assert_eq!(rules.binds.load(Ordering::Relaxed), 0);
    assert!(rule_sites(&m, &rules).is_empty());
}

#[test]
fn types_without_rules_produce_no_errors() {
    let rules = FakeRules::default();
    let m = module(
        app()
            .with_type(TypeDef::class("Plain").with_field(FieldDef::new("Name", "string")))
            .with_type(TypeDef::enumeration("Score", ["Low", "High"])),
    );

    assert!(compile_module(&m, &rules).unwrap().is_empty());
    assert_eq!(rules.binds.load(Ordering::Relaxed), 0);
}

#[test]
fn errors_accumulate_in_discovery_order() {
    let rules = FakeRules::default();
    let m = module(
        app()
            .with_type(
                TypeDef::class("First")
                    .with_field(FieldDef::new("A", "int").annotated(check("undefined:a")))
                    .with_field(FieldDef::new("B", "int").annotated(check("ok")))
                    .with_field(FieldDef::new("C", "int").annotated(check("undefined:c"))),
            )
            .with_type(
                TypeDef::class("Second")
                    .with_field(FieldDef::new("D", "int").annotated(check("undefined:d"))),
            ),
    );

    let errors = compile_module(&m, &rules).unwrap();

    let located: Vec<_> = errors
        .iter()
        .map(|e| format!("{}.{}", e.type_name, e.field))
        .collect();
    assert_eq!(located, vec!["First.A", "First.C", "Second.D"]);
    assert_eq!(errors[0].message(), "Identifier 'a' not known");
    assert_eq!(errors[0].error.kind, RuleErrorKind::UnresolvedSymbol);
    assert_eq!(rules.binds.load(Ordering::Relaxed), 4);
}

#[test]
fn failing_subset_of_one_field_keeps_declaration_order() {
    let rules = FakeRules::default();
    let field = FieldDef::new("ReturnDate", "DateTime?")
        .annotated(check("undefined:first"))
        .annotated(check("ok"))
        .annotated(check("undefined:second"))
        .annotated(check("ok"));
    let m = module(app().with_type(TypeDef::class("Model").with_field(field)));

    let errors = compile_module(&m, &rules).unwrap();

    let messages: Vec<_> = errors.iter().map(|e| e.message()).collect();
    assert_eq!(
        messages,
        vec!["Identifier 'first' not known", "Identifier 'second' not known"]
    );
}

#[test]
fn annotations_without_marker_are_ignored() {
    let rules = FakeRules::default();
    let field = FieldDef::new("Name", "string")
        .annotated(Annotation::new("Check").arg("undefined:x"))
        .annotated(Annotation::new("Check").based_on("DisplayAttribute").arg("undefined:y"));
    let m = module(app().with_type(TypeDef::class("Model").with_field(field)));

    assert!(compile_module(&m, &rules).unwrap().is_empty());
    assert_eq!(rules.binds.load(Ordering::Relaxed), 0);
}

#[test]
fn declaring_type_exposes_siblings() {
    let rules = FakeRules::default();
    let ty = TypeDef::class("Model")
        .with_field(FieldDef::new("GoAbroad", "bool"))
        .with_field(FieldDef::new("Passport", "string").annotated(check("sibling:GoAbroad")))
        .with_field(FieldDef::new("Other", "string").annotated(check("sibling:Missing")));
    let m = module(app().with_type(ty));

    let errors = compile_module(&m, &rules).unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "Other");
    assert_eq!(errors[0].message(), "'Model' has no member 'Missing'");
}

#[test]
fn unclassified_fault_propagates() {
    let rules = FakeRules::default();
    let ty = TypeDef::class("Model")
        .with_field(FieldDef::new("A", "int").annotated(check("undefined:a")))
        .with_field(FieldDef::new("B", "int").annotated(check("explode")))
        .with_field(FieldDef::new("C", "int").annotated(check("undefined:c")));
    let m = module(app().with_type(ty));

    match compile_module(&m, &rules) {
        Err(ValidateError::Unclassified {
            type_name,
            field,
            attribute,
            source,
        }) => {
            assert_eq!(type_name, "Model");
            assert_eq!(field, "B");
            assert_eq!(attribute, "Check");
            assert_eq!(source.to_string(), "attribute state corrupted");
        }
        other => panic!("expected unclassified failure, got {other:?}"),
    }
    // C is never reached.
    assert_eq!(rules.binds.load(Ordering::Relaxed), 2);
}

#[test]
fn marked_annotation_without_capability_is_unclassified() {
    let rules = FakeRules::default();
    let field = FieldDef::new("A", "int").annotated(Annotation::new("Mystery").based_on(MARKER));
    let m = module(app().with_type(TypeDef::class("Model").with_field(field)));

    let err = compile_module(&m, &rules).unwrap_err();
    assert!(matches!(err, ValidateError::Unclassified { .. }));
    assert!(err.to_string().contains("exposes no compile capability"));
}

#[test]
fn compilation_error_display_locates_rule() {
    let rules = FakeRules::default();
    let field = FieldDef::new("Passport", "string").annotated(check("undefined:IsDigitChain"));
    let m = module(app().with_type(TypeDef::class("Model").with_field(field)));

    let errors = compile_module(&m, &rules).unwrap();
    assert_eq!(
        errors[0].to_string(),
        "Model.Passport [Check(\"undefined:IsDigitChain\")]: Identifier 'IsDigitChain' not known"
    );
}

#[test]
fn rule_sites_lists_marked_annotations() {
    let rules = FakeRules::default();
    let field = FieldDef::new("A", "int")
        .annotated(check("ok"))
        .annotated(Annotation::new("Display"));
    let m = module(app().with_type(TypeDef::class("Model").with_field(field)));

    let sites = rule_sites(&m, &rules);
    assert_eq!(
        sites,
        vec![RuleSite {
            type_name: "Model".to_string(),
            field: "A".to_string(),
            attribute: "Check".to_string(),
            expression: Some("ok".to_string()),
        }]
    );
}
