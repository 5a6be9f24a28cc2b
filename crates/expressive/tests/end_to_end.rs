//! Validating module images that use expressive rule annotations.

use std::path::PathBuf;
use std::sync::Arc;

use rulecheck_core::{write_image, Annotation, Config, FieldDef, MethodDef, ModuleImage, TypeDef};
use rulecheck_expressive::{ExpressiveRules, Toolchain, Ty, MARKER, MODULE_NAME};
use rulecheck_rules::{RuleErrorKind, ValidateError, Validator};
use tempfile::TempDir;

fn assert_that(expression: &str) -> Annotation {
    Annotation::new("AssertThat").based_on(MARKER).arg(expression)
}

fn required_if(expression: &str) -> Annotation {
    Annotation::new("RequiredIfAttribute").based_on(MARKER).arg(expression)
}

fn score() -> TypeDef {
    TypeDef::enumeration("Score", ["Low", "Average", "High"])
}

fn write(dir: &TempDir, image: &ModuleImage) -> PathBuf {
    let path = dir.path().join(format!("{}.rmod", image.name));
    write_image(&path, image).unwrap();
    path
}

fn validator() -> Validator {
    Validator::new(&Config::default(), Arc::new(ExpressiveRules::new()))
}

#[test]
fn reports_only_the_unknown_function() {
    let dir = TempDir::new().unwrap();
    let image = ModuleImage::new("Sample")
        .reference(MODULE_NAME)
        .with_type(score())
        .with_type(
            TypeDef::class("Model")
                .with_field(FieldDef::new("Level", "Score").annotated(assert_that("Level == Score.High")))
                .with_field(
                    FieldDef::new("PassportNumber", "string")
                        .annotated(assert_that("IsDigitChain(PassportNumber)")),
                ),
        );
    let path = write(&dir, &image);

    let errors = validator().validate(&path).unwrap();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("IsDigitChain"), "{}", errors[0]);
    assert!(errors[0].starts_with("Model.PassportNumber [AssertThat("));
}

#[test]
fn custom_toolchain_function_compiles() {
    let dir = TempDir::new().unwrap();
    let image = ModuleImage::new("Sample").reference(MODULE_NAME).with_type(
        TypeDef::class("Model").with_field(
            FieldDef::new("PassportNumber", "string").annotated(assert_that("IsDigitChain(PassportNumber)")),
        ),
    );
    let path = write(&dir, &image);
    let rules = ExpressiveRules::with_toolchain(
        Toolchain::builtin().with_function("IsDigitChain", [Ty::String], Ty::Bool),
    );

    let v = Validator::new(&Config::default(), Arc::new(rules));
    assert!(v.validate(&path).unwrap().is_empty());
}

#[test]
fn collects_errors_across_fields_in_order() {
    let dir = TempDir::new().unwrap();
    let model = TypeDef::class("Trip")
        .with_field(FieldDef::new("GoAbroad", "bool").annotated(required_if("GoAbroad = true")))
        .with_field(
            FieldDef::new("ReturnDate", "DateTime?")
                .annotated(assert_that("ReturnDate >= Today() + WeekPeriod"))
                .annotated(assert_that("ReturnDate >= Today('asd')"))
                .annotated(assert_that("ReturnDate < AddYears(Today(), 1, 2)")),
        )
        .with_field(FieldDef::new("WeekPeriod", "TimeSpan"))
        .with_method(
            MethodDef::new("AddYears", "DateTime")
                .param("from", "DateTime")
                .param("years", "int"),
        );
    let image = ModuleImage::new("Travel").reference(MODULE_NAME).with_type(model);
    let path = write(&dir, &image);

    let errors = validator().check(&path).unwrap();

    let kinds: Vec<_> = errors.iter().map(|e| e.error.kind).collect();
    assert_eq!(
        kinds,
        vec![RuleErrorKind::Syntax, RuleErrorKind::Arity, RuleErrorKind::Arity]
    );
    assert_eq!(errors[0].field, "GoAbroad");
    assert_eq!(errors[0].error.column, Some(10));
    assert!(errors[1].message().contains("'Today'"));
    assert!(errors[2].message().contains("'AddYears'"));
}

#[test]
fn enum_from_dependency_module() {
    let dir = TempDir::new().unwrap();
    write(&dir, &ModuleImage::new("Shared").with_type(score()));
    let image = ModuleImage::new("App")
        .reference(MODULE_NAME)
        .reference("Shared")
        .with_type(
            TypeDef::class("Model")
                .with_field(FieldDef::new("Level", "Score").annotated(assert_that("Level != Score.Low"))),
        );
    let path = write(&dir, &image);

    assert!(validator().validate(&path).unwrap().is_empty());
}

#[test]
fn annotation_without_expression_is_fatal() {
    let dir = TempDir::new().unwrap();
    let image = ModuleImage::new("App").reference(MODULE_NAME).with_type(
        TypeDef::class("Model")
            .with_field(FieldDef::new("Name", "string").annotated(Annotation::new("AssertThat").based_on(MARKER))),
    );
    let path = write(&dir, &image);

    let err = validator().validate(&path).unwrap_err();
    assert!(matches!(err, ValidateError::Unclassified { .. }));
    assert!(err.to_string().contains("no expression argument"));
}

#[test]
fn annotations_without_marker_are_not_compiled() {
    let dir = TempDir::new().unwrap();
    let image = ModuleImage::new("App").reference(MODULE_NAME).with_type(
        TypeDef::class("Model")
            .with_field(FieldDef::new("Name", "string").annotated(Annotation::new("AssertThat").arg("Nope("))),
    );
    let path = write(&dir, &image);

    assert!(validator().validate(&path).unwrap().is_empty());
}
