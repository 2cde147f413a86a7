use smelter::{ExecutionRequest, LanguageId, OutcomeKind, SyntaxVerdict};

use super::{available, runner};

#[tokio::test]
async fn python_syntax_error_reports_line() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let verdict = runner.check_syntax("def f(:\n    pass\n", LanguageId::Python).await;
    let SyntaxVerdict::Invalid { message } = verdict else {
        panic!("expected Invalid, got {verdict:?}");
    };
    assert!(message.contains("line 1"), "no line reference in: {message}");
}

#[tokio::test]
async fn python_clean_source_passes() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let verdict = runner
        .check_syntax("def f():\n    return 1\n", LanguageId::Python)
        .await;
    assert_eq!(verdict, SyntaxVerdict::Clean);
}

#[tokio::test]
async fn syntax_error_skips_execution_entirely() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let request = ExecutionRequest::new("def f(:\n", LanguageId::Python);
    let report = runner.validate_and_execute(&request).await;

    assert!(!report.syntax_valid);
    assert!(!report.execution_attempted);
    assert!(report.syntax_error.is_some());
    assert_eq!(report.result.kind, OutcomeKind::SyntaxError);
}

#[tokio::test]
async fn c_missing_semicolon_reports_line() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::C) {
        return;
    }

    let source = r#"#include <stdio.h>

int main(void) {
    int x = 1
    printf("%d\n", x);
    return 0;
}
"#;
    let request = ExecutionRequest::new(source, LanguageId::C);
    let report = runner.validate_and_execute(&request).await;

    assert!(!report.is_success());
    assert!(!report.execution_attempted);
    let message = report.syntax_error.expect("expected a diagnostic");
    // GCC diagnostics carry line:column positions
    assert!(message.contains("error"), "not an error diagnostic: {message}");
    assert!(
        message.chars().any(|c| c.is_ascii_digit()),
        "no line reference in: {message}"
    );
}

#[tokio::test]
async fn go_syntax_error_is_reported() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Go) {
        return;
    }

    let source = "package main\n\nfunc main() {\n    fmt.Println(\"hi\"\n}\n";
    let verdict = runner.check_syntax(source, LanguageId::Go).await;
    assert!(matches!(verdict, SyntaxVerdict::Invalid { .. }));
}

#[tokio::test]
async fn java_syntax_error_is_reported() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Java) {
        return;
    }

    let source = "public class Main {\n    public static void main(String[] args) {\n        int x = \n    }\n}\n";
    let verdict = runner.check_syntax(source, LanguageId::Java).await;
    assert!(matches!(verdict, SyntaxVerdict::Invalid { .. }));
}

#[tokio::test]
async fn unavailable_language_is_checker_error_not_syntax_error() {
    let _guard = super::serial_guard();
    let runner = smelter::Runner::new(smelter::Config::empty());
    let verdict = runner.check_syntax("print(1)", LanguageId::Python).await;
    assert!(matches!(verdict, SyntaxVerdict::CheckerError { .. }));
}
