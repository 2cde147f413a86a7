use std::time::{Duration, Instant};

use smelter::{ExecutionRequest, LanguageId, OutcomeKind};

use super::{available, runner};

const PYTHON_HELLO: &str = "print('Hello, World!')\n";

const GO_HELLO: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("Hello, World!")
}
"#;

const JAVA_HELLO: &str = r#"public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;

const C_HELLO: &str = r#"#include <stdio.h>

int main(void) {
    printf("Hello, World!\n");
    return 0;
}
"#;

const CPP_HELLO: &str = r#"#include <iostream>

int main() {
    std::cout << "Hello, World!" << std::endl;
    return 0;
}
"#;

async fn assert_hello(language: LanguageId, source: &str) {
    let runner = runner();
    if !available(&runner, language) {
        return;
    }

    let request = ExecutionRequest::new(source, language);
    let report = runner.validate_and_execute(&request).await;

    assert!(report.syntax_valid, "syntax rejected: {:?}", report.syntax_error);
    assert!(report.execution_attempted);
    assert!(
        report.result.is_success(),
        "execution failed: {:?} / {}",
        report.result.error,
        report.result.stderr
    );
    assert_eq!(report.result.return_code, Some(0));
    assert!(report.result.stdout.contains("Hello, World!"));
}

#[tokio::test]
async fn hello_world_python() {
    let _guard = super::serial_guard();
    assert_hello(LanguageId::Python, PYTHON_HELLO).await;
}

#[tokio::test]
async fn hello_world_go() {
    let _guard = super::serial_guard();
    assert_hello(LanguageId::Go, GO_HELLO).await;
}

#[tokio::test]
async fn hello_world_java() {
    let _guard = super::serial_guard();
    assert_hello(LanguageId::Java, JAVA_HELLO).await;
}

#[tokio::test]
async fn hello_world_c() {
    let _guard = super::serial_guard();
    assert_hello(LanguageId::C, C_HELLO).await;
}

#[tokio::test]
async fn hello_world_cpp() {
    let _guard = super::serial_guard();
    assert_hello(LanguageId::Cpp, CPP_HELLO).await;
}

#[tokio::test]
async fn nonzero_exit_is_runtime_failure() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let request = ExecutionRequest::new("import sys\nsys.exit(3)\n", LanguageId::Python);
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(result.kind, OutcomeKind::RuntimeFailure);
    assert_eq!(result.return_code, Some(3));
}

#[tokio::test]
async fn infinite_loop_times_out_within_margin() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let request = ExecutionRequest::new("while True:\n    pass\n", LanguageId::Python)
        .with_timeout(Duration::from_secs(2));

    let start = Instant::now();
    let result = runner.run_code(&request).await;

    // Bounded return: the 2s budget plus termination overhead
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(!result.is_success());
    assert_eq!(result.kind, OutcomeKind::Timeout);
    assert_eq!(result.return_code, Some(-1));
    assert!(result.error.as_deref().unwrap_or("").contains("timed out"));
}

#[tokio::test]
async fn oversized_output_is_truncated_and_flagged() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    // 2 MiB of output against the 1 MiB per-stream ceiling
    let request = ExecutionRequest::new(
        "print('a' * (2 * 1024 * 1024))\n",
        LanguageId::Python,
    );
    let result = runner.run_code(&request).await;

    assert!(result.truncated);
    assert!(result.stdout.len() as u64 <= smelter::types::DEFAULT_MAX_OUTPUT + 64);
    assert!(result.stdout.contains("truncated"));
}

#[tokio::test]
async fn denied_pattern_rejected_before_execution() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let before = super::scratch_dir_count();
    let request = ExecutionRequest::new("x = eval('2 + 2')\nprint(x)\n", LanguageId::Python);
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(result.kind, OutcomeKind::Denied);
    // No scratch directory may appear for a denied request
    assert_eq!(super::scratch_dir_count(), before);
}

#[tokio::test]
async fn c_unused_variable_still_succeeds() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::C) {
        return;
    }

    let source = r#"#include <stdio.h>

int main(void) {
    int unused = 42;
    printf("done\n");
    return 0;
}
"#;
    let request = ExecutionRequest::new(source, LanguageId::C);
    let report = runner.validate_and_execute(&request).await;

    // A warning-only issue must not fail the pipeline
    assert!(report.is_success(), "failed: {:?}", report.result.error);
    assert!(report.result.stdout.contains("done"));
}

#[tokio::test]
async fn c_link_failure_is_compile_error() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::C) {
        return;
    }

    // Syntactically valid, but no main: passes the syntax-only check
    // and fails at the compile/link phase
    let source = "int helper(void) { return 1; }\n";
    let request = ExecutionRequest::new(source, LanguageId::C);
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(result.kind, OutcomeKind::CompileError);
    assert!(!result.stderr.is_empty());
}

#[tokio::test]
async fn unsupported_language_reported_without_workspace() {
    let _guard = super::serial_guard();
    let runner = smelter::Runner::new(smelter::Config::empty());
    let before = super::scratch_dir_count();

    let request = ExecutionRequest::new("print(1)", LanguageId::Python);
    let result = runner.run_code(&request).await;

    assert_eq!(result.kind, OutcomeKind::UnsupportedLanguage);
    assert_eq!(super::scratch_dir_count(), before);
}
