use smelter::{ExecutionRequest, LanguageId};

use super::{available, runner, scratch_dir_count};

#[tokio::test]
async fn workspace_removed_after_success() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let before = scratch_dir_count();
    let request = ExecutionRequest::new("print('cleanup check')\n", LanguageId::Python);
    let result = runner.run_code(&request).await;

    assert!(result.is_success());
    assert_eq!(scratch_dir_count(), before);
}

#[tokio::test]
async fn workspace_removed_after_runtime_failure() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let before = scratch_dir_count();
    let request = ExecutionRequest::new("raise RuntimeError('boom')\n", LanguageId::Python);
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(scratch_dir_count(), before);
}

#[tokio::test]
async fn workspace_removed_after_compile_failure() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::C) {
        return;
    }

    let before = scratch_dir_count();
    // Valid syntax, fails to link (no main)
    let request = ExecutionRequest::new("int helper(void) { return 1; }\n", LanguageId::C);
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(scratch_dir_count(), before);
}

#[tokio::test]
async fn workspace_removed_after_timeout() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let before = scratch_dir_count();
    let request = ExecutionRequest::new("while True:\n    pass\n", LanguageId::Python)
        .with_timeout(std::time::Duration::from_secs(1));
    let result = runner.run_code(&request).await;

    assert!(!result.is_success());
    assert_eq!(scratch_dir_count(), before);
}

#[tokio::test]
async fn interactive_workspace_removed_after_session_ends() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let before = scratch_dir_count();
    {
        let mut session = runner
            .run_interactive(
                "print('short-lived', flush=True)\n",
                LanguageId::Python,
                std::time::Duration::from_secs(30),
            )
            .await
            .expect("session should start");

        // Session owns the workspace while the program lives
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
        while session.state() != smelter::SessionState::Idle {
            assert!(tokio::time::Instant::now() < deadline);
            session.poll_events();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
    assert_eq!(scratch_dir_count(), before);
}
