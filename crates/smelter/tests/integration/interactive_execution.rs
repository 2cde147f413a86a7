use std::time::Duration;

use smelter::{LanguageId, SessionError, SessionEvent, SessionState};

use super::{available, runner};

/// Line-for-line echo that flushes eagerly so output crosses the pipe
/// as soon as each input line lands.
const PYTHON_ECHO: &str = r#"import sys

for line in sys.stdin:
    print(line.rstrip("\n"), flush=True)
"#;

async fn drain_until_idle(
    session: &mut smelter::InteractiveSession,
    budget: Duration,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + budget;
    while session.state() != SessionState::Idle {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session never returned to idle; events so far: {events:?}"
        );
        events.extend(session.poll_events());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    events
}

#[tokio::test]
async fn echo_session_round_trip() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let mut session = runner
        .run_interactive(PYTHON_ECHO, LanguageId::Python, Duration::from_secs(30))
        .await
        .expect("session should start");
    assert_eq!(session.state(), SessionState::Running);

    session.submit_line("abc").await.expect("send input");

    // The echoed line must appear, and must precede the exit marker
    // once the process is told to finish
    session.close_stdin();
    let events = drain_until_idle(&mut session, Duration::from_secs(10)).await;

    let echo_pos = events
        .iter()
        .position(|e| *e == SessionEvent::Stdout("abc".to_owned()))
        .expect("echoed line not observed");
    let exit_pos = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Exited { .. }))
        .expect("exit marker not observed");
    assert!(echo_pos < exit_pos);
}

#[tokio::test]
async fn multi_turn_exchange() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let adder = r#"import sys

for line in sys.stdin:
    a, b = line.split()
    print(int(a) + int(b), flush=True)
"#;

    let mut session = runner
        .run_interactive(adder, LanguageId::Python, Duration::from_secs(30))
        .await
        .expect("session should start");

    for (a, b, expected) in [(1, 2, 3), (10, 20, 30), (-5, 15, 10)] {
        session
            .submit_line(&format!("{a} {b}"))
            .await
            .expect("send input");

        // Wait for exactly this round's reply
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        let reply = loop {
            assert!(tokio::time::Instant::now() < deadline, "no reply");
            match session.recv_event().await {
                Some(SessionEvent::Stdout(line)) => break line,
                Some(SessionEvent::Stderr(line)) => panic!("stderr: {line}"),
                Some(other) => panic!("unexpected event: {other:?}"),
                None => panic!("queue closed early"),
            }
        };
        assert_eq!(reply, expected.to_string());
    }

    session.close_stdin();
    drain_until_idle(&mut session, Duration::from_secs(10)).await;
}

#[tokio::test]
async fn interrupt_tears_down_session() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let sleeper = "import time\ntime.sleep(300)\n";
    let mut session = runner
        .run_interactive(sleeper, LanguageId::Python, Duration::from_secs(30))
        .await
        .expect("session should start");
    assert_eq!(session.state(), SessionState::Running);

    assert!(session.interrupt());

    let start = tokio::time::Instant::now();
    let events = drain_until_idle(&mut session, Duration::from_secs(10)).await;
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(events.contains(&SessionEvent::Interrupted));
}

#[tokio::test]
async fn rejected_source_never_starts_a_session() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::Python) {
        return;
    }

    let result = runner
        .run_interactive(
            "eval('1 + 1')\n",
            LanguageId::Python,
            Duration::from_secs(30),
        )
        .await;

    let Err(SessionError::Rejected(record)) = result else {
        panic!("expected rejection");
    };
    assert_eq!(record.kind, smelter::OutcomeKind::Denied);
}

#[tokio::test]
async fn interactive_compiled_program() {
    let _guard = super::serial_guard();
    let runner = runner();
    if !available(&runner, LanguageId::C) {
        return;
    }

    let echo_c = r#"#include <stdio.h>

int main(void) {
    char buf[256];
    while (fgets(buf, sizeof buf, stdin)) {
        fputs(buf, stdout);
        fflush(stdout);
    }
    return 0;
}
"#;

    let mut session = runner
        .run_interactive(echo_c, LanguageId::C, Duration::from_secs(30))
        .await
        .expect("session should start");

    session.submit_line("compiled echo").await.expect("send input");
    session.close_stdin();

    let events = drain_until_idle(&mut session, Duration::from_secs(10)).await;
    assert!(events.contains(&SessionEvent::Stdout("compiled echo".to_owned())));
    assert!(events.contains(&SessionEvent::Exited {
        return_code: Some(0)
    }));
}
