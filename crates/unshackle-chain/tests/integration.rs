//! End-to-end tests for release chains.
//!
//! Each test builds an engine over recording collaborators, appends a chain,
//! drives it and checks what the operator would have seen.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::mpsc;

use unshackle_chain::{
    ChainEvent, Command, ConsoleLine, Engine, PromptOptions, RecordingConsole,
    RecordingTerminator, StartOptions, StepKind, StepOptions, UnshackleError,
};
use unshackle_exec::{ScriptedRunner, ShellRunner};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Rig {
    engine: Engine,
    console: Arc<RecordingConsole>,
    terminator: Arc<RecordingTerminator>,
    runner: Arc<ScriptedRunner>,
}

fn rig(runner: ScriptedRunner) -> Rig {
    let console = Arc::new(RecordingConsole::new());
    let terminator = Arc::new(RecordingTerminator::new());
    let runner = Arc::new(runner);
    let engine = Engine::builder()
        .console(console.clone())
        .terminator(terminator.clone())
        .runner(runner.clone())
        .build();
    Rig {
        engine,
        console,
        terminator,
        runner,
    }
}

/// A rig whose operator input comes from the returned sender.
fn interactive_rig() -> (Rig, mpsc::UnboundedSender<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let console = Arc::new(RecordingConsole::new());
    let terminator = Arc::new(RecordingTerminator::new());
    let runner = Arc::new(ScriptedRunner::new());
    let engine = Engine::builder()
        .console(console.clone())
        .terminator(terminator.clone())
        .runner(runner.clone())
        .input(rx)
        .build();
    (
        Rig {
            engine,
            console,
            terminator,
            runner,
        },
        tx,
    )
}

fn marks(console: &RecordingConsole) -> Vec<String> {
    console
        .out_lines()
        .into_iter()
        .filter(|line| line.starts_with('[') && line.ends_with(']') && !line.contains(' '))
        .collect()
}

async fn next_matching<F>(events: &mut tokio::sync::broadcast::Receiver<ChainEvent>, pred: F) -> ChainEvent
where
    F: Fn(&ChainEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn steps_run_in_append_order() {
    let r = rig(ScriptedRunner::new()
        .on("git pull", "Already up to date.\n", "", 0)
        .on("npm version patch", "v1.0.1\n", "", 0));

    let code = r
        .engine
        .start(StartOptions::new().message("Releasing widget"))
        .print("Syncing")
        .run("git pull")
        .print("Bumping")
        .run("npm version patch")
        .done(Some("Released v1.0.1"))
        .await;

    assert_eq!(code, 0);
    assert_eq!(r.runner.executed(), vec!["git pull", "npm version patch"]);
    assert_eq!(
        r.console.out_lines(),
        vec![
            "Releasing widget\n",
            "Syncing",
            "",
            "$ git pull",
            "Already up to date.",
            "",
            "Bumping",
            "",
            "$ npm version patch",
            "v1.0.1",
            "",
            "Released v1.0.1",
        ]
    );
    assert!(r.console.err_lines().is_empty());
    assert_eq!(r.terminator.codes(), vec![0]);
}

// ---------------------------------------------------------------------------
// Resume from a mark
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_skips_to_mark() {
    let r = rig(ScriptedRunner::new());

    r.engine
        .start(StartOptions::new().message("Release").resume_from("two"))
        .run_at("one", "echo one")
        .run_at("two", "echo two")
        .run_at("three", "echo three")
        .done(None)
        .await;

    assert_eq!(r.runner.executed(), vec!["echo two", "echo three"]);
    assert_eq!(marks(&r.console), vec!["[two]", "[three]"]);
    assert_eq!(r.engine.skip_target(), None);
}

#[tokio::test]
async fn required_step_runs_before_mark() {
    let r = rig(ScriptedRunner::new().on("git fetch --tags", "", "", 0));

    let output = r
        .engine
        .start(StartOptions::new().resume_from("publish"))
        .run("npm test")
        .run_with(StepOptions::required(), "git fetch --tags")
        .print("changelog")
        .run_at("publish", "npm publish")
        .await
        .unwrap();

    assert_eq!(output, json!(""));
    assert_eq!(r.runner.executed(), vec!["git fetch --tags", "npm publish"]);
    assert!(!r.console.out_lines().contains(&"changelog".to_string()));
}

#[tokio::test]
async fn unknown_mark_skips_every_ordinary_step() {
    let r = rig(ScriptedRunner::new());

    let code = r
        .engine
        .start(StartOptions::new().resume_from("nowhere"))
        .run_at("one", "echo one")
        .print("two")
        .done(Some("done"))
        .await;

    assert_eq!(code, 0);
    assert!(r.runner.executed().is_empty());
    assert_eq!(r.console.out_lines(), vec!["Starting a release.\n", "done"]);
}

// ---------------------------------------------------------------------------
// Values between steps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn function_values_flow_between_steps() {
    let r = rig(ScriptedRunner::new().on("git describe --tags", "v2.3.0\n", "", 0));

    let output = r
        .engine
        .start(StartOptions::new())
        .run("git describe --tags")
        .run(Command::func(|tag| {
            let tag = tag.as_str().unwrap_or_default().trim_start_matches('v').to_string();
            Ok(json!(tag))
        }))
        .run(Command::func(|version| {
            Ok(json!(format!("release/{}", version.as_str().unwrap_or_default())))
        }))
        .await
        .unwrap();

    assert_eq!(output, json!("release/2.3.0"));
}

#[tokio::test]
async fn async_values_are_awaited() {
    let r = rig(ScriptedRunner::new());
    let started = Instant::now();

    let output = r
        .engine
        .chain()
        .run(Command::future(|_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!("slow"))
        }))
        .run(Command::func(move |value| {
            Ok(json!({
                "value": value,
                "waited": started.elapsed() >= Duration::from_millis(50),
            }))
        }))
        .await
        .unwrap();

    assert_eq!(output, json!({ "value": "slow", "waited": true }));
}

#[tokio::test]
async fn shell_command_is_awaited_before_next_step() {
    let console = Arc::new(RecordingConsole::new());
    let engine = Engine::builder()
        .console(console.clone())
        .terminator(Arc::new(RecordingTerminator::new()))
        .runner(Arc::new(ShellRunner::new()))
        .build();
    let started = Instant::now();

    let output = engine
        .chain()
        .run("sleep 0.05 && echo awake")
        .run(Command::func(move |value| {
            assert!(started.elapsed() >= Duration::from_millis(50));
            Ok(value)
        }))
        .await
        .unwrap();

    assert_eq!(output, json!("awake"));
    assert!(console.out_lines().contains(&"awake".to_string()));
}

#[tokio::test]
async fn spawn_failure_halts_once_and_stops_chain() {
    let console = Arc::new(RecordingConsole::new());
    let terminator = Arc::new(RecordingTerminator::new());
    let engine = Engine::builder()
        .console(console.clone())
        .terminator(terminator.clone())
        .runner(Arc::new(ShellRunner::new().with_shell("/no/such/shell")))
        .build();

    let code = engine
        .chain()
        .run("true")
        .print("after")
        .done(Some("ok"))
        .await;

    assert_eq!(code, 1);
    assert_eq!(terminator.codes(), vec![1]);
    assert_eq!(console.out_lines(), vec!["$ true"]);
    let errors = console.err_lines();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Failed to spawn `true`"), "{errors:?}");
}

#[tokio::test]
async fn empty_resume_mark_runs_every_step() {
    let r = rig(ScriptedRunner::new());

    r.engine
        .start(StartOptions::new().message("m").resume_from(""))
        .print("step one")
        .print_at("", "blank")
        .await
        .unwrap();

    assert_eq!(r.engine.skip_target(), None);
    assert_eq!(r.console.out_lines(), vec!["m\n", "step one", "", "blank", ""]);
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prompt_rejects_then_resolves() {
    let (r, tx) = interactive_rig();
    let mut events = r.engine.subscribe();

    let chain = r
        .engine
        .start(StartOptions::new().message("Release"))
        .prompt("Publish to npm?")
        .run(Command::func(|answer| Ok(json!({ "answer": answer }))));
    let task = tokio::spawn(chain.into_pending());

    next_matching(&mut events, |e| matches!(e, ChainEvent::PromptArmed { .. })).await;
    tx.send("n\n".into()).unwrap();
    let rejected = next_matching(&mut events, |e| matches!(e, ChainEvent::PromptRejected { .. })).await;
    assert_eq!(
        rejected,
        ChainEvent::PromptRejected {
            input: "n".into(),
            choices: vec!["y".into()],
        }
    );
    assert!(!task.is_finished());

    tx.send("  y  \n".into()).unwrap();
    let output = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("chain did not finish")
        .unwrap()
        .unwrap();

    assert_eq!(output, json!({ "answer": "y" }));
    assert!(r.console.out_lines().contains(&"Publish to npm? [y]".to_string()));
    assert!(r
        .console
        .out_lines()
        .contains(&"Choose from [y] to continue, or Ctrl+C to force-quit.".to_string()));
}

#[tokio::test]
async fn prompt_with_custom_choices_yields_choice() {
    let (r, tx) = interactive_rig();
    tx.send("maybe\n".into()).unwrap();
    tx.send("minor\n".into()).unwrap();

    let output = r
        .engine
        .chain()
        .prompt_with(
            PromptOptions::at("bump").with_choices(["patch", "minor", "major"]),
            "Which bump?",
        )
        .await
        .unwrap();

    assert_eq!(output, json!("minor"));
    assert_eq!(
        r.console.out_lines(),
        vec![
            "[bump]",
            "Which bump? [patch, minor, major]",
            "Choose from [patch, minor, major] to continue, or Ctrl+C to force-quit.",
            "",
        ]
    );
}

#[tokio::test]
async fn consecutive_prompts_each_wait_for_input() {
    let (r, tx) = interactive_rig();
    let mut events = r.engine.subscribe();

    let chain = r
        .engine
        .chain()
        .prompt("Tests green?")
        .prompt_with(PromptOptions::choices(["go", "stop"]), "Ship it?");
    let task = tokio::spawn(chain.into_pending());

    next_matching(&mut events, |e| matches!(e, ChainEvent::PromptArmed { .. })).await;
    tx.send("y\n".into()).unwrap();
    let second = next_matching(&mut events, |e| matches!(e, ChainEvent::PromptArmed { .. })).await;
    assert_eq!(
        second,
        ChainEvent::PromptArmed {
            message: "Ship it?".into(),
            choices: vec!["go".into(), "stop".into()],
        }
    );
    tx.send("go\n".into()).unwrap();

    let output = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("chain did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(output, json!("go"));
}

#[tokio::test]
async fn input_without_prompt_is_dropped() {
    let (r, tx) = interactive_rig();
    let mut events = r.engine.subscribe();

    let chain = r.engine.chain().prompt("First?").print("between");
    let task = tokio::spawn(chain.into_pending());
    next_matching(&mut events, |e| matches!(e, ChainEvent::PromptArmed { .. })).await;
    tx.send("y\n".into()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("chain did not finish")
        .unwrap()
        .unwrap();

    tx.send("y\n".into()).unwrap();
    let dropped = next_matching(&mut events, |e| matches!(e, ChainEvent::InputDropped { .. })).await;
    assert_eq!(dropped, ChainEvent::InputDropped { input: "y".into() });
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_start_halts_with_failure() {
    let r = rig(ScriptedRunner::new());

    let _first = r.engine.start(StartOptions::new());
    let code = r.engine.start(StartOptions::new()).print("x").done(None).await;

    assert_eq!(code, 1);
    assert_eq!(r.terminator.codes(), vec![1]);
    assert_eq!(
        r.console.err_lines(),
        vec!["The start method should only be called once."]
    );
}

#[tokio::test]
async fn done_reports_success_and_failure() {
    let ok = rig(ScriptedRunner::new());
    assert_eq!(ok.engine.chain().print("fine").done(Some("All good")).await, 0);
    assert_eq!(ok.terminator.last(), Some(0));

    let broken = rig(ScriptedRunner::new().on("npm publish", "", "E403 Forbidden\n", 1));
    let code = broken
        .engine
        .start(StartOptions::new())
        .run("npm publish")
        .print("never printed")
        .done(Some("Published"))
        .await;

    assert_eq!(code, 1);
    assert_eq!(broken.terminator.codes(), vec![1]);
    assert_eq!(
        broken.console.lines().last(),
        Some(&ConsoleLine::Err("Command `npm publish` exited with status 1".into()))
    );
}

#[tokio::test]
async fn step_failure_message_goes_to_stderr() {
    let r = rig(ScriptedRunner::new());
    let code = r
        .engine
        .chain()
        .run(Command::func(|_| Err(UnshackleError::step("CHANGELOG.md has no entry"))))
        .done(Some("unreachable"))
        .await;

    assert_eq!(code, 1);
    assert_eq!(r.console.err_lines(), vec!["CHANGELOG.md has no entry"]);
    assert_eq!(r.terminator.codes(), vec![1]);
}

#[tokio::test]
async fn events_trace_a_resumed_chain() {
    let r = rig(ScriptedRunner::new());
    let mut events = r.engine.subscribe();

    r.engine
        .start(StartOptions::new().resume_from("b"))
        .print_at("a", "first")
        .print_at("b", "second")
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            ChainEvent::ChainStarted {
                resume_from: Some("b".into())
            },
            ChainEvent::StepSkipped {
                mark: Some("a".into()),
                kind: StepKind::Print,
            },
            ChainEvent::StepStarted {
                mark: Some("b".into()),
                kind: StepKind::Print,
            },
            ChainEvent::StepCompleted {
                mark: Some("b".into()),
                kind: StepKind::Print,
            },
        ]
    );
}
