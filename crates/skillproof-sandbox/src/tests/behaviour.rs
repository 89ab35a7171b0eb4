//! Behavioural tests for skill execution using `rstest-bdd`.

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::context::ExecutionOutcome;
use crate::tests::support::{TestWorld, named_script};

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

#[given("a stub-only sandbox")]
fn given_stub_only(#[from(world)] _world: &RefCell<TestWorld>) {}

#[given("a sandbox that forwards execution")]
fn given_forwarding(world: &RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.profile = world.profile.clone().allow_execution();
}

#[given("the skill script \"{name}\"")]
fn given_script(world: &RefCell<TestWorld>, name: String) {
    world.borrow_mut().source = Some(named_script(&name));
}

#[when("the skill runs with a timeout of {millis} milliseconds")]
fn when_skill_runs(world: &RefCell<TestWorld>, millis: u64) {
    world.borrow_mut().run(Duration::from_millis(millis));
}

#[then("the run completes")]
fn then_completes(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert_eq!(world.outcome, Some(ExecutionOutcome::Completed));
}

#[then("the run times out after {millis} milliseconds")]
fn then_times_out(world: &RefCell<TestWorld>, millis: u64) {
    let world = world.borrow();
    assert_eq!(
        world.outcome,
        Some(ExecutionOutcome::TimedOut { timeout_ms: millis })
    );
}

#[then("the run is disallowed")]
fn then_disallowed(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.outcome, Some(ExecutionOutcome::Disallowed { .. })),
        "expected a disallowed outcome, got {:?}",
        world.outcome
    );
}

#[then("the run fails with \"{text}\"")]
fn then_fails_with(world: &RefCell<TestWorld>, text: String) {
    let world = world.borrow();
    match &world.outcome {
        Some(ExecutionOutcome::RuntimeFailure { message }) => assert!(
            message.contains(&text),
            "failure message {message:?} does not mention {text:?}"
        ),
        other => panic!("expected a runtime failure, got {other:?}"),
    }
}

#[then("the observed mask is {bits}")]
fn then_mask_is(world: &RefCell<TestWorld>, bits: u8) {
    let world = world.borrow();
    assert_eq!(world.snapshot().mask.bits(), bits);
}

#[then("the audit log has {count} entries")]
fn then_log_length(world: &RefCell<TestWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.snapshot().entries.len(), count);
}

#[then("the audit log records operation \"{operation}\" on \"{facility}\"")]
fn then_log_records(world: &RefCell<TestWorld>, operation: String, facility: String) {
    let world = world.borrow();
    assert!(
        world
            .snapshot()
            .entries
            .iter()
            .any(|entry| entry.operation() == operation && entry.facility() == facility),
        "no entry for {facility}.{operation} in {:?}",
        world.snapshot().entries
    );
}

#[then("the skill directory has no file \"{file}\"")]
fn then_no_file(world: &RefCell<TestWorld>, file: String) {
    let world = world.borrow();
    let path = world.skill_dir.path().join(&file);
    assert!(!path.exists(), "stubbed call created {}", path.display());
}

#[scenario(path = "tests/features/sandbox.feature", name = "Stubbed file read is recorded")]
fn stubbed_file_read(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Environment reads are recorded and yield nothing")]
fn environment_read(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Path-based require is refused without recording")]
fn path_based_require(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Busy loops are preempted at the deadline")]
fn busy_loop(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Pending timers run after the body returns")]
fn deferred_timer(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Forwarded reads reach the skill directory")]
fn forwarded_read(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/sandbox.feature", name = "Attempts before a thrown error are kept")]
fn throw_after_write(world: RefCell<TestWorld>) {
    drop(world);
}
