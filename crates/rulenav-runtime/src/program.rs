#![forbid(unsafe_code)]

//! Elm-style runtime.
//!
//! The program owns a [`Model`], feeds it messages, executes the commands
//! it returns and keeps its declared subscriptions running. All model
//! mutation happens on the thread that drives the program; subscriptions
//! and background tasks only ever talk to it through a channel.
//!
//! # Example
//!
//! ```
//! use rulenav_runtime::program::{Cmd, Model, Program, ProgramConfig};
//!
//! struct Counter {
//!     count: i32,
//! }
//!
//! enum Msg {
//!     Increment,
//! }
//!
//! impl Model for Counter {
//!     type Message = Msg;
//!     type View = i32;
//!
//!     fn update(&mut self, msg: Msg) -> Cmd<Msg> {
//!         match msg {
//!             Msg::Increment => self.count += 1,
//!         }
//!         Cmd::none()
//!     }
//!
//!     fn view(&self) -> i32 {
//!         self.count
//!     }
//! }
//!
//! let mut program = Program::new(Counter { count: 0 }, ProgramConfig::inline());
//! program.start();
//! program.dispatch(Msg::Increment);
//! assert_eq!(program.view(), 1);
//! ```

use crate::subscription::{Subscription, SubscriptionManager};
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use web_time::Instant;

/// The Model trait defines application state and behavior.
pub trait Model: Sized {
    /// Messages that drive state transitions.
    type Message: Send + 'static;

    /// What a renderer consumes.
    type View;

    /// Called once when the program starts. Return commands for initial
    /// side effects like loading data.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Update the model in response to a message.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;

    /// Subscriptions that should currently be running.
    fn subscriptions(&self) -> Vec<Box<dyn Subscription<Self::Message>>> {
        Vec::new()
    }

    /// Derive the render input from current state.
    fn view(&self) -> Self::View;
}

/// Description of a task for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
}

impl TaskSpec {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

/// Work producing a message, run off the model thread.
pub type TaskFn<M> = Box<dyn FnOnce() -> M + Send>;

/// Commands represent side effects to be executed by the program.
pub enum Cmd<M> {
    /// No operation.
    None,
    /// Execute several commands in order.
    Batch(Vec<Cmd<M>>),
    /// Feed a message straight back into `update`.
    Msg(M),
    /// Run a task; its result is delivered as a message.
    Task(TaskSpec, TaskFn<M>),
}

impl<M> Cmd<M> {
    /// Create a no-op command.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a message command.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    /// Create a task command.
    pub fn task(spec: TaskSpec, f: impl FnOnce() -> M + Send + 'static) -> Self {
        Self::Task(spec, Box::new(f))
    }

    /// Create a batch of commands, collapsing trivial batches.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Whether this is a no-op.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl<M> Default for Cmd<M> {
    fn default() -> Self {
        Self::None
    }
}

impl<M: fmt::Debug> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Task(spec, _) => f.debug_tuple("Task").field(&spec.name).finish(),
        }
    }
}

/// Where `Cmd::Task` closures run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum TaskMode {
    /// On a worker thread per task.
    #[default]
    Background,
    /// Synchronously, queuing the result for the next pump.
    Inline,
}

/// Configuration for the program.
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    /// Where tasks run.
    pub task_mode: TaskMode,
    /// How long a blocking wait sleeps before re-checking state.
    pub poll_timeout: Duration,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            task_mode: TaskMode::Background,
            poll_timeout: Duration::from_millis(50),
        }
    }
}

impl ProgramConfig {
    /// Tasks on worker threads.
    pub fn background() -> Self {
        Self::default()
    }

    /// Tasks executed synchronously.
    pub fn inline() -> Self {
        Self {
            task_mode: TaskMode::Inline,
            ..Self::default()
        }
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

/// Decrements the in-flight counter once a background task has delivered.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The program runtime that drives a model.
pub struct Program<M: Model> {
    model: M,
    config: ProgramConfig,
    subscriptions: SubscriptionManager<M::Message>,
    /// Results of inline tasks, waiting for the next pump.
    queue: VecDeque<M::Message>,
    in_flight: Arc<AtomicUsize>,
    running: bool,
    dirty: bool,
}

impl<M: Model> Program<M> {
    /// Create a program around `model`. Nothing runs until [`start`](Self::start).
    pub fn new(model: M, config: ProgramConfig) -> Self {
        Self {
            model,
            config,
            subscriptions: SubscriptionManager::new(),
            queue: VecDeque::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            running: false,
            dirty: true,
        }
    }

    /// Start subscriptions, then run the model's init commands.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.reconcile();
        let cmd = self.model.init();
        self.execute(cmd);
        self.reconcile();
    }

    /// Apply one message.
    pub fn dispatch(&mut self, msg: M::Message) {
        if !self.running {
            return;
        }
        let cmd = self.model.update(msg);
        self.dirty = true;
        self.execute(cmd);
        self.reconcile();
    }

    /// Apply every message already delivered. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while self.running {
            let Some(msg) = self
                .queue
                .pop_front()
                .or_else(|| self.subscriptions.try_recv())
            else {
                break;
            };
            self.dispatch(msg);
            applied += 1;
        }
        applied
    }

    /// Pump until no task is in flight and nothing is queued.
    ///
    /// Returns `false` if `timeout` elapsed first. Subscriptions are
    /// long-lived and do not count as pending work.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                // A task that finished after the last pump left its message behind.
                if self.pump() == 0 {
                    return true;
                }
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = self.config.poll_timeout.min(deadline - now);
            if let Some(msg) = self.subscriptions.recv_timeout(wait) {
                self.dispatch(msg);
            }
        }
    }

    /// Pump until `done` holds for the model or `timeout` elapses.
    pub fn run_until(&mut self, timeout: Duration, mut done: impl FnMut(&M) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(&self.model) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || !self.running {
                return false;
            }
            let wait = self.config.poll_timeout.min(deadline - now);
            if let Some(msg) = self.subscriptions.recv_timeout(wait) {
                self.dispatch(msg);
            }
        }
    }

    /// Main loop: hand each fresh view to `frame` until it breaks.
    ///
    /// A view is produced on start and after any batch of updates.
    pub fn run(&mut self, mut frame: impl FnMut(&M::View) -> ControlFlow<()>) {
        self.start();
        while self.running {
            self.pump();
            if self.dirty {
                let view = self.view();
                if frame(&view).is_break() {
                    break;
                }
            }
            if let Some(msg) = self.subscriptions.recv_timeout(self.config.poll_timeout) {
                self.dispatch(msg);
            }
        }
        self.shutdown();
    }

    /// Render input for the current state. Clears the dirty flag.
    pub fn view(&mut self) -> M::View {
        self.dirty = false;
        self.model.view()
    }

    /// Whether state changed since the last [`view`](Self::view).
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stop subscriptions and drop undelivered results.
    ///
    /// Background tasks still running finish on their own; their results
    /// are never applied.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.subscriptions.stop_all();
        self.queue.clear();
        while self.subscriptions.try_recv().is_some() {}
        tracing::debug!(
            in_flight = self.in_flight.load(Ordering::Acquire),
            "program.shutdown"
        );
    }

    /// Number of background tasks not yet delivered.
    #[must_use]
    pub fn tasks_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of running subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.active_count()
    }

    /// Get a reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the model. Marks the view dirty.
    pub fn model_mut(&mut self) -> &mut M {
        self.dirty = true;
        &mut self.model
    }

    /// Check if the program is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn reconcile(&mut self) {
        let subs = if self.running {
            self.model.subscriptions()
        } else {
            Vec::new()
        };
        self.subscriptions.reconcile(subs);
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Msg(m) => {
                let cmd = self.model.update(m);
                self.dirty = true;
                self.execute(cmd);
            }
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute(c);
                }
            }
            Cmd::Task(spec, f) => self.spawn_task(spec, f),
        }
    }

    fn spawn_task(&mut self, spec: TaskSpec, f: TaskFn<M::Message>) {
        tracing::trace!(task = spec.name, mode = ?self.config.task_mode, "task.start");
        match self.config.task_mode {
            TaskMode::Inline => self.queue.push_back(f()),
            TaskMode::Background => {
                self.in_flight.fetch_add(1, Ordering::AcqRel);
                let guard = InFlight(Arc::clone(&self.in_flight));
                let sender = self.subscriptions.sender();
                thread::spawn(move || {
                    let _guard = guard;
                    // Fails only when the program is gone; the result is dropped.
                    let _ = sender.send(f());
                });
            }
        }
    }
}

impl<M: Model> Drop for Program<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<M: Model + fmt::Debug> fmt::Debug for Program<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("model", &self.model)
            .field("config", &self.config)
            .field("running", &self.running)
            .field("dirty", &self.dirty)
            .field("queued", &self.queue.len())
            .field("in_flight", &self.tasks_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::MockSubscription;

    struct TestModel {
        value: i32,
        with_sub: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestMsg {
        Increment,
        Add(i32),
        Spawn(i32),
        Chain,
    }

    impl Model for TestModel {
        type Message = TestMsg;
        type View = i32;

        fn init(&mut self) -> Cmd<TestMsg> {
            Cmd::msg(TestMsg::Increment)
        }

        fn update(&mut self, msg: TestMsg) -> Cmd<TestMsg> {
            match msg {
                TestMsg::Increment => {
                    self.value += 1;
                    Cmd::none()
                }
                TestMsg::Add(n) => {
                    self.value += n;
                    Cmd::none()
                }
                TestMsg::Spawn(n) => Cmd::task(TaskSpec::new("add"), move || TestMsg::Add(n)),
                TestMsg::Chain => Cmd::batch(vec![
                    Cmd::msg(TestMsg::Increment),
                    Cmd::none(),
                    Cmd::msg(TestMsg::Increment),
                ]),
            }
        }

        fn subscriptions(&self) -> Vec<Box<dyn Subscription<TestMsg>>> {
            if self.with_sub {
                vec![Box::new(MockSubscription::new(1, vec![TestMsg::Add(100)]))]
            } else {
                Vec::new()
            }
        }

        fn view(&self) -> i32 {
            self.value
        }
    }

    fn model() -> TestModel {
        TestModel {
            value: 0,
            with_sub: false,
        }
    }

    #[test]
    fn cmd_batch_collapses() {
        assert!(Cmd::<TestMsg>::batch(vec![]).is_none());
        assert!(Cmd::<TestMsg>::batch(vec![Cmd::none(), Cmd::none()]).is_none());
        assert!(matches!(
            Cmd::batch(vec![Cmd::none(), Cmd::msg(TestMsg::Increment)]),
            Cmd::Msg(TestMsg::Increment)
        ));
        assert!(matches!(
            Cmd::batch(vec![Cmd::msg(TestMsg::Increment), Cmd::msg(TestMsg::Increment)]),
            Cmd::Batch(_)
        ));
    }

    #[test]
    fn cmd_debug_names_tasks() {
        let cmd = Cmd::task(TaskSpec::new("fetch"), || TestMsg::Increment);
        assert_eq!(format!("{cmd:?}"), "Task(\"fetch\")");
    }

    #[test]
    fn program_config_defaults() {
        let config = ProgramConfig::default();
        assert_eq!(config.task_mode, TaskMode::Background);
        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert_eq!(ProgramConfig::inline().task_mode, TaskMode::Inline);
        let tuned = ProgramConfig::background().with_poll_timeout(Duration::from_millis(5));
        assert_eq!(tuned.poll_timeout, Duration::from_millis(5));
    }

    #[test]
    fn start_runs_init() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        assert!(!program.is_running());
        program.start();
        assert!(program.is_running());
        assert_eq!(program.model().value, 1);
    }

    #[test]
    fn dispatch_before_start_is_ignored() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        program.dispatch(TestMsg::Increment);
        assert_eq!(program.model().value, 0);
    }

    #[test]
    fn batch_runs_in_order() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        program.start();
        program.dispatch(TestMsg::Chain);
        assert_eq!(program.model().value, 3);
    }

    #[test]
    fn inline_tasks_apply_on_pump() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        program.start();
        program.dispatch(TestMsg::Spawn(5));
        assert_eq!(program.model().value, 1);
        assert_eq!(program.pump(), 1);
        assert_eq!(program.model().value, 6);
    }

    #[test]
    fn background_tasks_apply_after_wait() {
        let mut program = Program::new(model(), ProgramConfig::background());
        program.start();
        program.dispatch(TestMsg::Spawn(2));
        program.dispatch(TestMsg::Spawn(3));
        assert!(program.wait_idle(Duration::from_secs(2)));
        assert_eq!(program.model().value, 6);
        assert_eq!(program.tasks_in_flight(), 0);
    }

    #[test]
    fn subscription_messages_are_routed_through_update() {
        let mut program = Program::new(
            TestModel {
                value: 0,
                with_sub: true,
            },
            ProgramConfig::inline(),
        );
        program.start();
        assert_eq!(program.active_subscriptions(), 1);
        assert!(program.run_until(Duration::from_secs(2), |m| m.value == 101));
    }

    #[test]
    fn view_clears_dirty_flag() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        program.start();
        assert!(program.is_dirty());
        assert_eq!(program.view(), 1);
        assert!(!program.is_dirty());
        program.dispatch(TestMsg::Increment);
        assert!(program.is_dirty());
    }

    #[test]
    fn run_hands_views_to_frame_until_break() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        let mut seen = Vec::new();
        program.run(|view| {
            seen.push(*view);
            ControlFlow::Break(())
        });
        assert_eq!(seen, vec![1]);
        assert!(!program.is_running());
    }

    #[test]
    fn shutdown_drops_queued_results() {
        let mut program = Program::new(model(), ProgramConfig::inline());
        program.start();
        program.dispatch(TestMsg::Spawn(10));
        program.shutdown();
        assert_eq!(program.pump(), 0);
        assert_eq!(program.model().value, 1);
        assert_eq!(program.active_subscriptions(), 0);
    }
}
