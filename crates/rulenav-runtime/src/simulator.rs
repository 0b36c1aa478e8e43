#![forbid(unsafe_code)]

//! Deterministic, thread-free driver for models.
//!
//! [`ProgramSimulator`] applies messages synchronously and never starts
//! subscriptions; tests inject what a subscription would have delivered
//! with [`send`](ProgramSimulator::send). Tasks run inline by default. With
//! [`defer_tasks`](ProgramSimulator::defer_tasks) they are parked instead,
//! so a test can resolve overlapping requests in any order it likes.

use crate::program::{Cmd, Model, TaskFn, TaskSpec};
use std::collections::VecDeque;

/// Synchronous program driver for tests.
pub struct ProgramSimulator<M: Model> {
    model: M,
    deferred: bool,
    pending: VecDeque<(TaskSpec, TaskFn<M::Message>)>,
    updates: usize,
}

impl<M: Model> ProgramSimulator<M> {
    /// Wrap `model`. Call [`init`](Self::init) to run its startup commands.
    pub fn new(model: M) -> Self {
        Self {
            model,
            deferred: false,
            pending: VecDeque::new(),
            updates: 0,
        }
    }

    /// Park tasks until resolved explicitly.
    #[must_use]
    pub fn defer_tasks(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Run the model's init commands.
    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute(cmd);
    }

    /// Apply one message and everything it causes.
    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.updates += 1;
        self.execute(cmd);
    }

    /// Names of parked tasks, oldest first.
    #[must_use]
    pub fn pending_tasks(&self) -> Vec<&'static str> {
        self.pending.iter().map(|(spec, _)| spec.name).collect()
    }

    /// Resolve the parked task at `index`. Returns `false` if there is none.
    pub fn resolve_task(&mut self, index: usize) -> bool {
        let Some((_, task)) = self.pending.remove(index) else {
            return false;
        };
        let msg = task();
        self.send(msg);
        true
    }

    /// Resolve parked tasks oldest first until none remain.
    pub fn resolve_all(&mut self) -> usize {
        let mut resolved = 0;
        while self.resolve_task(0) {
            resolved += 1;
        }
        resolved
    }

    /// Current render input.
    pub fn view(&self) -> M::View {
        self.model.view()
    }

    /// Number of updates applied so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates
    }

    /// Get a reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Consume the simulator, returning the model.
    pub fn into_model(self) -> M {
        self.model
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Msg(m) => self.send(m),
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute(c);
                }
            }
            Cmd::Task(spec, task) => {
                if self.deferred {
                    self.pending.push_back((spec, task));
                } else {
                    let msg = task();
                    self.send(msg);
                }
            }
        }
    }
}
