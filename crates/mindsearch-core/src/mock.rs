use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::agent::{Agent, AgentInput, StepIter};
use crate::error::AgentError;
use crate::event::StepEvent;

/// How a scripted run ends once its steps are used up.
#[derive(Debug, Clone)]
pub enum ScriptEnd {
    /// Iterator returns `None`.
    Exhaust,
    /// Iterator yields an error.
    Fail(AgentError),
    /// Producer panics with the given message.
    Panic(String),
    /// Producer blocks for the given time, then returns `None`.
    Stall(Duration),
    /// Producer repeats the last step forever.
    Repeat,
}

/// Observes a scripted run from the test side.
#[derive(Debug, Clone, Default)]
pub struct ScriptProbe {
    pulled: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl ScriptProbe {
    /// Number of items the consumer has pulled from the iterator.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// True once the iterator has been dropped by the worker.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Agent that replays a fixed list of steps, for tests and demos.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    steps: Vec<StepEvent>,
    end: ScriptEnd,
    delay: Duration,
    probe: ScriptProbe,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<StepEvent>) -> Self {
        Self {
            steps,
            end: ScriptEnd::Exhaust,
            delay: Duration::ZERO,
            probe: ScriptProbe::default(),
        }
    }

    pub fn ending(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    /// Block for `delay` before every step.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probe(&self) -> ScriptProbe {
        self.probe.clone()
    }
}

impl Agent for ScriptedAgent {
    fn stream_chat(&self, _input: AgentInput) -> StepIter {
        Box::new(ScriptIter {
            steps: self.steps.iter().cloned().collect(),
            last: None,
            end: Some(self.end.clone()),
            delay: self.delay,
            probe: self.probe.clone(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptIter {
    steps: VecDeque<StepEvent>,
    last: Option<StepEvent>,
    end: Option<ScriptEnd>,
    delay: Duration,
    probe: ScriptProbe,
}

impl Iterator for ScriptIter {
    type Item = Result<StepEvent, AgentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(step) = self.steps.pop_front() {
            self.probe.pulled.fetch_add(1, Ordering::SeqCst);
            self.last = Some(step.clone());
            return Some(Ok(step));
        }

        match self.end.take() {
            None | Some(ScriptEnd::Exhaust) => None,
            Some(ScriptEnd::Fail(err)) => Some(Err(err)),
            Some(ScriptEnd::Panic(msg)) => panic!("{msg}"),
            Some(ScriptEnd::Stall(duration)) => {
                std::thread::sleep(duration);
                None
            }
            Some(ScriptEnd::Repeat) => {
                self.end = Some(ScriptEnd::Repeat);
                let step = self.last.clone()?;
                self.probe.pulled.fetch_add(1, Ordering::SeqCst);
                Some(Ok(step))
            }
        }
    }
}

impl Drop for ScriptIter {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}
