//! Cooperative step scheduler.
//!
//! A [`Step`] is one resumable unit of multi-tick work: its `tick`
//! returns [`StepOutcome::Continue`] while work remains and
//! [`StepOutcome::Done`] when the unit is complete. The
//! [`StepSequencer`] runs steps strictly in order from an explicit
//! pending queue; the [`Scheduler`] advances at most one unit of work
//! per host tick and reports whether another tick is needed.
//!
//! Cancellation via [`Scheduler::clear`] drops the active step and the
//! queue immediately. It does not attempt a safe stop of any resource
//! a step was controlling; that responsibility belongs to the caller.

use std::collections::VecDeque;

use gantry_common::rig::Rig;
use tracing::{debug, trace};

use crate::error::SweepError;

/// Result of one step tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not done; call again next tick.
    Continue,
    /// This unit of work is complete. The sequencer may begin the next
    /// queued step within the same advance.
    Done,
}

/// One resumable unit of multi-tick work.
///
/// A step holds no state beyond its own cursor; it is owned
/// exclusively by the scheduler while active and discarded on
/// completion or cancellation. Failures propagate to the scheduler's
/// caller; there is no internal catch-and-retry.
pub trait Step {
    /// Step name for logging.
    fn name(&self) -> &'static str;

    /// Perform one unit of work against the rig.
    fn tick(&mut self, rig: &mut Rig) -> Result<StepOutcome, SweepError>;
}

/// An ordered list of steps, run front to back.
#[derive(Default)]
pub struct StepSequence {
    steps: VecDeque<Box<dyn Step>>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-step sequence.
    pub fn of(step: impl Step + 'static) -> Self {
        let mut seq = Self::new();
        seq.push(step);
        seq
    }

    /// Append one step at the back.
    pub fn push(&mut self, step: impl Step + 'static) {
        self.steps.push_back(Box::new(step));
    }

    /// Run `self` to completion, then `other`, in order. `other` never
    /// begins before the last step of `self` is observed exhausted.
    pub fn concat(mut self, other: StepSequence) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// Number of queued steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for StepSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSequence")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Runs steps strictly in order: at most one current step, the rest in
/// an explicit FIFO pending queue.
#[derive(Default)]
pub struct StepSequencer {
    current: Option<Box<dyn Step>>,
    pending: VecDeque<Box<dyn Step>>,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a sequence. If nothing is running it starts on the next
    /// advance; otherwise it runs after everything already queued —
    /// FIFO, never interleaved.
    pub fn append(&mut self, sequence: StepSequence) {
        self.pending.extend(sequence.steps);
    }

    /// Whether no current or queued work remains.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Perform one unit of work. Returns `Ok(true)` iff a step yielded;
    /// steps that complete without yielding chain straight into the
    /// next queued step within the same advance.
    pub fn advance(&mut self, rig: &mut Rig) -> Result<bool, SweepError> {
        loop {
            if self.current.is_none() {
                self.current = self.pending.pop_front();
            }
            let Some(step) = self.current.as_mut() else {
                return Ok(false);
            };
            trace!(step = step.name(), "sequencer advance");
            match step.tick(rig)? {
                StepOutcome::Continue => return Ok(true),
                StepOutcome::Done => {
                    debug!(step = step.name(), "step complete");
                    self.current = None;
                }
            }
        }
    }
}

impl std::fmt::Debug for StepSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSequencer")
            .field("running", &self.current.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Owns at most one sequencer and advances it by exactly one unit of
/// work per invocation, matching a one-call-per-tick host model.
#[derive(Debug, Default)]
pub struct Scheduler {
    sequencer: Option<StepSequencer>,
    resume: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a sequence, creating a fresh sequencer if the previous
    /// one finished.
    pub fn append(&mut self, sequence: StepSequence) {
        self.sequencer
            .get_or_insert_with(StepSequencer::new)
            .append(sequence);
    }

    /// Whether no work is scheduled.
    pub fn is_idle(&self) -> bool {
        self.sequencer
            .as_ref()
            .map_or(true, StepSequencer::is_exhausted)
    }

    /// True iff the last advance performed work and more remains.
    pub fn resume_requested(&self) -> bool {
        self.resume
    }

    /// Perform one unit of work. Returns `Ok(true)` iff work was done
    /// (the host should re-invoke next tick); drops the sequencer and
    /// returns `Ok(false)` once exhausted. A no-op returning `false`
    /// with nothing scheduled.
    ///
    /// On error the held sequencer is dropped; recovery is the
    /// caller's concern.
    pub fn advance(&mut self, rig: &mut Rig) -> Result<bool, SweepError> {
        let Some(sequencer) = self.sequencer.as_mut() else {
            self.resume = false;
            return Ok(false);
        };
        match sequencer.advance(rig) {
            Ok(true) => {
                self.resume = true;
                Ok(true)
            }
            Ok(false) => {
                self.sequencer = None;
                self.resume = false;
                Ok(false)
            }
            Err(e) => {
                self.sequencer = None;
                self.resume = false;
                Err(e)
            }
        }
    }

    /// Cancel current and queued work immediately. Takes effect at the
    /// next advance boundary; never interrupts an in-progress unit.
    pub fn clear(&mut self) {
        self.sequencer = None;
        self.resume = false;
    }
}
