use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::workflow::steps::{StepAction, StepMetadata, StepTransition, WorkflowStep};

pub trait StepSequence {
    fn name(&self) -> &'static str;
    fn steps(&self) -> &[WorkflowStep];

    fn actions_on_enter(&self, step: WorkflowStep) -> Vec<StepAction> {
        let mut actions = vec![StepAction::RecalculateEstimate];
        match step {
            WorkflowStep::Confirmation => actions.push(StepAction::RequestBookingConfirmation),
            WorkflowStep::ExpertCallScheduling => actions.push(StepAction::OfferExpertCall),
            _ => {}
        }
        actions
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BookingCreationSequence;

impl StepSequence for BookingCreationSequence {
    fn name(&self) -> &'static str {
        "booking_creation"
    }

    fn steps(&self) -> &[WorkflowStep] {
        &WorkflowStep::ALL
    }
}

/// Stateless navigation over a step sequence. Callers own the current step.
#[derive(Clone, Debug, Default)]
pub struct WorkflowStepTracker<S = BookingCreationSequence> {
    sequence: S,
}

impl<S> WorkflowStepTracker<S>
where
    S: StepSequence,
{
    pub fn new(sequence: S) -> Self {
        Self { sequence }
    }

    pub fn sequence_name(&self) -> &'static str {
        self.sequence.name()
    }

    pub fn first_step(&self) -> Option<WorkflowStep> {
        self.sequence.steps().first().copied()
    }

    pub fn all_steps(&self) -> Vec<StepMetadata> {
        self.sequence.steps().iter().map(WorkflowStep::metadata).collect()
    }

    pub fn next_step(&self, step: WorkflowStep) -> Option<WorkflowStep> {
        let index = self.position(step)?;
        self.sequence.steps().get(index + 1).copied()
    }

    pub fn previous_step(&self, step: WorkflowStep) -> Option<WorkflowStep> {
        let index = self.position(step)?;
        index.checked_sub(1).and_then(|previous| self.sequence.steps().get(previous)).copied()
    }

    pub fn step_metadata(&self, step: WorkflowStep) -> StepMetadata {
        step.metadata()
    }

    /// Share of the sequence completed once `step` is reached, in whole percent.
    pub fn progress_percent(&self, step: WorkflowStep) -> Option<u8> {
        let index = self.position(step)?;
        let total = self.sequence.steps().len();
        u8::try_from((index + 1) * 100 / total).ok()
    }

    pub fn advance(&self, step: WorkflowStep) -> Option<StepTransition> {
        let to = self.next_step(step)?;
        Some(StepTransition { from: step, to, actions: self.sequence.actions_on_enter(to) })
    }

    pub fn retreat(&self, step: WorkflowStep) -> Option<StepTransition> {
        let to = self.previous_step(step)?;
        Some(StepTransition { from: step, to, actions: self.sequence.actions_on_enter(to) })
    }

    pub fn advance_with_audit<A>(
        &self,
        step: WorkflowStep,
        sink: &A,
        audit: &AuditContext,
    ) -> Option<StepTransition>
    where
        A: AuditSink + ?Sized,
    {
        let transition = self.advance(step);
        let event = match &transition {
            Some(moved) => AuditEvent::from_context(
                audit,
                "workflow.step_advanced",
                AuditCategory::Workflow,
                AuditOutcome::Success,
            )
            .with_metadata("from", moved.from.slug())
            .with_metadata("to", moved.to.slug()),
            None => AuditEvent::from_context(
                audit,
                "workflow.step_boundary",
                AuditCategory::Workflow,
                AuditOutcome::Rejected,
            )
            .with_metadata("from", step.slug()),
        };
        sink.emit(event.with_metadata("sequence", self.sequence.name()));
        transition
    }

    fn position(&self, step: WorkflowStep) -> Option<usize> {
        self.sequence.steps().iter().position(|candidate| *candidate == step)
    }
}
