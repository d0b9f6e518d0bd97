//! The common interface every workflow state machine implements (spec §4.7,
//! §9 redesign note: "model workflows as values behind a common interface
//! ... the engine holds a map from intent to interface value"). The portal
//! appointment workflow is a second concrete value behind this same trait,
//! not a subclass.

use async_trait::async_trait;
use careline_core::{Entities, Intent, WorkflowResult};

use crate::context::WorkflowContext;

/// A named state machine that collects entities for a class of requests
/// and issues backend calls (spec glossary).
#[async_trait]
pub trait Workflow: Send + Sync {
    /// The intents this workflow instance is registered against in the
    /// engine's intent→workflow map.
    fn supported_intents(&self) -> &'static [Intent];

    /// Start (or restart) this workflow for a freshly classified `intent`.
    /// `raw_text` is the caller's verbatim utterance, needed by steps that
    /// match against it directly rather than against classified entities
    /// (doctor-name selection, portal affirmation detection).
    async fn execute(
        &self,
        intent: Intent,
        turn_entities: &Entities,
        raw_text: &str,
        ctx: &WorkflowContext<'_>,
    ) -> WorkflowResult;

    /// Advance an already-active instance of this workflow. The default
    /// implementation mirrors the Python original's `BaseWorkflow`: it
    /// simply re-enters `execute` with the workflow's first supported
    /// intent and the merged entity bag, ignoring the confirmation/denial
    /// flags. Workflows with their own step machinery (registration,
    /// both appointment-booking variants) override this.
    async fn continue_workflow(
        &self,
        _new_entities: &Entities,
        all_entities: &Entities,
        raw_text: &str,
        ctx: &WorkflowContext<'_>,
        _is_confirmation: bool,
        _is_denial: bool,
    ) -> WorkflowResult {
        self.execute(self.supported_intents()[0], all_entities, raw_text, ctx).await
    }
}
