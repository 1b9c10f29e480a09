// Per-job phase state machine
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Submitting,
    Polling,
    Completing,
    Done,
    Failing,
    Failed,
    /// Re-fetching a past job's results from history, skipping upload and polling
    FetchingPastResult,
}

impl JobPhase {
    /// Allowed edges. Any phase may be reset to `Idle`; `Failed` allows nothing else.
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;

        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Submitting)
                | (Idle, FetchingPastResult)
                | (Submitting, Polling)
                | (Submitting, Failing)
                | (Polling, Completing)
                | (Polling, Failing)
                | (Completing, Done)
                | (Completing, Failing)
                | (FetchingPastResult, Done)
                | (FetchingPastResult, Failing)
                | (Failing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }

    /// A job is in flight and owns the processing screen
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            JobPhase::Submitting
                | JobPhase::Polling
                | JobPhase::Completing
                | JobPhase::FetchingPastResult
        )
    }
}
