//! The decision gate: where a suspended module loop waits for the user.

use super::RetryDecision;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

/// What a suspended loop receives when its gate fires.
///
/// A user decision and a user cancellation are distinct: cancellation
/// must end the run, never fall through to skip-and-continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// The user resolved the suspension with a decision.
    Decision(RetryDecision),
    /// The user cancelled the run while it was suspended.
    Cancelled,
}

/// One pending retry decision per project.
///
/// The orchestrator arms the gate before emitting a `waiting_retry`
/// snapshot, then awaits the receiver; `resolve` is the command surface
/// the UI calls and `cancel` is how a user stop reaches a suspended
/// loop. Arming again replaces an earlier pending gate (the stale
/// receiver observes a closed channel and is treated as a skip).
#[derive(Debug, Default)]
pub struct DecisionGate {
    pending: DashMap<Uuid, oneshot::Sender<GateSignal>>,
}

impl DecisionGate {
    /// Creates an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the gate for a project and returns the receiver to await.
    pub fn arm(&self, project_id: Uuid) -> oneshot::Receiver<GateSignal> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(project_id, tx);
        rx
    }

    /// Resolves a pending decision. Returns false if none was pending
    /// (the command is ignored, matching accept-or-ignore semantics).
    pub fn resolve(&self, project_id: Uuid, decision: RetryDecision) -> bool {
        match self.pending.remove(&project_id) {
            Some((_, tx)) => tx.send(GateSignal::Decision(decision)).is_ok(),
            None => false,
        }
    }

    /// Fires a pending gate with the cancellation signal, if any.
    pub fn cancel(&self, project_id: Uuid) {
        if let Some((_, tx)) = self.pending.remove(&project_id) {
            let _ = tx.send(GateSignal::Cancelled);
        }
    }

    /// Fires every pending gate with the cancellation signal.
    pub fn cancel_all(&self) {
        let ids: Vec<Uuid> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Returns true if a decision is pending for the project.
    #[must_use]
    pub fn is_pending(&self, project_id: Uuid) -> bool {
        self.pending.contains_key(&project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_arm_and_resolve() {
        let gate = DecisionGate::new();
        let project = Uuid::new_v4();

        let rx = gate.arm(project);
        assert!(gate.is_pending(project));

        assert!(gate.resolve(project, RetryDecision::Retry));
        assert_eq!(rx.await.unwrap(), GateSignal::Decision(RetryDecision::Retry));
        assert!(!gate.is_pending(project));
    }

    #[test]
    fn test_resolve_without_pending_is_ignored() {
        let gate = DecisionGate::new();
        assert!(!gate.resolve(Uuid::new_v4(), RetryDecision::Skip));
    }

    #[tokio::test]
    async fn test_rearm_closes_stale_receiver() {
        let gate = DecisionGate::new();
        let project = Uuid::new_v4();

        let stale = gate.arm(project);
        let fresh = gate.arm(project);

        assert!(stale.await.is_err());

        gate.resolve(project, RetryDecision::Skip);
        assert_eq!(fresh.await.unwrap(), GateSignal::Decision(RetryDecision::Skip));
    }

    #[tokio::test]
    async fn test_cancel_fires_pending_gate() {
        let gate = DecisionGate::new();
        let project = Uuid::new_v4();

        let rx = gate.arm(project);
        gate.cancel(project);

        assert!(!gate.is_pending(project));
        assert_eq!(rx.await.unwrap(), GateSignal::Cancelled);
    }

    #[test]
    fn test_cancel_without_pending_is_ignored() {
        let gate = DecisionGate::new();
        gate.cancel(Uuid::new_v4());
    }

    #[tokio::test]
    async fn test_cancel_all_fires_every_gate() {
        let gate = DecisionGate::new();
        let a = gate.arm(Uuid::new_v4());
        let b = gate.arm(Uuid::new_v4());

        gate.cancel_all();
        assert_eq!(a.await.unwrap(), GateSignal::Cancelled);
        assert_eq!(b.await.unwrap(), GateSignal::Cancelled);
    }
}
