//! Edge-triggered per-service state.
//!
//! State transitions:
//! - OK   + reachable   → OK   (nothing)
//! - OK   + unreachable → DOWN (failure action)
//! - DOWN + reachable   → OK   (recovery action)
//! - DOWN + unreachable → DOWN (nothing)

use crate::types::{Health, ServiceSpec, TransitionEvent, TransitionKind};

/// Failure tracking for one service
#[derive(Debug, Clone)]
pub struct ServiceState {
    spec: ServiceSpec,
    failed: bool,
}

impl ServiceState {
    /// Every service starts OK
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            failed: false,
        }
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    /// True once the failure action has fired and no recovery has followed
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn health(&self) -> Health {
        if self.failed { Health::Down } else { Health::Ok }
    }

    /// Feed a verdict and return the event to act on, if the state changed.
    pub fn transition(&mut self, reachable: bool) -> Option<TransitionEvent> {
        let kind = match (self.failed, reachable) {
            (false, false) => TransitionKind::Failure,
            (true, true) => TransitionKind::Recovery,
            (false, true) | (true, false) => return None,
        };

        self.failed = kind == TransitionKind::Failure;
        Some(TransitionEvent::new(self.spec.clone(), kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ServiceState {
        ServiceState::new(ServiceSpec::new(
            "Google",
            "www.google.com",
            80,
            "Google-failure",
            "Google-failback",
        ))
    }

    /// Feed verdicts and collect the kinds of every event produced
    fn run(state: &mut ServiceState, verdicts: &[bool]) -> Vec<TransitionKind> {
        verdicts
            .iter()
            .filter_map(|&v| state.transition(v).map(|e| e.kind))
            .collect()
    }

    #[test]
    fn test_initial_state_is_ok() {
        let state = state();
        assert!(!state.is_failed());
        assert_eq!(state.health(), Health::Ok);
    }

    #[test]
    fn test_transition_table() {
        let mut s = state();
        assert!(s.transition(true).is_none());
        assert_eq!(s.health(), Health::Ok);

        let event = s.transition(false).unwrap();
        assert_eq!(event.kind, TransitionKind::Failure);
        assert_eq!(event.spec.name, "Google");
        assert_eq!(s.health(), Health::Down);

        assert!(s.transition(false).is_none());
        assert_eq!(s.health(), Health::Down);

        let event = s.transition(true).unwrap();
        assert_eq!(event.kind, TransitionKind::Recovery);
        assert_eq!(s.health(), Health::Ok);
    }

    #[test]
    fn test_repeated_failures_fire_once() {
        let mut s = state();
        let kinds = run(&mut s, &[false, false, false]);
        assert_eq!(kinds, vec![TransitionKind::Failure]);
    }

    #[test]
    fn test_recovery_fires_once() {
        let mut s = state();
        s.transition(false);
        assert!(s.is_failed());

        let kinds = run(&mut s, &[true, true]);
        assert_eq!(kinds, vec![TransitionKind::Recovery]);
        assert!(!s.is_failed());
    }

    #[test]
    fn test_one_action_per_run_of_verdicts() {
        // Every verdict sequence up to length 10
        for len in 0..=10u32 {
            for bits in 0..(1u32 << len) {
                let verdicts: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                let mut s = state();
                let kinds = run(&mut s, &verdicts);

                let mut expected = Vec::new();
                let mut down = false;
                for (i, &v) in verdicts.iter().enumerate() {
                    let run_start = i == 0 || verdicts[i - 1] != v;
                    if run_start && !v && !down {
                        expected.push(TransitionKind::Failure);
                        down = true;
                    } else if run_start && v && down {
                        expected.push(TransitionKind::Recovery);
                        down = false;
                    }
                }

                assert_eq!(kinds, expected, "verdicts {:?}", verdicts);
                // Failures and recoveries alternate, starting with a failure
                for (i, kind) in kinds.iter().enumerate() {
                    let want = if i % 2 == 0 {
                        TransitionKind::Failure
                    } else {
                        TransitionKind::Recovery
                    };
                    assert_eq!(*kind, want);
                }
                assert_eq!(s.is_failed(), kinds.len() % 2 == 1);
            }
        }
    }
}
