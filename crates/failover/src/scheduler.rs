//! Main monitoring loop.

use crate::actuator::{FailoverActuator, FireOutcome};
use crate::state::ServiceState;
use crate::types::{MonitorSettings, ServiceSpec, TransitionEvent, find_duplicate};
use common::narrate;
use futures::future::join_all;
use healthcheck::{Endpoint, Prober, RetryPolicy, RetryingProbe};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// Settings plus the state of every monitored service
pub struct MonitorContext {
    settings: MonitorSettings,
    /// Configured order
    states: Vec<ServiceState>,
    index: HashMap<Endpoint, usize>,
}

impl MonitorContext {
    /// Create a context with every service OK.
    ///
    /// Fails on an empty service list or a repeated endpoint.
    pub fn new(settings: MonitorSettings, services: Vec<ServiceSpec>) -> common::Result<Self> {
        if services.is_empty() {
            return Err(common::Error::config("no services configured"));
        }
        if let Some(endpoint) = find_duplicate(&services) {
            return Err(common::Error::config(format!(
                "service endpoint {} is configured more than once",
                endpoint
            )));
        }

        let index = services
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.endpoint.clone(), i))
            .collect();
        let states = services.into_iter().map(ServiceState::new).collect();

        Ok(Self {
            settings,
            states,
            index,
        })
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Service states in configured order
    pub fn states(&self) -> &[ServiceState] {
        &self.states
    }

    /// Look up a service by endpoint
    pub fn state(&self, endpoint: &Endpoint) -> Option<&ServiceState> {
        self.index.get(endpoint).map(|&i| &self.states[i])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Result of one pass over all services
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Services probed
    pub probed: usize,

    /// Transitions and what firing them did, in completion order
    pub transitions: Vec<(TransitionEvent, FireOutcome)>,
}

/// Drives probing, transitions and actions
pub struct Scheduler {
    context: MonitorContext,
    probe: RetryingProbe,
    actuator: FailoverActuator,
}

impl Scheduler {
    pub fn new(
        context: MonitorContext,
        prober: Arc<dyn Prober>,
        actuator: FailoverActuator,
    ) -> common::Result<Self> {
        let settings = context.settings();
        let policy = RetryPolicy::new(
            settings.probe_timeout,
            settings.retries,
            settings.retry_delay,
        )?;
        let probe = RetryingProbe::new(prober, policy).with_narration(settings.dry_run);

        Ok(Self {
            context,
            probe,
            actuator,
        })
    }

    pub fn context(&self) -> &MonitorContext {
        &self.context
    }

    /// Run forever, sleeping `loop_interval` after each cycle ends
    pub async fn run(&mut self) {
        let settings = self.context.settings();
        info!(
            services = self.context.len(),
            concurrent = settings.concurrent,
            dry_run = settings.dry_run,
            loop_interval = ?settings.loop_interval,
            worst_case_check = ?self.probe.policy().worst_case(),
            "Scheduler started"
        );

        loop {
            let report = self.run_cycle().await;
            let interval = self.context.settings().loop_interval;
            narrate!(
                self.actuator.is_dry_run(),
                probed = report.probed,
                transitions = report.transitions.len(),
                "Going to sleep for {:?} before looping through the services again",
                interval
            );
            sleep(interval).await;
        }
    }

    /// Probe every service once and fire any resulting actions
    pub async fn run_cycle(&mut self) -> CycleReport {
        let Self {
            context,
            probe,
            actuator,
        } = self;
        let probe: &RetryingProbe = probe;
        let actuator: &FailoverActuator = actuator;

        let results: Vec<Option<(TransitionEvent, FireOutcome)>> =
            if context.settings.concurrent {
                // Each future holds the only mutable borrow of its service
                join_all(
                    context
                        .states
                        .iter_mut()
                        .map(|state| process(probe, actuator, state)),
                )
                .await
            } else {
                let mut results = Vec::with_capacity(context.states.len());
                for state in context.states.iter_mut() {
                    results.push(process(probe, actuator, state).await);
                }
                results
            };

        CycleReport {
            probed: results.len(),
            transitions: results.into_iter().flatten().collect(),
        }
    }
}

/// Check one service, update its state and fire for a transition.
///
/// Transition and fire complete before the state can be borrowed again, so a
/// recovery can never overtake the failure it follows.
async fn process(
    probe: &RetryingProbe,
    actuator: &FailoverActuator,
    state: &mut ServiceState,
) -> Option<(TransitionEvent, FireOutcome)> {
    let reachable = probe.check(&state.spec().endpoint).await;
    let loud = actuator.is_dry_run();

    let Some(event) = state.transition(reachable) else {
        let spec = state.spec();
        let host = &spec.endpoint.host;
        if reachable {
            narrate!(loud, service = %spec.name, %host, "The host is REACHABLE");
        } else {
            narrate!(loud, service = %spec.name, %host, "The host has FAILED again");
        }
        return None;
    };

    debug!(
        service = %event.spec.name,
        endpoint = %event.spec.endpoint,
        kind = %event.kind,
        health = %state.health(),
        "Service state changed"
    );

    let outcome = actuator.fire(&event).await;
    Some((event, outcome))
}
