//! Per-service outcome set returned by every pipeline call.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Descriptor, FailureKind, RunId, Stage, StageFailure, StageOutcome};
use crate::observability::StageCounts;
use crate::signal::Signals;

use super::slot_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub name: String,
    pub image: String,
    pub stages: BTreeMap<Stage, StageOutcome>,
}

impl ServiceReport {
    pub fn is_success(&self) -> bool {
        self.stages.values().all(StageOutcome::is_success)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.get(&stage)
    }

    /// Failed stages in pipeline order.
    pub fn failures(&self) -> impl Iterator<Item = (Stage, &StageFailure)> {
        self.stages
            .iter()
            .filter_map(|(stage, outcome)| outcome.failure_detail().map(|f| (*stage, f)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub services: Vec<ServiceReport>,
}

impl PipelineReport {
    /// Read every slot of the finished run. All tasks have been joined, so
    /// each read returns immediately.
    pub(crate) async fn collect(
        run_id: RunId,
        descriptor: &Descriptor,
        stages: &[Stage],
        signals: &Signals,
    ) -> Self {
        let mut services = Vec::with_capacity(descriptor.microservices.len());
        for service in &descriptor.microservices {
            let mut outcomes = BTreeMap::new();
            for &stage in stages {
                let outcome = signals
                    .peek(stage, slot_key(stage, service))
                    .await
                    .unwrap_or_else(|| {
                        StageOutcome::failure(FailureKind::Abandoned, "no result published")
                    });
                outcomes.insert(stage, outcome);
            }
            services.push(ServiceReport {
                name: service.name.clone(),
                image: service.image.clone(),
                stages: outcomes,
            });
        }
        Self { run_id, services }
    }

    /// True when every stage of every service succeeded.
    pub fn is_success(&self) -> bool {
        self.services.iter().all(ServiceReport::is_success)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn failed_services(&self) -> Vec<&ServiceReport> {
        self.services.iter().filter(|s| !s.is_success()).collect()
    }

    pub fn counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();
        for outcome in self.services.iter().flat_map(|s| s.stages.values()) {
            counts.record(outcome);
        }
        counts
    }
}
