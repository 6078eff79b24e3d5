//! Coordinator - サービス × ステージごとの並行実行
//!
//! # 設計
//! - (service, stage) ごとに 1 タスクを spawn し、最後に全タスクを join する
//! - slot は spawn 前にすべて作成しておく（タスク間で map を奪い合わない）
//! - 後段は前段の slot を待ち、前段が失敗していれば adapter を呼ばずに失敗を publish
//! - 待機・adapter 呼び出しとも期限と CancellationToken に縛られる

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{CoordinatorBuilder, FailurePolicy, PipelineConfig, PipelineReport, slot_key};
use crate::domain::{
    Descriptor, FailureKind, MicroserviceDescriptor, RunId, Stage, StageOutcome,
};
use crate::error::CloudmeError;
use crate::ports::RuntimeAdapter;
use crate::signal::{SignalError, Signals, SlotPublisher};

/// Stages run by `deploy_all`, in dependency order.
const DEPLOY: [Stage; 3] = [Stage::Build, Stage::Run, Stage::Verify];

pub struct Coordinator {
    runtime: Arc<dyn RuntimeAdapter>,
    config: PipelineConfig,
}

impl Coordinator {
    pub(crate) fn new(runtime: Arc<dyn RuntimeAdapter>, config: PipelineConfig) -> Self {
        Self { runtime, config }
    }

    pub fn builder(runtime: Arc<dyn RuntimeAdapter>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(runtime)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the driver this coordinator calls ("docker", ...).
    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    /// Build every service's image concurrently.
    pub async fn build_all(
        &self,
        descriptor: Arc<Descriptor>,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, CloudmeError> {
        self.execute(&[Stage::Build], descriptor, cancel).await
    }

    /// Build, run and verify every service. Stages of one service are
    /// ordered through their slots; services are independent.
    pub async fn deploy_all(
        &self,
        descriptor: Arc<Descriptor>,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, CloudmeError> {
        self.execute(&DEPLOY, descriptor, cancel).await
    }

    /// Remove every service's container.
    pub async fn delete_all(
        &self,
        descriptor: Arc<Descriptor>,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, CloudmeError> {
        self.execute(&[Stage::Delete], descriptor, cancel).await
    }

    async fn execute(
        &self,
        stages: &[Stage],
        descriptor: Arc<Descriptor>,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, CloudmeError> {
        let run_id = RunId::generate();
        let span = info_span!("pipeline", %run_id, runtime = self.runtime.name());

        async move {
            let signals = Arc::new(Signals::new());
            let ctx = Arc::new(RunContext {
                runtime: Arc::clone(&self.runtime),
                config: self.config.clone(),
                signals: Arc::clone(&signals),
                descriptor: Arc::clone(&descriptor),
                cancel: cancel.child_token(),
                started: Instant::now(),
            });

            // 全 slot を先に作る。ここで失敗したら何も spawn しない
            let mut publishers = Vec::with_capacity(stages.len() * descriptor.microservices.len());
            for (index, service) in descriptor.microservices.iter().enumerate() {
                for &stage in stages {
                    let publisher = signals.create_slot(stage, slot_key(stage, service)).await?;
                    publishers.push((index, stage, publisher));
                }
            }

            info!(
                services = descriptor.microservices.len(),
                stages = ?stages,
                "pipeline started"
            );

            let mut joins: Vec<(Stage, String, JoinHandle<()>)> = Vec::with_capacity(publishers.len());
            for (index, stage, publisher) in publishers {
                // 前段が今回の実行に含まれるときだけ待つ
                let depth = chain_depth(stage, stages);
                let name = descriptor.microservices[index].name.clone();
                let task = stage_task(Arc::clone(&ctx), index, stage, depth, publisher);
                joins.push((stage, name, tokio::spawn(task.in_current_span())));
            }

            for (stage, service, join) in joins {
                if let Err(err) = join.await {
                    error!(%stage, %service, error = %err, "stage task ended abnormally");
                }
            }

            let report = PipelineReport::collect(run_id, &descriptor, stages, &signals).await;
            let counts = report.counts();
            info!(
                succeeded = counts.succeeded,
                failed = counts.failed,
                "pipeline finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// Everything one stage task needs; shared read-only by all tasks of a run.
struct RunContext {
    runtime: Arc<dyn RuntimeAdapter>,
    config: PipelineConfig,
    signals: Arc<Signals>,
    descriptor: Arc<Descriptor>,
    cancel: CancellationToken,
    started: Instant,
}

/// Number of predecessors of `stage` that take part in this run.
fn chain_depth(stage: Stage, stages: &[Stage]) -> u32 {
    let mut depth = 0;
    let mut current = stage;
    while let Some(predecessor) = current.predecessor().filter(|p| stages.contains(p)) {
        depth += 1;
        current = predecessor;
    }
    depth
}

async fn stage_task(
    ctx: Arc<RunContext>,
    index: usize,
    stage: Stage,
    depth: u32,
    publisher: SlotPublisher,
) {
    let service = &ctx.descriptor.microservices[index];
    let outcome = ctx.attempt(stage, service, depth).await;

    let trips = match outcome.failure_detail() {
        None => {
            info!(%stage, service = %service.name, "stage succeeded");
            false
        }
        Some(failure) => {
            warn!(
                %stage,
                service = %service.name,
                kind = ?failure.kind,
                message = %failure.message,
                "stage failed"
            );
            !matches!(
                failure.kind,
                FailureKind::Cancelled | FailureKind::UpstreamFailed
            )
        }
    };

    // publish を先に行い、待っている後段が値を取れるようにしてから cancel する
    if let Err(err) = publisher.publish(outcome) {
        error!(%stage, service = %service.name, error = %err, "publish rejected");
    }

    if trips && ctx.config.failure_policy == FailurePolicy::FailFast {
        warn!(%stage, service = %service.name, "fail-fast: cancelling pipeline");
        ctx.cancel.cancel();
    }
}

impl RunContext {
    async fn attempt(
        &self,
        stage: Stage,
        service: &MicroserviceDescriptor,
        depth: u32,
    ) -> StageOutcome {
        let deadline = self.config.wait_deadline(self.started, depth);
        if depth > 0
            && let Some(predecessor) = stage.predecessor()
            && let Err(outcome) = self.await_predecessor(predecessor, service, deadline).await
        {
            return outcome;
        }

        if self.cancel.is_cancelled() {
            return StageOutcome::failure(FailureKind::Cancelled, "pipeline cancelled before start");
        }

        debug!(%stage, service = %service.name, "calling runtime");
        let call = self
            .runtime
            .execute(stage, service, &self.descriptor.application);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                StageOutcome::failure(FailureKind::Cancelled, format!("{stage} interrupted by cancellation"))
            }
            result = tokio::time::timeout(self.config.stage_timeout, call) => match result {
                Ok(result) => StageOutcome::from_result(&result),
                Err(_) => StageOutcome::failure(
                    FailureKind::Timeout,
                    format!("{stage} exceeded {:?}", self.config.stage_timeout),
                ),
            },
        }
    }

    /// `Err` carries the outcome to publish instead of running this stage.
    async fn await_predecessor(
        &self,
        predecessor: Stage,
        service: &MicroserviceDescriptor,
        deadline: Instant,
    ) -> Result<(), StageOutcome> {
        let key = slot_key(predecessor, service);
        let waited = self
            .signals
            .await_result(predecessor, key, &self.config.wait, deadline, &self.cancel)
            .await;

        match waited {
            Ok(outcome) => match outcome.failure_detail() {
                None => Ok(()),
                Some(failure) => Err(StageOutcome::failure(
                    FailureKind::UpstreamFailed,
                    format!("{predecessor} of {key} failed: {}", failure.message),
                )),
            },
            Err(err @ SignalError::Timeout { .. }) => {
                Err(StageOutcome::failure(FailureKind::Timeout, err.to_string()))
            }
            Err(err @ SignalError::Cancelled { .. }) => {
                Err(StageOutcome::failure(FailureKind::Cancelled, err.to_string()))
            }
            Err(err) => Err(StageOutcome::failure(FailureKind::UpstreamFailed, err.to_string())),
        }
    }
}
