//! Subcommand implementations.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use annolink_core::segment::{FramePolicyKind, Scope};
use annolink_core::service::AnnotationService;
use annolink_core::types::RemoteId;
use annolink_cvat::{CvatApi, CvatService};
use annolink_pipeline::{
    load_exclusion_set, preview_annotations, preview_frame_matches, select_per_job,
    SelectionRequest, Transfer, TransferOptions,
};

use crate::config::{connection_from_env, AppConfig, Role};

/// Source and target of a transfer or match preview.
#[derive(Debug, Clone)]
pub struct Pair {
    pub source: Scope,
    pub target: Scope,
}

#[derive(Debug, Serialize)]
struct PingResult {
    role: Role,
    instance: String,
    ok: bool,
    message: String,
}

/// Shared state for one invocation: configuration and a pooled HTTP client.
pub struct Context {
    config: AppConfig,
    client: reqwest::Client,
}

impl Context {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn service(&self, role: Role) -> Result<CvatService> {
        let connection = connection_from_env(role)?;
        tracing::debug!(?role, url = %connection.url, "Using CVAT instance");
        Ok(CvatService::new(CvatApi::with_client(
            self.client.clone(),
            connection,
            self.config.timeouts(),
        )))
    }

    fn policy(&self, requested: Option<&str>) -> Result<FramePolicyKind> {
        match requested {
            Some(name) => Ok(FramePolicyKind::parse(name)?),
            None => Ok(self.config.frame_policy),
        }
    }

    pub async fn ping(&self, roles: &[Role]) -> Result<()> {
        let roles = if roles.is_empty() {
            &[Role::Source, Role::Target][..]
        } else {
            roles
        };

        let mut results = Vec::with_capacity(roles.len());
        for &role in roles {
            let service = self.service(role)?;
            let (ok, message) = match service.check_connection().await {
                Ok(()) => (true, "Connected successfully".to_string()),
                Err(e) => {
                    tracing::warn!(?role, error = %e, "Connection check failed");
                    (false, format!("Connection failed: {e}"))
                }
            };
            results.push(PingResult {
                role,
                instance: service.describe(),
                ok,
                message,
            });
        }
        print_json(&results)?;

        let failed = results.iter().filter(|r| !r.ok).count();
        if failed > 0 {
            anyhow::bail!("{failed} of {} instances unreachable", results.len());
        }
        Ok(())
    }

    pub async fn transfer(
        &self,
        pair: &Pair,
        policy: Option<&str>,
        dry_run: bool,
        show_payload: bool,
    ) -> Result<()> {
        let source = self.service(Role::Source)?;
        let target = self.service(Role::Target)?;
        let policy = self.policy(policy)?;
        let options = TransferOptions {
            verify_delay: self.config.verify_delay(),
            dry_run,
        };

        let result = Transfer::new(&source, &target, &policy)
            .with_options(options)
            .run(pair.source, pair.target)
            .await;

        match result {
            Ok(outcome) if show_payload => print_json(&outcome),
            Ok(outcome) => print_json(&outcome.report),
            Err(e) => {
                if let Some(report) = e.report() {
                    print_json(report)?;
                }
                if e.wrote_to_target() {
                    tracing::warn!(
                        target_scope = %pair.target,
                        "Annotations were written before the failure"
                    );
                }
                Err(e.into())
            }
        }
    }

    pub async fn preview_matches(&self, pair: &Pair) -> Result<()> {
        let source = self.service(Role::Source)?;
        let target = self.service(Role::Target)?;

        let preview = preview_frame_matches(&source, &target, pair.source, pair.target).await?;
        print_json(&preview)
    }

    pub async fn preview_annotations(
        &self,
        role: Role,
        task: RemoteId,
        job: Option<RemoteId>,
        policy: Option<&str>,
    ) -> Result<()> {
        let service = self.service(role)?;
        let policy = self.policy(policy)?;

        let preview = preview_annotations(&service, Scope::new(task, job), &policy).await?;
        print_json(&preview)
    }

    pub async fn sample(
        &self,
        task: RemoteId,
        job: Option<RemoteId>,
        count: usize,
        check_task: Option<RemoteId>,
        seed: Option<u64>,
    ) -> Result<()> {
        let service = self.service(Role::Source)?;

        let excluded = match check_task {
            Some(check_task) => {
                let check = self.service(Role::Check)?;
                Some(load_exclusion_set(&check, check_task).await?)
            }
            None => None,
        };

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let request = SelectionRequest {
            collection: task,
            job,
            count,
        };

        let report = select_per_job(&service, request, excluded.as_ref(), &mut rng).await?;
        tracing::info!(
            selected = report.selected_count(),
            requested = report.requested_count(),
            "Selection complete",
        );
        print_json(&report)
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
