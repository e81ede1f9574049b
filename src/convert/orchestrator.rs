// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversion orchestrator.
//!
//! Owns the control flow of a job: detect, read, validate, optionally
//! transform and re-validate, then write and/or publish. Each job runs
//! inside an `info_span!("conversion", job = %id)`; failures end the job in
//! `Failed` with the originating error on its report.

use std::io;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use super::gateway::{call_with_timeout, ObjectStoreGateway};
use super::job::{ConversionReport, Job, JobState};
use super::options::{ConversionRequest, ConversionSource};
use crate::core::{ConvertError, Result};
use crate::io::detection::select;
use crate::io::formats::{gcb, BinaryAdapter};
use crate::io::{global_registry, ConverterRegistry, FormatAdapter, SourceHandle};
use crate::model::CanonicalModel;
use crate::schema::{SchemaDefinition, SchemaValidator, Validation};

/// Runs conversion jobs against a registry and an optional gateway.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ConverterRegistry>,
    gateway: Option<Arc<dyn ObjectStoreGateway>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("gateway", &self.gateway.is_some())
            .finish()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(global_registry())
    }
}

impl Orchestrator {
    /// Create an orchestrator without a gateway.
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        Self {
            registry,
            gateway: None,
        }
    }

    /// Attach an object-store gateway for remote sources and targets.
    pub fn with_gateway(mut self, gateway: Arc<dyn ObjectStoreGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    /// Run one job to completion.
    ///
    /// Never panics on job failure; inspect [`ConversionReport::state`] and
    /// [`ConversionReport::error`].
    pub fn convert(&self, request: &ConversionRequest) -> ConversionReport {
        let mut job = Job::new();
        let span = info_span!("conversion", job = %job.id());
        let _enter = span.enter();

        if let Err(err) = self.run(&mut job, request) {
            warn!(
                kind = err.kind_name(),
                state = %job.state(),
                error = %err,
                "Conversion failed"
            );
            job.fail(err);
        }
        let report = job.finish();
        info!(state = %report.state, "Conversion finished");
        report
    }

    /// Run independent jobs on a thread pool with `workers` threads
    /// (0 uses one per CPU). Reports come back in request order.
    pub fn convert_batch(
        &self,
        requests: &[ConversionRequest],
        workers: usize,
    ) -> Result<Vec<ConversionReport>> {
        self.convert_batch_with(requests, workers, |_| {})
    }

    /// Like [`convert_batch`](Self::convert_batch), calling `on_complete`
    /// as each job finishes.
    pub fn convert_batch_with<F>(
        &self,
        requests: &[ConversionRequest],
        workers: usize,
        on_complete: F,
    ) -> Result<Vec<ConversionReport>>
    where
        F: Fn(&ConversionReport) + Sync,
    {
        let num_threads = if workers == 0 { num_cpus::get() } else { workers };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("geocodec-worker-{index}"))
            .build()
            .map_err(|e| ConvertError::config(format!("Failed to create thread pool: {e}")))?;

        info!(jobs = requests.len(), workers = num_threads, "Starting batch conversion");
        let reports: Vec<ConversionReport> = pool.install(|| {
            requests
                .par_iter()
                .map(|request| {
                    let report = self.convert(request);
                    on_complete(&report);
                    report
                })
                .collect()
        });

        let completed = reports.iter().filter(|r| r.is_completed()).count();
        info!(
            completed,
            failed = reports.len() - completed,
            "Batch conversion finished"
        );
        Ok(reports)
    }

    fn run(&self, job: &mut Job, request: &ConversionRequest) -> Result<()> {
        let options = &request.options;
        let target = &request.target;

        if target.local.is_none() && target.remote.is_none() {
            return Err(ConvertError::config("conversion request has no target"));
        }
        let gateway = match (&target.remote, &request.source, &self.gateway) {
            (_, _, Some(gateway)) => Some(Arc::clone(gateway)),
            (None, ConversionSource::File(_), None) => None,
            _ => {
                return Err(ConvertError::config(
                    "remote source or target requires a gateway",
                ))
            }
        };

        let writer = self.target_adapter(request)?;
        if let Some(adapter) = &writer {
            job.report_mut().target_format = Some(adapter.format_id().to_string());
        }
        if let Some(path) = &target.local {
            if path.exists() && !options.overwrite {
                let err = io::Error::new(io::ErrorKind::AlreadyExists, "target exists");
                return Err(ConvertError::io(
                    format!("writing {}", path.display()),
                    &err,
                ));
            }
        }

        let model = match &request.source {
            ConversionSource::File(path) => {
                let source = SourceHandle::open(path)?;
                let adapter = match &request.source_format {
                    Some(format_id) => {
                        let adapter = self.registry.lookup(format_id)?;
                        job.transition(JobState::Reading)?;
                        adapter
                    }
                    None => {
                        job.transition(JobState::Detecting)?;
                        let detections = self.registry.resolve(&source);
                        for d in &detections {
                            debug!(format = d.format_id, confidence = %d.confidence, "Detection score");
                        }
                        let format_id = select(&source, &detections, options.min_confidence)?;
                        let adapter = self.registry.lookup(format_id)?;
                        job.transition(JobState::Reading)?;
                        adapter
                    }
                };
                job.report_mut().source_format = Some(adapter.format_id().to_string());
                info!(format = adapter.format_id(), path = %path.display(), "Reading source");
                adapter.read(&source, &options.cancel)?
            }
            ConversionSource::Remote(id) => {
                job.transition(JobState::Reading)?;
                let gateway = gateway
                    .clone()
                    .ok_or_else(|| ConvertError::config("remote source requires a gateway"))?;
                let id = id.clone();
                info!(id = %id, "Fetching remote object");
                let model = call_with_timeout("fetch", options.gateway_timeout, move || {
                    gateway.fetch(&id)
                })?;
                job.report_mut().source_format = Some(model.provenance().source_format.clone());
                model
            }
        };
        options.cancel.check("validation")?;

        let validator = SchemaValidator::new()
            .treat_warnings_as_errors(options.treat_warnings_as_errors)
            .with_coercion_override(options.coercion_override);
        let schema = request.schema.as_deref();

        job.transition(JobState::Validating)?;
        let mut model = validate(job, &validator, model, schema)?;

        if let Some(pipeline) = options.transforms.as_ref().filter(|p| !p.is_empty()) {
            job.transition(JobState::Transforming)?;
            pipeline.validate(&model)?;
            model = pipeline.apply(model)?;
            job.transition(JobState::Validating)?;
            model = validate(job, &validator, model, schema)?;
        }

        if let (Some(path), Some(adapter)) = (&target.local, &writer) {
            job.transition(JobState::Writing)?;
            let lossy = adapter.lossy_features();
            if !lossy.is_empty() {
                warn!(
                    format = adapter.format_id(),
                    features = ?lossy,
                    "Target format may discard model features"
                );
            }
            let summary = adapter.write(&model, path, &options.cancel)?;
            debug!(
                path = %summary.path.display(),
                bytes = summary.bytes_written,
                elements = summary.elements,
                "Wrote target"
            );
            job.report_mut().output = Some(summary);
        }

        if let Some(destination) = &target.remote {
            job.transition(JobState::Publishing)?;
            let gateway = gateway
                .ok_or_else(|| ConvertError::config("remote target requires a gateway"))?;
            let destination = destination.clone();
            let id = call_with_timeout("upload", options.gateway_timeout, move || {
                gateway.upload(&model, &destination)
            })?;
            info!(id = %id, "Published object");
            job.report_mut().remote_id = Some(id);
        }

        job.transition(JobState::Completed)
    }

    fn target_adapter(&self, request: &ConversionRequest) -> Result<Option<Arc<dyn FormatAdapter>>> {
        let Some(path) = &request.target.local else {
            return Ok(None);
        };
        let adapter = match &request.target_format {
            Some(format_id) => self.registry.lookup(format_id)?,
            None => self.registry.by_extension(path)?,
        };
        let adapter: Arc<dyn FormatAdapter> = if adapter.format_id() == gcb::FORMAT {
            Arc::new(BinaryAdapter::new(request.options.compression))
        } else {
            adapter
        };
        Ok(Some(adapter))
    }
}

fn validate(
    job: &mut Job,
    validator: &SchemaValidator,
    model: CanonicalModel,
    schema: Option<&SchemaDefinition>,
) -> Result<CanonicalModel> {
    let Some(schema) = schema else {
        return Ok(model);
    };
    match validator.validate(&model, schema) {
        Validation::Valid(validated) => {
            for warning in &validated.warnings {
                warn!(path = %warning.path, reason = %warning.reason, "Schema warning");
            }
            let report = job.report_mut();
            report.violations = validated.warnings;
            report.coercions.extend(validated.coercions);
            Ok(validated.model)
        }
        Validation::Invalid(violations) => {
            let error = violations
                .iter()
                .find(|v| v.is_blocking())
                .or_else(|| violations.first())
                .map(|v| v.to_error())
                .unwrap_or_else(|| ConvertError::schema_mismatch("", "invalid model"));
            job.report_mut().violations = violations;
            Err(error)
        }
    }
}
