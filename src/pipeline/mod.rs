//! Packaging pipeline
//!
//! A build runs a fixed sequence of stages over an explicit [`BuildContext`].
//! Every stage is a hard gate: the first failure stops the build and the
//! remaining stages are skipped. Stages before `ClearPriorOutput` never touch
//! the previous output, so a build that fails validation leaves the last good
//! output in place.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use packwright::pipeline::{BuildSettings, Packager};
//!
//! let mut packager = Packager::new("my-project".as_ref())?;
//! packager.initialize(BuildSettings::new("build", "linux", "default"));
//! let ok = packager.execute_build(false);
//! # Ok::<(), packwright::error::PackError>(())
//! ```

pub mod context;
pub mod filter;
pub mod report;
pub mod stages;


use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{Archiver, Compression, PackFileArchiver};
use crate::config::ProjectConfig;
use crate::deps::{DependencyInspector, SidecarInspector};
use crate::error::{PackError, Result};
use crate::manifest::Manifest;
use crate::progress::ProgressDisplay;

pub use context::BuildContext;

/// Parameters of one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub code_version: String,
    pub asset_version: String,
    pub output_path: PathBuf,
    pub platform: String,
    pub channel: String,
    pub compression: Compression,
}

impl BuildSettings {
    pub fn new(
        output_path: impl Into<PathBuf>,
        platform: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            code_version: "1".to_string(),
            asset_version: "0".to_string(),
            output_path: output_path.into(),
            platform: platform.into(),
            channel: channel.into(),
            compression: Compression::default(),
        }
    }

    #[must_use]
    pub fn with_versions(mut self, code: impl Into<String>, asset: impl Into<String>) -> Self {
        self.code_version = code.into();
        self.asset_version = asset.into();
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Version recorded in the manifest: `<code>.<asset>`
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.code_version, self.asset_version)
    }

    /// Directory receiving this channel's artifacts
    pub fn channel_dir(&self) -> PathBuf {
        self.output_path.join(&self.channel)
    }
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectPackages,
    AssignResources,
    ResolveNameCollisions,
    ValidateBasePreconditions,
    ValidateDependencies,
    DetectAssetCycles,
    ClearPriorOutput,
    AssignPackageTags,
    DetectPackageCycles,
    EmitManifest,
    InvokeNativeArchiver,
    EmitReports,
}

impl Stage {
    const ALL: [Stage; 12] = [
        Stage::CollectPackages,
        Stage::AssignResources,
        Stage::ResolveNameCollisions,
        Stage::ValidateBasePreconditions,
        Stage::ValidateDependencies,
        Stage::DetectAssetCycles,
        Stage::ClearPriorOutput,
        Stage::AssignPackageTags,
        Stage::DetectPackageCycles,
        Stage::EmitManifest,
        Stage::InvokeNativeArchiver,
        Stage::EmitReports,
    ];

    /// Stages run for a build; editor-only builds skip the archiver
    pub fn sequence(editor_only: bool) -> Vec<Stage> {
        Self::ALL
            .into_iter()
            .filter(|s| !(editor_only && *s == Stage::InvokeNativeArchiver))
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::CollectPackages => "collect packages",
            Stage::AssignResources => "assign resources",
            Stage::ResolveNameCollisions => "resolve name collisions",
            Stage::ValidateBasePreconditions => "validate preconditions",
            Stage::ValidateDependencies => "validate dependencies",
            Stage::DetectAssetCycles => "detect asset cycles",
            Stage::ClearPriorOutput => "clear prior output",
            Stage::AssignPackageTags => "assign package tags",
            Stage::DetectPackageCycles => "detect package cycles",
            Stage::EmitManifest => "emit asset map",
            Stage::InvokeNativeArchiver => "archive packages",
            Stage::EmitReports => "emit reports",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One package produced by a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPackage {
    pub name: String,
    /// Canonical paths of the assets it holds
    pub assets: Vec<String>,
    /// Packages it references directly
    pub dependencies: Vec<String>,
    pub archive: Option<PathBuf>,
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub channel_dir: PathBuf,
    pub packages: Vec<BuiltPackage>,
    pub asset_count: usize,
    pub manifest: Option<Manifest>,
    pub warnings: Vec<String>,
}

impl BuildOutcome {
    pub fn package(&self, name: &str) -> Option<&BuiltPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

/// Drives builds for one project
pub struct Packager {
    project_root: PathBuf,
    config: ProjectConfig,
    settings: Option<BuildSettings>,
    inspector: Box<dyn DependencyInspector>,
    archiver: Box<dyn Archiver>,
    show_progress: bool,
}

impl Packager {
    /// Create a packager, loading `packwright.yaml` from `project_root`
    pub fn new(project_root: &Path) -> Result<Self> {
        let config = ProjectConfig::load(project_root)?;
        Ok(Self::with_config(project_root, config))
    }

    pub fn with_config(project_root: &Path, config: ProjectConfig) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config,
            settings: None,
            inspector: Box::new(SidecarInspector),
            archiver: Box::new(PackFileArchiver),
            show_progress: false,
        }
    }

    /// Replace the asset inspection seam
    #[must_use]
    pub fn with_inspector(mut self, inspector: Box<dyn DependencyInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Replace the archiver seam
    #[must_use]
    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Set the parameters for subsequent builds
    pub fn initialize(&mut self, settings: BuildSettings) {
        log::debug!(
            "Initialized build {} for {}/{} -> {}",
            settings.version_string(),
            settings.platform,
            settings.channel,
            settings.output_path.display()
        );
        if settings.compression != Compression::None {
            log::warn!(
                "Compression '{}' is recorded in archive headers; payloads are stored uncompressed",
                settings.compression
            );
        }
        self.settings = Some(settings);
    }

    /// Run a build, logging every diagnostic on failure.
    ///
    /// Returns true when every stage succeeded.
    pub fn execute_build(&self, editor_only: bool) -> bool {
        match self.run(editor_only) {
            Ok(outcome) => {
                log::info!(
                    "Build succeeded: {} packages, {} assets in {}",
                    outcome.packages.len(),
                    outcome.asset_count,
                    outcome.channel_dir.display()
                );
                true
            }
            Err(e) => {
                for line in e.to_string().lines() {
                    log::error!("{}", line);
                }
                false
            }
        }
    }

    /// Run a build and return its outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage, or `NotInitialized`
    /// when [`Packager::initialize`] was never called.
    pub fn run(&self, editor_only: bool) -> Result<BuildOutcome> {
        let settings = self.settings.as_ref().ok_or(PackError::NotInitialized)?;
        let mut ctx = BuildContext::new(&self.project_root, settings, &self.config, editor_only);

        let stages = Stage::sequence(editor_only);
        let mut progress = ProgressDisplay::new(stages.len() as u64, self.show_progress);

        for (i, stage) in stages.iter().enumerate() {
            log::info!("[{}/{}] {}", i + 1, stages.len(), stage);
            progress.start_stage(stage.label());
            if let Err(e) = self.run_stage(*stage, &mut ctx, &mut progress) {
                progress.abandon();
                log::error!("Stage '{}' failed", stage);
                return Err(e);
            }
            progress.inc_stage();
        }
        progress.finish();

        Ok(outcome_from(ctx))
    }

    fn run_stage(
        &self,
        stage: Stage,
        ctx: &mut BuildContext<'_>,
        progress: &mut ProgressDisplay,
    ) -> Result<()> {
        match stage {
            Stage::CollectPackages => stages::collect_packages(ctx),
            Stage::AssignResources => stages::assign_resources(ctx, self.inspector.as_ref()),
            Stage::ResolveNameCollisions => stages::resolve_name_collisions(ctx),
            Stage::ValidateBasePreconditions => stages::validate_base_preconditions(ctx),
            Stage::ValidateDependencies => stages::validate_dependencies(ctx),
            Stage::DetectAssetCycles => stages::detect_asset_cycles(ctx),
            Stage::ClearPriorOutput => stages::clear_prior_output(ctx),
            Stage::AssignPackageTags => stages::assign_package_tags(ctx),
            Stage::DetectPackageCycles => stages::detect_package_cycles(ctx),
            Stage::EmitManifest => stages::emit_manifest(ctx),
            Stage::InvokeNativeArchiver => {
                stages::invoke_archiver(ctx, self.archiver.as_ref(), progress)
            }
            Stage::EmitReports => stages::emit_reports(ctx),
        }
    }
}

fn outcome_from(ctx: BuildContext<'_>) -> BuildOutcome {
    let packages = ctx
        .package_assets
        .iter()
        .map(|(name, indices)| BuiltPackage {
            name: name.clone(),
            assets: indices.iter().map(|&i| ctx.nodes[i].path.clone()).collect(),
            dependencies: ctx.package_graph.get(name).cloned().unwrap_or_default(),
            archive: ctx.archives.get(name).cloned(),
        })
        .collect();

    BuildOutcome {
        channel_dir: ctx.channel_dir(),
        packages,
        asset_count: ctx.nodes.len(),
        manifest: ctx.manifest,
        warnings: ctx.warnings,
    }
}
