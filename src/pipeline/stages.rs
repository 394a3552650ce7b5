//! Pipeline stage implementations
//!
//! Each stage reads and extends the [`BuildContext`]. A stage returning an
//! error stops the build; later stages never run.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::{ArchiveRequest, Archiver};
use crate::collision::resolve_collisions;
use crate::config::load_descriptors;
use crate::cycle::{Graph, attribute_package_cycle, find_cycles};
use crate::deps::{DependencyCollector, DependencyInspector};
use crate::domain::{PackagePlan, ResourceNode, UNASSIGNED_PACKAGE};
use crate::error::{
    PackError, Result,
    config::{empty_package, invalid as config_invalid},
    fs::write_failed,
    graph::{asset_cycles, missing_dependencies, name_conflict, package_cycles},
};
use crate::hash::hash_file;
use crate::manifest::{ASSET_MAP_FILE, AssetMap, MANIFEST_FILE, Manifest, PackageEntry};
use crate::naming::{self, is_within, to_forward_slashes};
use crate::progress::ProgressDisplay;
use crate::temp::write_atomic;

use super::context::BuildContext;
use super::filter::PathFilter;
use super::report::{BUILD_REPORT_FILE, render_build_report};

/// Load descriptors, resolve them against the project and order them so
/// the deepest source directory claims files first.
pub fn collect_packages(ctx: &mut BuildContext<'_>) -> Result<()> {
    let descriptor_dir = ctx.policy.project_root().join(&ctx.config.descriptor_dir);
    let descriptors = load_descriptors(&descriptor_dir)?;

    let mut plans = Vec::with_capacity(descriptors.len());
    let mut sources: HashMap<String, String> = HashMap::new();

    for file in descriptors {
        let descriptor = &file.descriptor;
        let origin = file.origin();
        let source_dir = ctx.policy.project_root().join(descriptor.source.trim());
        let source = ctx
            .policy
            .to_canonical_path(Path::new(descriptor.source.trim()))?;

        if !ctx.policy.is_under_package_root(&source) {
            return Err(config_invalid(format!(
                "{}: source '{}' is outside the content root '{}'",
                origin,
                descriptor.source,
                ctx.policy.content_root()
            )));
        }
        if !source_dir.is_dir() {
            return Err(config_invalid(format!(
                "{}: source directory '{}' does not exist",
                origin, descriptor.source
            )));
        }
        if let Some(previous) = sources.insert(source.clone(), origin.clone()) {
            return Err(config_invalid(format!(
                "{} and {} both package '{}'",
                previous, origin, source
            )));
        }

        plans.push(PackagePlan {
            name: descriptor.effective_name(),
            disambiguation: ctx.policy.relative_to_content(&source),
            source,
            source_dir,
            recursive: descriptor.recursive,
            filters: descriptor.filters.clone(),
            origin,
        });
    }

    plans.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.source.cmp(&b.source)));
    resolve_collisions(&mut plans, ctx.config.max_rename_depth)?;

    for plan in &plans {
        log::debug!("Package '{}' <- {} ({})", plan.name, plan.source, plan.origin);
    }
    ctx.plans = plans;
    Ok(())
}

/// Assign every matching file to the deepest package claiming it, then
/// collect dependencies and create synthetic nodes.
///
/// Two files whose paths differ only by case map to one canonical path and
/// fail the build with a name conflict. A package left without a file of its
/// own (scenes go to their own packages, atlas sprites into their atlas)
/// fails with `EmptyPackage`.
pub fn assign_resources(
    ctx: &mut BuildContext<'_>,
    inspector: &dyn DependencyInspector,
) -> Result<()> {
    let ignore = PathFilter::new(&ctx.config.ignore)?;
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut case_clashes: Vec<(String, Vec<String>)> = Vec::new();
    let mut nodes = Vec::new();

    for plan in &ctx.plans {
        let filters = PathFilter::new(&plan.filters)?;
        let mut walker = WalkDir::new(&plan.source_dir).sort_by_file_name();
        if !plan.recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker.into_iter() {
            let entry = entry.map_err(|e| PackError::IoError {
                message: format!("walking {}: {}", plan.source_dir.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let canonical = ctx.policy.to_canonical_path(entry.path())?;
            if let Some(first) = claimed.get(&canonical) {
                if first != entry.path() {
                    log::error!(
                        "{} and {} differ only by case",
                        first.display(),
                        entry.path().display()
                    );
                    case_clashes.push((
                        canonical,
                        vec![to_forward_slashes(first), to_forward_slashes(entry.path())],
                    ));
                }
                continue;
            }
            if ignore.matches(&ctx.policy.relative_to_content(&canonical)) {
                continue;
            }
            let within_source = canonical
                .strip_prefix(plan.source.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(canonical.as_str());
            if !filters.is_empty() && !filters.matches(within_source) {
                continue;
            }

            let logical = naming::logical_name(&canonical);
            let package = if naming::is_scene(&canonical, &ctx.config.scene_extension) {
                naming::scene_package_for(&logical, &ctx.config.scene_package_suffix)
            } else {
                plan.name.clone()
            };
            let disambiguation = ctx.policy.content_relative(&canonical);
            nodes.push(ResourceNode::new(
                canonical.clone(),
                entry.path().to_path_buf(),
                logical,
                disambiguation,
                package,
            ));
            claimed.insert(canonical, entry.path().to_path_buf());
        }
    }

    if !case_clashes.is_empty() {
        return Err(name_conflict(0, &case_clashes));
    }

    let collector = DependencyCollector::new(&ctx.policy, ctx.config, inspector);
    let report = collector.collect(&mut nodes)?;
    if report.synthetic > 0 {
        log::info!("Added {} dependencies outside configured packages", report.synthetic);
    }
    if report.atlas_members > 0 {
        log::info!("Packed {} files into sprite atlases", report.atlas_members);
    }

    for plan in &ctx.plans {
        let owned = nodes.iter().filter(|n| n.package_id == plan.name).count();
        if owned == 0 {
            return Err(empty_package(plan.name.clone()));
        }
        log::debug!("Package '{}' claimed {} files", plan.name, owned);
    }

    ctx.warnings.extend(report.warnings);
    ctx.nodes = nodes;
    Ok(())
}

/// Make logical names unique, then re-derive scene package names from the
/// resolved scene names.
pub fn resolve_name_collisions(ctx: &mut BuildContext<'_>) -> Result<()> {
    let renamed = resolve_collisions(&mut ctx.nodes, ctx.config.max_rename_depth)?;
    if renamed > 0 {
        log::info!("Renamed {} assets to resolve name collisions", renamed);
    }

    for node in &mut ctx.nodes {
        if naming::is_scene(&node.path, &ctx.config.scene_extension) {
            node.package_id =
                naming::scene_package_for(&node.logical_name, &ctx.config.scene_package_suffix);
        }
    }
    Ok(())
}

/// Check build settings and the shape of the package set
pub fn validate_base_preconditions(ctx: &mut BuildContext<'_>) -> Result<()> {
    let settings = ctx.settings;
    for (field, value) in [
        ("platform", &settings.platform),
        ("channel", &settings.channel),
        ("code version", &settings.code_version),
        ("asset version", &settings.asset_version),
    ] {
        if value.trim().is_empty() {
            return Err(config_invalid(format!("{} must not be empty", field)));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(config_invalid(format!(
                "{} '{}' must not contain whitespace",
                field, value
            )));
        }
    }
    if settings.channel.contains(['/', '\\']) || settings.channel.contains("..") {
        return Err(config_invalid(format!(
            "channel '{}' must be a plain directory name",
            settings.channel
        )));
    }

    if let Ok(output) = ctx.policy.to_canonical_path(&settings.output_path) {
        if ctx.policy.is_under_package_root(&output)
            || is_within(ctx.policy.content_root(), &output)
        {
            return Err(config_invalid(format!(
                "output path {} overlaps the content root",
                settings.output_path.display()
            )));
        }
    }

    if ctx.nodes.is_empty() {
        return Err(config_invalid("no assets to package"));
    }

    let plan_names: HashSet<&str> = ctx.plans.iter().map(|p| p.name.as_str()).collect();
    for node in &ctx.nodes {
        if naming::is_scene(&node.path, &ctx.config.scene_extension)
            && plan_names.contains(node.package_id.as_str())
        {
            return Err(config_invalid(format!(
                "scene package '{}' for {} clashes with a configured package",
                node.package_id, node.path
            )));
        }
    }
    Ok(())
}

/// Every dependency must resolve to a node whose file still exists
pub fn validate_dependencies(ctx: &mut BuildContext<'_>) -> Result<()> {
    let index = ctx.node_index();
    let mut missing = Vec::new();

    for node in &ctx.nodes {
        if !node.source_file.is_file() {
            missing.push((node.package_id.clone(), node.path.clone()));
        }
        for dep in &node.direct_dependencies {
            if !index.contains_key(dep.as_str()) {
                missing.push((node.path.clone(), dep.clone()));
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_dependencies(&missing))
    }
}

pub fn detect_asset_cycles(ctx: &mut BuildContext<'_>) -> Result<()> {
    let graph: Graph = ctx
        .nodes
        .iter()
        .map(|n| (n.path.clone(), n.direct_dependencies.clone()))
        .collect();
    let cycles = find_cycles(&graph);
    if cycles.is_empty() {
        Ok(())
    } else {
        Err(asset_cycles(&cycles))
    }
}

/// Remove the previous output for this channel only
pub fn clear_prior_output(ctx: &mut BuildContext<'_>) -> Result<()> {
    let channel_dir = ctx.channel_dir();
    if channel_dir.exists() {
        log::debug!("Removing previous output {}", channel_dir.display());
        std::fs::remove_dir_all(&channel_dir).map_err(|e| write_failed(&channel_dir, e))?;
    }
    std::fs::create_dir_all(&channel_dir).map_err(|e| write_failed(&channel_dir, e))?;
    Ok(())
}

/// Group assets by package and derive package-level edges from
/// cross-package direct dependencies.
pub fn assign_package_tags(ctx: &mut BuildContext<'_>) -> Result<()> {
    let index = ctx.node_index();
    let mut package_assets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (i, node) in ctx.nodes.iter().enumerate() {
        package_assets
            .entry(node.package_id.clone())
            .or_default()
            .push(i);
        let targets = edges.entry(node.package_id.clone()).or_default();
        for dep in &node.direct_dependencies {
            if let Some(&j) = index.get(dep.as_str()) {
                let dep_package = &ctx.nodes[j].package_id;
                if dep_package != &node.package_id {
                    targets.insert(dep_package.clone());
                }
            }
        }
    }

    for assets in package_assets.values_mut() {
        assets.sort_by(|&a, &b| ctx.nodes[a].path.cmp(&ctx.nodes[b].path));
    }

    if package_assets.contains_key(UNASSIGNED_PACKAGE) {
        log::debug!(
            "Package '{}' holds {} shared dependencies",
            UNASSIGNED_PACKAGE,
            package_assets[UNASSIGNED_PACKAGE].len()
        );
    }

    ctx.package_graph = edges
        .into_iter()
        .map(|(package, targets)| (package, targets.into_iter().collect()))
        .collect();
    ctx.package_assets = package_assets;
    Ok(())
}

pub fn detect_package_cycles(ctx: &mut BuildContext<'_>) -> Result<()> {
    let cycles = find_cycles(&ctx.package_graph);
    if cycles.is_empty() {
        return Ok(());
    }

    let attribution: Vec<String> = cycles
        .iter()
        .flat_map(|cycle| attribute_package_cycle(cycle, &ctx.nodes))
        .map(|edge| edge.to_string())
        .collect();
    Err(package_cycles(&cycles, &attribution))
}

/// Write the asset map consumed by the runtime loader
pub fn emit_manifest(ctx: &mut BuildContext<'_>) -> Result<()> {
    let map = AssetMap::from_nodes(&ctx.nodes);

    let path = ctx.channel_dir().join(ASSET_MAP_FILE);
    write_atomic(&path, map.to_json()?.as_bytes())?;
    log::info!("Wrote {} ({} assets)", to_forward_slashes(&path), map.len());
    Ok(())
}

pub fn invoke_archiver(
    ctx: &mut BuildContext<'_>,
    archiver: &dyn Archiver,
    progress: &mut ProgressDisplay,
) -> Result<()> {
    let channel_dir = ctx.channel_dir();
    progress.init_package_progress(ctx.package_assets.len() as u64);

    for (package, indices) in &ctx.package_assets {
        let request = ArchiveRequest {
            package,
            dependencies: ctx.package_graph.get(package).cloned().unwrap_or_default(),
            compression: ctx.settings.compression,
            assets: indices.iter().map(|&i| &ctx.nodes[i]).collect(),
        };
        let path = archiver.archive(&request, &channel_dir)?;
        progress.update_package(package);
        ctx.archives.insert(package.clone(), path);
    }
    Ok(())
}

/// Write the version manifest (when archives exist) and the build report
pub fn emit_reports(ctx: &mut BuildContext<'_>) -> Result<()> {
    let channel_dir = ctx.channel_dir();

    if ctx.archives.is_empty() {
        log::info!("No archives built, skipping {}", MANIFEST_FILE);
    } else {
        let mut manifest = Manifest::new(
            ctx.settings.version_string(),
            &ctx.settings.platform,
            &ctx.settings.channel,
        );
        for (package, path) in &ctx.archives {
            let (content_hash, size_bytes) = hash_file(path)?;
            manifest.packages.push(PackageEntry {
                name: package.clone(),
                content_hash,
                size_bytes,
            });
        }
        write_atomic(&channel_dir.join(MANIFEST_FILE), manifest.to_text().as_bytes())?;
        ctx.manifest = Some(manifest);
    }

    let report = render_build_report(ctx);
    write_atomic(&channel_dir.join(BUILD_REPORT_FILE), report.as_bytes())?;
    Ok(())
}
