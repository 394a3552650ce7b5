//! Resolve command implementation

use std::path::Path;

use console::Style;
use packwright::config::ProjectConfig;
use packwright::error::{Result, config::invalid as config_invalid};
use packwright::runtime::{Catalog, RuntimeLoader};

use crate::cli::ResolveArgs;

pub fn run(project: Option<std::path::PathBuf>, args: ResolveArgs) -> Result<()> {
    let project_root = super::project_root(project)?;
    let output = if args.output.is_absolute() {
        args.output.clone()
    } else {
        project_root.join(&args.output)
    };
    let channel_dir = output.join(&args.channel);

    let catalog = Catalog::from_dir(&channel_dir)?;
    let record = catalog
        .resolve(&args.name)
        .map_err(|e| config_invalid(e.to_string()))?;
    let bold = Style::new().bold();

    println!("{} {}", bold.apply_to("Asset:"), record.asset_name_value);
    println!("{} {}", bold.apply_to("Path:"), record.asset_path);
    println!(
        "{} {}",
        bold.apply_to("Package:"),
        Style::new().cyan().apply_to(&record.bundle_name)
    );
    if !record.all_dependencies.is_empty() {
        println!("{}", bold.apply_to("Dependencies:"));
        for dep in &record.all_dependencies {
            let package = catalog
                .assets()
                .get_by_path(dep)
                .map_or("?", |r| r.bundle_name.as_str());
            println!("  {} {}", dep, Style::new().dim().apply_to(format!("({})", package)));
        }
    }

    let order = load_order(&catalog, &record.bundle_name);
    println!("{} {}", bold.apply_to("Load order:"), order.join(" -> "));

    if args.load {
        load(&project_root, &channel_dir, &args.name)?;
    }
    Ok(())
}

/// Packages opened to load `package`, dependencies first
fn load_order(catalog: &Catalog, package: &str) -> Vec<String> {
    let mut graph = packwright::runtime::PackageLoadGraph::new();
    graph
        .load_plan(package, |p| catalog.package_dependencies(p).to_vec())
        .unwrap_or_else(|e| {
            log::warn!("{}", e);
            vec![package.to_string()]
        })
}

fn load(project_root: &Path, channel_dir: &Path, name: &str) -> Result<()> {
    let config = ProjectConfig::load(project_root)?;
    let mut loader = RuntimeLoader::open(project_root, channel_dir, &config.runtime)?;
    let Some(bytes) = loader.load::<Vec<u8>>(name) else {
        return Err(config_invalid(format!("could not load '{}'", name)));
    };

    println!(
        "{} {} bytes, packages loaded: {}",
        Style::new().green().bold().apply_to("Loaded"),
        bytes.len(),
        loader.loaded_packages().join(", ")
    );
    loader.unload(name);
    Ok(())
}
