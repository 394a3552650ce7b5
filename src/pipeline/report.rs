//! Human-readable build report (`build_report.txt`)

use std::fmt::Write;

use super::context::BuildContext;

pub const BUILD_REPORT_FILE: &str = "build_report.txt";

pub fn render_build_report(ctx: &BuildContext<'_>) -> String {
    let settings = ctx.settings;
    let mut out = String::new();

    let _ = writeln!(out, "Packwright build report");
    let _ = writeln!(out, "Version: {}", settings.version_string());
    let _ = writeln!(out, "Platform: {}", settings.platform);
    let _ = writeln!(out, "Channel: {}", settings.channel);
    let _ = writeln!(out, "Compression: {}", settings.compression);
    let _ = writeln!(out, "Editor only: {}", ctx.editor_only);
    let _ = writeln!(out, "Packages: {}", ctx.package_assets.len());
    let _ = writeln!(out, "Assets: {}", ctx.nodes.len());

    for (package, indices) in &ctx.package_assets {
        let size = ctx
            .manifest
            .as_ref()
            .and_then(|m| m.find(package))
            .map_or_else(|| "not archived".to_string(), |e| format!("{} bytes", e.size_bytes));
        let _ = writeln!(out);
        let _ = writeln!(out, "[{}] {} assets, {}", package, indices.len(), size);

        if let Some(deps) = ctx.package_graph.get(package).filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "  depends on: {}", deps.join(", "));
        }
        for &i in indices {
            let node = &ctx.nodes[i];
            let marker = if node.synthetic { " (dependency)" } else { "" };
            let _ = writeln!(out, "  - {} as {}{}", node.path, node.logical_name, marker);
        }
    }

    if !ctx.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in &ctx.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }

    out
}
