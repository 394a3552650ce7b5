//! Progress bar display for builds

use indicatif::{ProgressBar, ProgressStyle};

/// Progress display for a packaging build
pub struct ProgressDisplay {
    /// Main progress bar, one tick per pipeline stage
    stage_pb: ProgressBar,
    /// Optional package progress bar (shown while archiving)
    package_pb: Option<ProgressBar>,
    visible: bool,
}

impl ProgressDisplay {
    /// Create a new progress display with total stage count
    pub fn new(total_stages: u64, visible: bool) -> Self {
        let stage_pb = if visible {
            let pb = ProgressBar::new(total_stages);
            pb.set_style(style("[{bar:40.cyan/blue}] {pos}/{len} {msg}", "#>-"));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self {
            stage_pb,
            package_pb: None,
            visible,
        }
    }

    /// Initialize package progress bar with total package count
    pub fn init_package_progress(&mut self, total_packages: u64) {
        let package_pb = if self.visible {
            let pb = ProgressBar::new(total_packages);
            pb.set_style(style(
                "  [{bar:40.green/yellow}] {pos}/{len} packages {msg}",
                "█▉▊▋▌▍▎▏  ",
            ));
            pb
        } else {
            ProgressBar::hidden()
        };
        self.package_pb = Some(package_pb);
    }

    /// Show the stage about to run
    pub fn start_stage(&self, stage: &str) {
        self.stage_pb.set_message(stage.to_string());
    }

    /// Increment stage progress
    pub fn inc_stage(&self) {
        self.stage_pb.inc(1);
    }

    /// Update package progress
    pub fn update_package(&self, package: &str) {
        if let Some(ref package_pb) = self.package_pb {
            package_pb.set_message(package.to_string());
            package_pb.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(ref package_pb) = self.package_pb {
            package_pb.finish_and_clear();
        }
        self.stage_pb.finish();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        if let Some(ref package_pb) = self.package_pb {
            package_pb.abandon();
        }
        self.stage_pb.abandon();
    }
}

fn style(template: &str, chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(chars)
}
