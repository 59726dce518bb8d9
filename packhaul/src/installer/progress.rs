//! Progress reporting for install and update operations.

/// The stage an installation is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Downloading,
    Extracting,
    Finalizing,
}

impl InstallStage {
    pub fn name(&self) -> &'static str {
        match self {
            InstallStage::Downloading => "downloading",
            InstallStage::Extracting => "extracting",
            InstallStage::Finalizing => "finalizing",
        }
    }

    /// Portion of the overall installation this stage occupies.
    ///
    /// The download dominates wall-clock time, so it gets the bulk of
    /// the range; extraction and finalization share the rest.
    fn span(&self) -> (f64, f64) {
        match self {
            InstallStage::Downloading => (0.0, 0.80),
            InstallStage::Extracting => (0.80, 0.95),
            InstallStage::Finalizing => (0.95, 1.0),
        }
    }

    /// Map a within-stage fraction onto the overall `0.0..=1.0` range.
    pub fn overall(&self, within_stage: f64) -> f64 {
        let (start, end) = self.span();
        start + within_stage.clamp(0.0, 1.0) * (end - start)
    }
}

/// A progress snapshot delivered to the caller's callback.
///
/// `progress` is the overall fraction of the installation, in
/// `0.0..=1.0` and monotone across stage changes (each stage covers a
/// fixed slice of the range, see [`InstallStage::overall`]). File
/// counts and `current_file` are populated during extraction,
/// `download_speed` (bytes per second) during the download.
#[derive(Debug, Clone)]
pub struct InstallationProgress {
    pub package_id: String,
    pub stage: InstallStage,
    pub progress: f64,
    pub current_file: Option<String>,
    pub completed_files: usize,
    pub total_files: usize,
    pub download_speed: u64,
    pub error: Option<String>,
}

impl InstallationProgress {
    pub fn stage_start(package_id: &str, stage: InstallStage) -> Self {
        Self {
            package_id: package_id.to_string(),
            stage,
            progress: stage.overall(0.0),
            current_file: None,
            completed_files: 0,
            total_files: 0,
            download_speed: 0,
            error: None,
        }
    }
}

/// Callback invoked with each progress snapshot.
pub type InstallProgressCallback = Box<dyn Fn(&InstallationProgress) + Send + Sync>;
