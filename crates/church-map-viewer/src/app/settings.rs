use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Church Map Viewer - A desktop application for exploring a church directory on an interactive map
pub struct Settings {
    /// Base URL of the remote church-directory service
    #[clap(long, value_name = "URL")]
    pub directory_url: Option<String>,

    /// JSON file with church records, used as the directory instead of a
    /// remote service
    #[clap(long, value_name = "FILE")]
    pub churches_file: Option<PathBuf>,

    /// Simulated location-fix latitude (desktop stand-in for a GPS fix)
    #[clap(long, requires = "fix_lon", allow_hyphen_values = true)]
    pub fix_lat: Option<f64>,

    /// Simulated location-fix longitude
    #[clap(long, requires = "fix_lat", allow_hyphen_values = true)]
    pub fix_lon: Option<f64>,

    /// Timeout for directory fetches in seconds
    #[clap(long, default_value = "15")]
    pub fetch_timeout_secs: u64,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

impl Settings {
    pub fn from_cli() -> Self {
        Self::parse()
    }

    /// The simulated fix, when both coordinates were given
    pub fn cli_fix(&self) -> Option<geo::Point<f64>> {
        match (self.fix_lat, self.fix_lon) {
            (Some(lat), Some(lon)) => Some(church_map_lib::utils::lat_lon(lat, lon)),
            _ => None,
        }
    }
}
