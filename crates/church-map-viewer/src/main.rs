use church_map_viewer::ChurchMapApp;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("church_map_viewer=info,church_map_lib=info"));
    fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    rt.block_on(async {
        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1280.0, 720.0])
                .with_title("Church Map Viewer"),
            ..Default::default()
        };

        let _ = eframe::run_native(
            "Church Map Viewer",
            native_options,
            Box::new(|cc| Ok(Box::new(ChurchMapApp::new(cc)))),
        );
    });
}
