mod app;

use app::FlashmasterApp;
use flashmaster::{AppState, config};

fn main() -> eframe::Result<()> {
    let config_path = config::config_path();
    let loaded = config::read_config(&config_path);

    // The log filter comes from the config, so the outcome of reading it is logged afterwards.
    let log_filter = loaded
        .as_ref()
        .map(|config| config.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter)).init();

    let config = config::config_or_default(&config_path, loaded);
    let window_size = [config.window_width, config.window_height];

    let state = AppState::open(config);
    log::info!(
        "Starting with {} cards, {} tags",
        state.repository.len(),
        state.repository.list_tags().len()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(window_size),
        ..Default::default()
    };
    eframe::run_native(
        "Flashmaster",
        options,
        Box::new(|_cc| Ok(Box::new(FlashmasterApp::new(state)))),
    )
}
