/// Native panomark entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use panomark::config::AppConfig;
    use panomark::native::{self, NativeOptions};

    let config = AppConfig::load_from_default_path().unwrap_or_default();

    // RUST_LOG overrides the configured level
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.into())
        .parse_default_env()
        .init();

    let options = NativeOptions::from_args(std::env::args().skip(1));
    log::info!("Starting panomark {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = native::run(options, config) {
        eprintln!("Application error: {}", e);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
