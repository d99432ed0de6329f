use habit_app::app::{run, AppConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let config = AppConfig::from_env();
    if let Err(err) = run(config) {
        eprintln!("Failed to start habit tracker: {err:#}");
    }
}
