mod app;
mod assets;
mod config;
mod ecs;
mod error;
mod manager;
mod menu;
mod pet;
mod platform;
mod render;
mod screen;
mod util;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("deskpet starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
