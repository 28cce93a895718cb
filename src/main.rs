mod actions;
mod cli;
mod config;
mod dispatch;
mod engine;
mod gestures;
mod input;
mod ipc;
mod landmarks;
mod logging;
mod tracker;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
