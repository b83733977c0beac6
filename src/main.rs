use anyhow::Result;
use clap::Parser;

use crate::config::ViewerConfig;

mod camera;
mod config;
mod demo;
mod engine;
mod input;
mod math;
mod point_cloud;
mod rendering;
mod scene_graph;
mod splat_sizing;
mod ui;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = ViewerConfig::parse();
    log::debug!("{:?}", config);

    pollster::block_on(window::run(config))?;

    Ok(())
}
