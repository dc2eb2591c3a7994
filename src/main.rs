use anyhow::Context;
use clap::Parser;

use lock_overhead::Config;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::parse();

    let mut stdout = std::io::stdout().lock();
    lock_overhead::run(&config, &mut stdout).context("failed to write report")?;
    Ok(())
}
