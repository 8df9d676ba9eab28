use clap::Parser;

use pingpong::params::Parameters;

fn main() -> anyhow::Result<()> {
    let params = Parameters::parse();

    let default_level = if params.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    pingpong::run(&params)
}
