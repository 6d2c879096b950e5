//! config-stage: inspect, edit and import staged configuration.

use anyhow::Result;

mod cli;

fn main() -> Result<()> {
    cli::run()
}
