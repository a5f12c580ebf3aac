//! crashwatch - in-process crash and hang detector
//!
//! This is the main entry point; all real work happens in the CLI
//! crate, which drives the detection core.

fn main() -> anyhow::Result<()> {
    crashwatch_cli::run()
}
