use {
    anyhow::Result,
    clap::Parser,
    episodic_rl::cli::{
        run,
        Args,
    },
};


fn main() -> Result<()> {
    run(Args::parse())
}
