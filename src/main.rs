use anyhow::Result;

fn main() -> Result<()> {
    let cli = dirsweep::cli::parse();
    dirsweep::cli::run_cli(cli)
}
