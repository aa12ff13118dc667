//! html2docx - convert an HTML report to a Word document

use camserver::report;
use clap::Parser;
use std::path::PathBuf;

/// Convert an HTML report file to .docx
#[derive(Debug, Parser)]
#[command(name = "html2docx", version)]
struct Args {
    /// HTML file to convert
    input: PathBuf,

    /// Output path; defaults to the input path with a .docx extension
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camserver=info".into()),
        )
        .init();

    let args = Args::parse();
    if !args.input.exists() {
        anyhow::bail!("input file does not exist: {}", args.input.display());
    }

    let out = report::convert_file(&args.input, args.output.as_deref())?;
    println!("{}", out.display());
    Ok(())
}
