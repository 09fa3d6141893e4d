//! Thin CLI wrapper over the library: reads HTML from a file or stdin,
//! sanitizes it against the bundled default schema, and writes the
//! result to stdout.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sanitize", about = "Sanitize an HTML fragment")]
struct Args {
    /// File to read HTML from. Reads stdin if omitted.
    input: Option<PathBuf>,

    /// Drop every href/src instead of passing URIs through unchanged.
    #[arg(long)]
    strip_links: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
    }

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let identity = |uri: &str| Some(uri.to_string());
    let rewriter: Option<&dyn html_sanitizer::UriRewriter> = if args.strip_links { None } else { Some(&identity) };

    let output = html_sanitizer::sanitize(&input, rewriter, None);
    println!("{output}");
    Ok(())
}
