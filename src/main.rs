use clap::{Args, Parser};
use env_logger::Env;
use music_unboxing::DEFAULT_PREFIX_LEN;

mod unboxing;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
enum Cli {
    /// Decrypt a container and write the recovered audio next to it
    Unboxing(Unboxing),
    /// Print format, codec and metadata read from the head of a file
    Probe(Probe),
}

#[derive(Debug, Args)]
struct Unboxing {
    input: String,

    output: Option<String>,
}

#[derive(Debug, Args)]
struct Probe {
    input: String,

    /// How many leading bytes to read
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN)]
    prefix_bytes: usize,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli {
        Cli::Unboxing(args) => unboxing::apply(args.input, args.output).await,
        Cli::Probe(args) => unboxing::probe(args.input, args.prefix_bytes).await,
    }
}
