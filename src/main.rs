//! Options CLI for Twitter Extras.

fn main() {
    if let Err(e) = extras::cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
