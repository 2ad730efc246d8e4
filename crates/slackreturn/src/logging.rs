/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` (the count of `-v` flags)
/// picks the level for this crate.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("slackreturn={level}"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
