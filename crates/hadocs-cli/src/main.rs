#![forbid(unsafe_code)]

//! Thin entrypoint for the `hadocs` binary.

#[tokio::main]
async fn main() {
    let exit_code = hadocs_cli::run().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
