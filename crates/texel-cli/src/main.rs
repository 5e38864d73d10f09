#![forbid(unsafe_code)]

//! `texel` binary entrypoint.

#[tokio::main]
async fn main() {
    let code = texel_cli::run().await;
    std::process::exit(code);
}
