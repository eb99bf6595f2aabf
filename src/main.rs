use clap::Parser;
use std::io;

use hashserve::args::Args;
use hashserve::logging::setup_logging;
use hashserve::server::start_server;

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    setup_logging();
    start_server(args).await
}
