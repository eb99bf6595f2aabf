use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:12020")]
    pub listen_addr: String,

    /// Root directory to serve files from (created if missing)
    #[arg(short, long, default_value = "./artifactory")]
    pub serve_dir: PathBuf,

    /// HTML template used for directory listings instead of the built-in one
    #[arg(short = 't', long)]
    pub listing_template: Option<PathBuf>,
}
