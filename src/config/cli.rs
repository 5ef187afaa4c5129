use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "cloud-shims")]
#[command(about = "Drive the platform storage, identity and conversion adapters by hand")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Store a local file under NAME and print the returned name or key
    Put { name: String, file: PathBuf },
    /// Read a stored object to stdout or to --output
    Get {
        name: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "r")]
        mode: String,
    },
    Exists { name: String },
    Size { name: String },
    Url { name: String },
    #[command(alias = "delete")]
    Rm { name: String },
    /// Rasterize one PDF page into an image
    Convert {
        pdf: PathBuf,
        out: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Resolve the local user for a simulated platform login
    Whoami {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        admin: bool,
        #[arg(long, help = "Mark the request as coming from a backend instance")]
        backend: bool,
    },
}
