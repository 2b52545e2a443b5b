use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

// Every argument is a path, so even `-v` or `--help` name a folder
#[derive(Parser)]
#[command(
    name = "zip-folder",
    about = "A tool for compressing a folder into out.zip"
)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct Cli {
    /// Folder to compress
    #[arg(allow_hyphen_values = true)]
    pub path: Option<PathBuf>,

    #[allow(dead_code)] // Accepted and ignored, only the first argument is used
    #[arg(hide = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}
