use clap::Parser;
use colour::e_red;
use std::env;
use std::path::Path;

mod archive;
mod cli;

use archive::{OUTPUT_NAME, zip_dir};
use cli::Cli;

fn usage(program: &str) -> String {
    format!("Usage: {} path/to/folder", program)
}

fn program_name() -> String {
    env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("zip-folder"))
}

fn main() {
    let cli = Cli::parse();

    // Without a folder there is nothing to do; this is not an error
    let Some(path) = cli.path else {
        println!("{}", usage(&program_name()));
        return;
    };

    if let Err(e) = zip_dir(&path, Path::new(OUTPUT_NAME)) {
        e_red!("❌ {}\n", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_contains_program_name() {
        assert_eq!(
            usage("./zip-folder"),
            "Usage: ./zip-folder path/to/folder"
        );
    }

    #[test]
    fn test_cli_without_path() {
        let cli = Cli::try_parse_from(["zip-folder"]).unwrap();

        assert!(cli.path.is_none());
        assert!(cli.rest.is_empty());
    }

    #[test]
    fn test_cli_extra_arguments_are_ignored() {
        let cli = Cli::try_parse_from(["zip-folder", "first", "second", "-x"]).unwrap();

        assert_eq!(cli.path.unwrap(), Path::new("first"));
        assert_eq!(cli.rest.len(), 2);
    }

    #[test]
    fn test_cli_hyphen_folder_is_a_path() {
        let cli = Cli::try_parse_from(["zip-folder", "-v"]).unwrap();

        assert_eq!(cli.path.unwrap(), Path::new("-v"));
    }

    #[test]
    fn test_cli_help_is_a_path() {
        let cli = Cli::try_parse_from(["zip-folder", "--help"]).unwrap();

        assert_eq!(cli.path.unwrap(), Path::new("--help"));
    }
}
