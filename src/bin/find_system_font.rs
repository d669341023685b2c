//! Resolve font names the way a renderer would.
//!
//! Prints the file, container type and face index chosen for every name,
//! including substitutions.
//!
//! Usage:
//!   cargo run --bin find_system_font -- Helvetica Arial-BoldMT
//!   cargo run --bin find_system_font -- --json --font-dir /opt/fonts Times-Italic
//!   RUST_LOG=debug cargo run --bin find_system_font -- --data-dir /usr/share/pdf-data Foo

use pdf_registry::fonts::FontDescriptor;
use pdf_registry::{RawResourceLoader, RegistryConfig, ResourceRegistry, Settings};
use std::path::PathBuf;
use std::process::ExitCode;

struct ProbeConfig {
    names: Vec<String>,
    data_dirs: Vec<PathBuf>,
    font_dirs: Vec<PathBuf>,
    json: bool,
    quiet: bool,
}

impl ProbeConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self {
            names: Vec::new(),
            data_dirs: Vec::new(),
            font_dirs: Vec::new(),
            json: false,
            quiet: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--data-dir" => {
                    i += 1;
                    if i < args.len() {
                        config.data_dirs.push(PathBuf::from(&args[i]));
                    }
                },
                "--font-dir" => {
                    i += 1;
                    if i < args.len() {
                        config.font_dirs.push(PathBuf::from(&args[i]));
                    }
                },
                "--json" => config.json = true,
                "--quiet" | "-q" => config.quiet = true,
                name => config.names.push(name.to_string()),
            }
            i += 1;
        }

        config
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let config = ProbeConfig::from_args();
    if config.names.is_empty() {
        eprintln!("Usage: find_system_font [--json] [--quiet] [--data-dir DIR] [--font-dir DIR] NAME...");
        return ExitCode::FAILURE;
    }

    let settings = Settings::default().with_err_quiet(config.quiet);
    let registry =
        ResourceRegistry::new(RawResourceLoader, RegistryConfig::default().with_settings(settings));

    for dir in &config.data_dirs {
        if let Err(e) = registry.scan_data_dir(dir) {
            eprintln!("Error: {}: {}", dir.display(), e);
        }
    }
    for dir in &config.font_dirs {
        registry.add_font_dir(dir.clone());
    }

    let mut failed = false;
    for name in &config.names {
        // A file found in a font directory wins, as for Type 1 base fonts
        if let Some(path) = registry.find_font_file(name) {
            println!("{}: {}", name, path.display());
            continue;
        }

        match registry.find_system_font(&FontDescriptor::named(name.as_str())) {
            Ok(Some(info)) if config.json => match serde_json::to_string(&*info) {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    eprintln!("Error: {}: {}", name, e);
                    failed = true;
                },
            },
            Ok(Some(info)) => {
                let style = match (info.bold, info.italic) {
                    (true, true) => "bold italic",
                    (true, false) => "bold",
                    (false, true) => "italic",
                    (false, false) => "regular",
                };
                println!(
                    "{}: {} [{:?}, index {}, {}]",
                    name,
                    info.path.display(),
                    info.container_type,
                    info.font_index,
                    style
                );
            },
            Ok(None) => println!("{}: embedded", name),
            Err(e) => {
                eprintln!("Error: {}: {}", name, e);
                failed = true;
            },
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
