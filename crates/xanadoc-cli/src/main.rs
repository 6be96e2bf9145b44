use anyhow::{Context, Result};
use std::{env, path::PathBuf, process};
use xanadoc_config::Config;
use xanadoc_engine::{Defaults, DirectoryFetcher, DocumentModelBuilder, EdlPointer, snapshot};

struct Args {
    json: bool,
    edl: String,
    parts_path: Option<PathBuf>,
}

impl Args {
    fn parse(raw: &[String]) -> Option<Self> {
        let mut json = false;
        let mut positional = Vec::new();
        for arg in raw.iter().skip(1) {
            match arg.as_str() {
                "--json" => json = true,
                _ => positional.push(arg.clone()),
            }
        }
        let mut positional = positional.into_iter();
        let edl = positional.next()?;
        let parts_path = positional.next().map(PathBuf::from);
        if positional.next().is_some() {
            return None;
        }
        Some(Self {
            json,
            edl,
            parts_path,
        })
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [--json] <edl-name> [parts-folder-path]");
    process::exit(1);
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let raw: Vec<String> = env::args().collect();
    let program = raw.first().map(String::as_str).unwrap_or("xanadoc-cli");
    let Some(args) = Args::parse(&raw) else {
        usage(program);
    };

    let config_path = Config::config_path();
    log::debug!("Config path: {}", config_path.display());
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            // A broken config only matters when nothing else says where parts live
            if args.parts_path.is_none() {
                eprintln!("Error: Failed to load config file: {e}");
                usage(program);
            }
            log::warn!("Ignoring config file: {e}");
            None
        }
    };

    let parts_path = match (&args.parts_path, &config) {
        (Some(path), _) => path.clone(),
        (None, Some(config)) => config.parts_path.clone(),
        (None, None) => {
            eprintln!("Error: No parts path provided and no config file found");
            eprintln!("Or create a config file at {}", config_path.display());
            usage(program);
        }
    };

    if !parts_path.is_dir() {
        eprintln!(
            "Error: Parts path '{}' is not a directory",
            parts_path.display()
        );
        process::exit(1);
    }

    log::info!("Reading parts from {}", parts_path.display());
    let fetcher = DirectoryFetcher::new(&parts_path);

    let defaults = match config.as_ref().and_then(|c| c.defaults_edl.as_deref()) {
        Some(name) => Defaults::resolve(&fetcher, &EdlPointer::new(name))
            .with_context(|| format!("Failed to load default links from EDL '{name}'"))?,
        None => Defaults::none(),
    };

    let model = DocumentModelBuilder::new(&fetcher, &defaults)
        .build(&EdlPointer::new(args.edl.as_str()))
        .with_context(|| format!("Failed to build document model for EDL '{}'", args.edl))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot::normalize(&model))?
        );
    } else {
        print!("{}", snapshot::outline(&model));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Option<Args> {
        let raw: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
        Args::parse(&raw)
    }

    #[test]
    fn test_parse_edl_only() {
        let parsed = args(&["xanadoc-cli", "doc"]).unwrap();

        assert!(!parsed.json);
        assert_eq!(parsed.edl, "doc");
        assert_eq!(parsed.parts_path, None);
    }

    #[test]
    fn test_parse_json_flag_anywhere() {
        let parsed = args(&["xanadoc-cli", "doc", "--json", "/parts"]).unwrap();

        assert!(parsed.json);
        assert_eq!(parsed.parts_path, Some(PathBuf::from("/parts")));
    }

    #[test]
    fn test_parse_rejects_missing_or_extra_arguments() {
        assert!(args(&["xanadoc-cli"]).is_none());
        assert!(args(&["xanadoc-cli", "--json"]).is_none());
        assert!(args(&["xanadoc-cli", "doc", "/parts", "extra"]).is_none());
    }
}
