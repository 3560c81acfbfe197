use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use charlib::config::Config;
use charlib::export;
use charlib::library::CharacterLibrary;
use charlib::logging;

struct Args {
    config_path: Option<PathBuf>,
    roots: Vec<PathBuf>,
    no_metadata: bool,
    refresh: bool,
    command: Vec<String>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config_path: None,
        roots: Vec::new(),
        no_metadata: false,
        refresh: false,
        command: Vec::new(),
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("charlib {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < argv.len() {
                    parsed.config_path = Some(PathBuf::from(&argv[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--root" | "-r" => {
                if i + 1 < argv.len() {
                    parsed.roots.push(PathBuf::from(&argv[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --root requires a path argument");
                    std::process::exit(1);
                }
            }
            "--no-metadata" => parsed.no_metadata = true,
            "--refresh" => parsed.refresh = true,
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => parsed.command.push(arg.to_string()),
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"charlib - character library manager for AI-generated character image sets

USAGE:
    charlib [OPTIONS] COMMAND [ARGS]

COMMANDS:
    list                          List discovered characters, newest first
    show SESSION CHARACTER        Show one character in detail
    stats                         Library-wide statistics
    export SESSION CHARACTER      Export one character as a ZIP archive
    export-batch SESSION/CHARACTER...
                                  Export several characters into one archive
    estimate SESSION/CHARACTER... Estimate archive size without building it
    delete SESSION CHARACTER      Delete a character directory

OPTIONS:
    --root, -r PATH     Scan root (repeatable; overrides configured roots)
    --config, -c PATH   Path to config file
    --no-metadata       Exclude metadata and summaries from exports
    --refresh           Bypass the discovery cache
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    CHARLIB_LOG         Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/charlib/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let roots = if args.roots.is_empty() {
        config.library.roots.clone()
    } else {
        args.roots.clone()
    };
    let mut library =
        CharacterLibrary::with_cache_window(roots, Duration::from_secs(config.library.cache_secs));

    let include_metadata = if args.no_metadata {
        false
    } else {
        config.export.include_metadata_by_default
    };

    let command: Vec<&str> = args.command.iter().map(|s| s.as_str()).collect();
    match command.as_slice() {
        ["list"] => cmd_list(&mut library, args.refresh),
        ["show", session, character] => cmd_show(&mut library, session, character),
        ["stats"] => cmd_stats(&mut library),
        ["export", session, character] => {
            cmd_export(&mut library, session, character, include_metadata)
        }
        ["export-batch", identities @ ..] => {
            cmd_export_batch(&mut library, identities, include_metadata, &config)
        }
        ["estimate", identities @ ..] => cmd_estimate(&mut library, identities, &config),
        ["delete", session, character] => cmd_delete(&mut library, session, character),
        [] => {
            print_help();
            std::process::exit(1);
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            print_help();
            std::process::exit(1);
        }
    }
}

fn cmd_list(library: &mut CharacterLibrary, refresh: bool) -> Result<()> {
    let records = library.discover(refresh);
    if records.is_empty() {
        println!("No characters found");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}/{}  {} images  {}",
            record.session_id,
            record.character_id,
            record.total_images,
            record.creation_date.format("%Y-%m-%d %H:%M:%S")
        );
    }
    let total_images: usize = records.iter().map(|r| r.total_images).sum();
    println!(
        "\nFound {} characters with {} total images",
        records.len(),
        total_images
    );
    Ok(())
}

fn cmd_show(library: &mut CharacterLibrary, session: &str, character: &str) -> Result<()> {
    let Some(record) = library.find(session, character) else {
        eprintln!("Character not found: {}/{}", session, character);
        std::process::exit(1);
    };

    println!("Character ID: {}", record.character_id);
    println!("Session:      {}", record.session_id);
    println!("Directory:    {}", record.directory.display());
    println!(
        "Created:      {}",
        record.creation_date.format("%Y-%m-%d %H:%M:%S")
    );
    println!("Total Images: {}", record.total_images);
    println!(
        "Base Character:       {}",
        if record.has_base_image() { "yes" } else { "no" }
    );
    println!("Realistic Variations: {}", record.realistic_count);
    if !record.styled_counts.is_empty() {
        println!("Styled Images:");
        for (style, count) in &record.styled_counts {
            println!("  - {}: {}", style, count);
        }
    }
    if let Some(prompt) = &record.prompt {
        println!("\nOriginal Prompt:\n{}", prompt);
    }
    Ok(())
}

fn cmd_stats(library: &mut CharacterLibrary) -> Result<()> {
    let stats = library.statistics();
    println!("Characters: {}", stats.total_characters);
    println!("Sessions:   {}", stats.total_sessions);
    println!("Images:     {}", stats.total_images);
    println!(
        "Average images per character: {:.1}",
        stats.average_images_per_character
    );
    if !stats.style_breakdown.is_empty() {
        println!("Style breakdown:");
        for (style, count) in &stats.style_breakdown {
            println!("  - {}: {}", style, count);
        }
    }
    if let Some(range) = &stats.creation_date_range {
        println!("Earliest: {}", range.earliest);
        println!("Latest:   {}", range.latest);
    }
    Ok(())
}

fn cmd_export(
    library: &mut CharacterLibrary,
    session: &str,
    character: &str,
    include_metadata: bool,
) -> Result<()> {
    let Some(record) = library.find(session, character) else {
        eprintln!("Character not found: {}/{}", session, character);
        std::process::exit(1);
    };

    let outcome = export::export_character(&record, include_metadata);
    report_outcome(outcome)
}

fn cmd_export_batch(
    library: &mut CharacterLibrary,
    identities: &[&str],
    include_metadata: bool,
    config: &Config,
) -> Result<()> {
    let records = resolve_selection(library, identities);

    warn_if_large(&records, config);
    let outcome = export::export_batch(&records, include_metadata);
    report_outcome(outcome)
}

fn cmd_estimate(
    library: &mut CharacterLibrary,
    identities: &[&str],
    config: &Config,
) -> Result<()> {
    let records = resolve_selection(library, identities);
    let (bytes, human) = export::estimate_archive_size(&records);
    println!(
        "Estimated archive size for {} characters: {}",
        records.len(),
        human
    );
    if bytes > config.export.size_warning_mb * 1024 * 1024 {
        println!(
            "Warning: estimate exceeds {} MB",
            config.export.size_warning_mb
        );
    }
    Ok(())
}

fn cmd_delete(library: &mut CharacterLibrary, session: &str, character: &str) -> Result<()> {
    let Some(record) = library.find(session, character) else {
        eprintln!("Character not found: {}/{}", session, character);
        std::process::exit(1);
    };

    let (success, message) = library.delete(&record);
    println!("{}", message);
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Resolve `SESSION/CHARACTER` arguments against the library; with no
/// arguments, the whole library is selected. Unknown identities are reported
/// and skipped.
fn resolve_selection(
    library: &mut CharacterLibrary,
    identities: &[&str],
) -> Vec<charlib::CharacterRecord> {
    if identities.is_empty() {
        return library.discover(false);
    }

    let mut records = Vec::new();
    for identity in identities {
        let Some((session, character)) = identity.split_once('/') else {
            eprintln!("Invalid identity (expected SESSION/CHARACTER): {}", identity);
            continue;
        };
        match library.find(session, character) {
            Some(record) => records.push(record),
            None => eprintln!("Character not found: {}", identity),
        }
    }
    records
}

fn warn_if_large(records: &[charlib::CharacterRecord], config: &Config) {
    let (bytes, human) = export::estimate_archive_size(records);
    if bytes > config.export.size_warning_mb * 1024 * 1024 {
        eprintln!(
            "Warning: estimated archive size {} exceeds {} MB",
            human, config.export.size_warning_mb
        );
    }
}

fn report_outcome(outcome: export::ExportOutcome) -> Result<()> {
    println!("{}", outcome.message);
    match outcome.archive_path {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => std::process::exit(1),
    }
}
