use std::path::PathBuf;

use media_editor_core::api::server::{default_app_root, serve};
use media_editor_core::config::{load_media_config_from_env, summarize_media_config};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    if matches!(cli_args.first().map(String::as_str), Some("validate-config")) {
        run_validate_config_cli(cli_args.into_iter().skip(1).collect::<Vec<_>>())?;
        return Ok(());
    }
    if matches!(cli_args.first().map(String::as_str), Some("serve")) {
        if wants_help(&cli_args[1..]) {
            print_usage();
            return Ok(());
        }
        let parsed = parse_config_cli_args(&cli_args[1..])?;
        let config = load_media_config_from_env(parsed.app_root.as_path(), parsed.settings_path)?;
        return serve(config).await;
    }
    if wants_help(cli_args.as_slice()) {
        print_usage();
        return Ok(());
    }
    if let Some(unknown) = cli_args.first() {
        print_usage();
        return Err(std::io::Error::other(format!("Unknown command: {unknown}")).into());
    }

    let config = load_media_config_from_env(default_app_root().as_path(), None)?;
    serve(config).await
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigCliArgs {
    app_root: PathBuf,
    settings_path: Option<String>,
}

fn parse_config_cli_args(args: &[String]) -> Result<ConfigCliArgs, Box<dyn std::error::Error>> {
    let mut app_root = default_app_root();
    let mut settings_path = None::<String>;

    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "--app-root" => {
                app_root = PathBuf::from(needs_value(i)?);
                i += 2;
            }
            "--settings" => {
                settings_path = Some(needs_value(i)?);
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }

    Ok(ConfigCliArgs {
        app_root,
        settings_path,
    })
}

fn wants_help(args: &[String]) -> bool {
    args.iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
}

fn run_validate_config_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    if wants_help(args.as_slice()) {
        print_usage();
        return Ok(());
    }

    let parsed = parse_config_cli_args(args.as_slice())?;
    let config = load_media_config_from_env(parsed.app_root.as_path(), parsed.settings_path)?;
    let registry = config.image_definition_configurator()?.build()?;
    let summary = summarize_media_config(&config, registry.names());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn print_usage() {
    eprintln!(
        concat!(
            "Usage:\n",
            "  media-editor-core [serve] [--app-root PATH] [--settings PATH]\n",
            "  media-editor-core validate-config [--app-root PATH] [--settings PATH]\n\n",
            "Environment:\n",
            "  MEDIA_SETTINGS      settings file (default: config/media.settings.toml)\n",
            "  MEDIA_BACKEND_BIND  listen address (default: 127.0.0.1:8790)\n",
            "  MEDIA_BACKEND_DB    SQLite database (default: var/backend/media.db)\n"
        )
    );
}
