use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    let cli = mangapack::cli::Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    mangapack::logging::init(default_level).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        mangapack::cli::Command::Run(args) => {
            let url = match args.url.as_deref() {
                Some(url) => url.to_owned(),
                None => mangapack::prompt::ask_catalog_url()?,
            };
            let config =
                mangapack::config::PipelineConfig::from_args(&args, &url).context("configure run")?;
            let summary = mangapack::pipeline::run_http(&config, &mangapack::prompt::TerminalPrompt)
                .context("run")?;
            println!("{summary}");
        }
        mangapack::cli::Command::Name(args) => {
            let file_name = chapter_archive_name(&args).context("name")?;
            println!("{file_name}");
        }
    }

    Ok(())
}

fn chapter_archive_name(args: &mangapack::cli::NameArgs) -> anyhow::Result<String> {
    if args.index >= args.chapters {
        anyhow::bail!(
            "--index {} must be below --chapters {}",
            args.index,
            args.chapters
        );
    }
    let width = mangapack::catalog::key_width_for(args.chapters, args.min_key_width);
    let title = mangapack::naming::sanitize_title(&args.title)
        .and_then(|title| mangapack::naming::fit_title(&title, width))
        .ok_or_else(|| anyhow::anyhow!("--title has no filesystem-safe characters"))?;
    let key = mangapack::catalog::chapter_key(args.index, width)?;
    let name = mangapack::naming::chapter_file_name(&title, &key, &args.url);
    Ok(format!("{name}.{}", mangapack::archive::CBZ_EXTENSION))
}
