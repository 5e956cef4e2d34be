use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use modwiki_core::capability::PermissionSet;
use modwiki_core::config::{Settings, load_or_bootstrap};
use modwiki_core::facade::{CommandFacade, command_spec, command_surface, reload_documents};
use modwiki_core::paths::{ResolutionContext, ResolvedPaths, normalize_for_display, resolve_paths};
use modwiki_core::render::{Notice, Render, ShareOutcome, render_notice};
use modwiki_core::repository::EntryRepository;
use modwiki_core::text::Message;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(
    name = "modwiki",
    version,
    about = "Permission-gated wiki entries backed by wiki.conf and entries.conf"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config_dir: Option<PathBuf>,
    #[arg(
        short = 'p',
        long = "permission",
        global = true,
        value_name = "PERMISSION",
        help = "Grant a permission to the requester (repeatable)"
    )]
    permissions: Vec<String>,
    #[arg(long, global = true, default_value = "console", help = "Requester name")]
    name: String,
    #[arg(long, global = true, help = "Print the rendered output as JSON")]
    json: bool,
    #[arg(long, global = true, help = "Print resolved config paths")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config_dir: Option<PathBuf>,
    requester: PermissionSet,
    name: String,
    json: bool,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config_dir: cli.config_dir.clone(),
            requester: PermissionSet::new(cli.permissions.iter().cloned()),
            name: cli.name.clone(),
            json: cli.json,
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List entries, or open one by id")]
    View(ViewArgs),
    #[command(about = "Reload both config documents")]
    Reload,
    #[command(about = "Share an entry with another player")]
    Share(ShareArgs),
    #[command(about = "Write default config documents when missing")]
    Init,
    #[command(about = "Print the command surface as JSON")]
    Surface,
}

#[derive(Debug, Args)]
struct ViewArgs {
    entry: Option<String>,
    #[arg(long, default_value_t = 1, help = "Listing page (1-based)")]
    page: usize,
}

#[derive(Debug, Args)]
struct ShareArgs {
    entry: String,
    recipient: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::View(args)) => run_view(&runtime, args),
        Some(Commands::Reload) => run_reload(&runtime),
        Some(Commands::Share(args)) => run_share(&runtime, args),
        Some(Commands::Init) => run_init(&runtime),
        Some(Commands::Surface) => {
            println!("{}", serde_json::to_string_pretty(command_surface())?);
            Ok(())
        }
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_view(runtime: &RuntimeOptions, args: ViewArgs) -> Result<()> {
    if deny_unless_permitted(runtime, "wiki")? {
        return Ok(());
    }
    let facade = open_facade(runtime)?;
    let snapshot = facade.repository().snapshot();
    let settings = snapshot.settings();

    match facade.view(&runtime.requester, args.entry.as_deref()) {
        Render::Listing { list } if runtime.json => match list.page(args.page) {
            Ok(page) => print_json(&page)?,
            Err(notice) => print_json(&Render::notice(settings, notice))?,
        },
        Render::Listing { list } => match list.render_page(args.page) {
            Ok(page) => print_message(&page),
            Err(notice) => print_notice(settings, &notice),
        },
        render if runtime.json => print_json(&render)?,
        Render::Entry { message } | Render::Notice { message, .. } => print_message(&message),
    }
    Ok(())
}

fn run_reload(runtime: &RuntimeOptions) -> Result<()> {
    if deny_unless_permitted(runtime, "wikireload")? {
        return Ok(());
    }
    let paths = resolve_runtime_paths(runtime)?;
    if runtime.diagnostics {
        println!("[diagnostics]\n{}\n", paths.diagnostics());
    }

    let (_, render) = reload_documents(paths);
    if runtime.json {
        return print_json(&render);
    }
    if let Render::Notice { message, .. } = &render {
        print_message(message);
    }
    Ok(())
}

fn run_share(runtime: &RuntimeOptions, args: ShareArgs) -> Result<()> {
    if deny_unless_permitted(runtime, "wikishare")? {
        return Ok(());
    }
    let facade = open_facade(runtime)?;

    let outcome = facade.share(&args.entry, &args.recipient, &runtime.name);
    if runtime.json {
        return print_json(&outcome);
    }
    match outcome {
        ShareOutcome::Delivered { recipient, message } => {
            println!("to {recipient}:");
            print_message(&message);
        }
        ShareOutcome::Rejected { message, .. } => print_message(&message),
    }
    Ok(())
}

fn run_init(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let loaded = load_or_bootstrap(&paths)?;

    println!("Initialized modwiki config");
    println!("config_dir: {}", normalize_for_display(&paths.config_dir));
    println!("settings_path: {}", normalize_for_display(&paths.settings_path));
    println!("entries_path: {}", normalize_for_display(&paths.entries_path));
    println!(
        "wrote_settings: {}",
        format_flag(loaded.bootstrap.wrote_settings)
    );
    println!(
        "wrote_entries: {}",
        format_flag(loaded.bootstrap.wrote_entries)
    );
    println!("entries: {}", loaded.entries.len());
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn open_facade(runtime: &RuntimeOptions) -> Result<CommandFacade> {
    let paths = resolve_runtime_paths(runtime)?;
    if runtime.diagnostics {
        println!("[diagnostics]\n{}\n", paths.diagnostics());
    }
    let repository = EntryRepository::open(paths)?;
    Ok(CommandFacade::new(Arc::new(repository)))
}

/// Returns `true` after reporting a denial. Runs before any document is
/// touched, so the notice uses default settings.
fn deny_unless_permitted(runtime: &RuntimeOptions, command: &str) -> Result<bool> {
    let spec = command_spec(command)
        .ok_or_else(|| anyhow::anyhow!("unknown command `{command}`"))?;
    let Some(notice) = spec.denial(&runtime.requester) else {
        return Ok(false);
    };
    log::warn!(
        "{} lacks {} for `{}`",
        runtime.name,
        spec.permission,
        spec.name
    );
    let settings = Settings::default().normalized();
    if runtime.json {
        print_json(&Render::notice(&settings, notice))?;
    } else {
        print_notice(&settings, &notice);
    }
    Ok(true)
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    let context = ResolutionContext::from_process()?;
    Ok(resolve_paths(&context, runtime.config_dir.as_deref()))
}

fn print_notice(settings: &Settings, notice: &Notice) {
    print_message(&render_notice(settings, notice));
}

fn print_message(message: &Message) {
    println!("{}", message.plain());
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
