#![forbid(unsafe_code)]

mod avatar;
mod cli;
mod config;
mod constants;
mod editor;
mod lists;
mod mode;
mod page;
mod profile;
mod store;
mod validation;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use avatar::{CropRegion, ImageBlob};
use cli::{Cli, Command, EditArgs};
use config::AppConfig;
use constants::config::ENV_LOG_LEVEL;
use constants::store::PROFILE_KEY;
use editor::ProfileEditor;
use mode::{Mode, ModeController, SaveError};
use page::ProfilePage;
use store::{FileStore, ProfileRepository};
use validation::StandardRules;

fn log_subscriber(level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish()
}

/// Load the config with logging already live, then install the final
/// subscriber. LOG_LEVEL wins over the config file.
fn load_config_and_init_logging() -> Result<AppConfig> {
    let env_level = std::env::var(ENV_LOG_LEVEL).ok();
    let bootstrap = log_subscriber(env_level.as_deref().unwrap_or("info"));
    let config = tracing::subscriber::with_default(bootstrap, AppConfig::load)?;

    let level = env_level.as_deref().unwrap_or(&config.log_level);
    tracing::subscriber::set_global_default(log_subscriber(level))
        .context("Failed to install log subscriber")?;
    Ok(config)
}

fn open_page(config: &AppConfig) -> ProfilePage<FileStore> {
    let store = FileStore::new(config.store_dir());
    let controller = ModeController::new(
        ProfileRepository::new(store),
        Box::new(StandardRules),
        config.initial_mode,
    );
    ProfilePage::new(controller)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config_and_init_logging()?;

    match cli.command {
        Command::Show => show(&config),
        Command::Edit(args) => edit(&config, args).await,
        Command::ExportAvatar { path } => export_avatar(&config, &path),
        Command::Path => {
            println!("config: {}", AppConfig::path().display());
            println!("store:  {}", FileStore::new(config.store_dir()).path_for(PROFILE_KEY).display());
            Ok(())
        }
    }
}

fn show(config: &AppConfig) -> Result<()> {
    let mut page = open_page(config);
    page.start()?;
    if !page.controller().has_saved_profile() {
        println!("No profile saved yet. Use `edit` to create one.");
        return Ok(());
    }
    print!("{}", page.view());
    Ok(())
}

async fn edit(config: &AppConfig, args: EditArgs) -> Result<()> {
    let mut page = open_page(config);
    if page.start()? == Mode::View {
        page.request_edit()?;
    }
    let editor = page
        .editor_mut()
        .ok_or_else(|| anyhow!("edit session did not open"))?;

    apply_edits(editor, &args).await?;

    match page.submit() {
        Ok(()) => {
            info!("Profile saved");
            print!("{}", page.view());
            Ok(())
        }
        Err(SaveError::Validation(errors)) => {
            for e in &errors {
                eprintln!("{}: {}", e.field, e.message);
            }
            bail!("profile not saved, {} field(s) invalid", errors.len())
        }
        Err(e) => Err(e).context("Failed to save profile"),
    }
}

async fn apply_edits(editor: &mut ProfileEditor, args: &EditArgs) -> Result<()> {
    for set in &args.sets {
        editor.set_field(set.field, set.value.clone());
    }
    if let Some(visibility) = args.visibility {
        editor.set_visibility(visibility);
    }

    for add in &args.adds {
        editor
            .push_item(add.list, add.value.clone())
            .with_context(|| format!("Failed to add to {}", add.list.as_str()))?;
    }
    for update in &args.updates {
        editor
            .update_item(update.target.list, update.target.index, update.value.clone())
            .with_context(|| format!("Failed to update {}[{}]", update.target.list.as_str(), update.target.index))?;
    }
    // Highest index first so earlier removals don't shift later ones
    let mut removes: Vec<_> = args.removes.iter().collect();
    removes.sort_by(|a, b| b.index.cmp(&a.index));
    for remove in removes {
        editor
            .remove_item(remove.list, remove.index)
            .with_context(|| format!("Failed to remove {}[{}]", remove.list.as_str(), remove.index))?;
    }

    if args.remove_avatar {
        editor.remove_avatar();
    }

    if let Some(path) = &args.avatar {
        let blob = ImageBlob::from_path(path)?;
        editor.select_avatar(blob);
        match editor.await_avatar().await {
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e).with_context(|| format!("Cannot use {} as avatar", path.display())),
            None => bail!("avatar decode for {} was cancelled", path.display()),
        }

        let mut region = editor.crop_region().unwrap_or_default();
        match (args.crop, args.zoom) {
            (Some(rect), zoom) => {
                region = CropRegion::new(rect.x, rect.y, rect.width, rect.height, zoom.unwrap_or(region.zoom));
            }
            // Zoom needs a rectangle to shrink, so start from the centred square
            (None, Some(zoom)) => {
                let (width, height) = editor
                    .crop_source_dimensions()
                    .ok_or_else(|| anyhow!("no crop session for {}", path.display()))?;
                region = CropRegion::centred(width, height, zoom);
            }
            (None, None) => {}
        }
        editor.update_crop(region).context("Failed to set crop region")?;
        editor.commit_crop().context("Failed to render avatar")?;
    }
    Ok(())
}

fn export_avatar(config: &AppConfig, path: &Path) -> Result<()> {
    let mut page = open_page(config);
    page.start()?;
    let Some(avatar) = &page.profile().avatar else {
        warn!("Saved profile has no avatar");
        bail!("no avatar saved");
    };

    let bytes = avatar.bytes().context("Stored avatar is not a valid data URI")?;
    if let Err(e) = fs::write(path, &bytes) {
        error!(path = %path.display(), error = %e, "Failed to export avatar");
        return Err(e).with_context(|| format!("Failed to write {}", path.display()));
    }
    info!(path = %path.display(), bytes = bytes.len(), "Exported avatar");
    Ok(())
}
