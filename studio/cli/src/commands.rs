//! Command handlers
//!
//! Each subcommand maps onto one or more [`Workflow`] calls. Progress is not
//! printed here: [`follow_progress`] watches the store and logs loading
//! messages and screen changes as they are committed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use studio_core::{
    route_state, BackendStatus, GenerationService, Screen, SectionUpdate, Spec, StateStore,
    Workflow,
};

use crate::{Command, KeyAction};

/// Log loading messages and screen changes until aborted
pub(crate) fn follow_progress(store: StateStore) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        let mut screen: Option<Screen> = None;
        let mut message = String::new();

        while changes.changed().await.is_ok() {
            let (next_screen, loading) = store.read(|s| (route_state(s), s.loading.clone()));

            if screen != Some(next_screen) {
                info!(screen = %next_screen, "Screen");
                screen = Some(next_screen);
            }
            if loading.active && loading.message != message {
                info!("{}", loading.message);
                message = loading.message;
            } else if !loading.active {
                message.clear();
            }
        }
    })
}

/// Run one subcommand
pub(crate) async fn run<S: GenerationService>(
    workflow: &Workflow<S>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Health => health(workflow).await,
        Command::Templates { category } => templates(workflow, category.as_deref()).await,
        Command::Categories => {
            for category in workflow.load_categories().await? {
                println!("{category}");
            }
            Ok(())
        }
        Command::Key { action } => key(workflow, action).await,
        Command::Topic {
            topic,
            template,
            image,
            prompt,
            out,
        } => {
            workflow.start_topic();
            choose_template(workflow, &template).await?;
            workflow.research(&topic).await?;
            let spec = workflow.generate_spec_from_research().await?;
            print_spec(&spec);
            if image {
                render(workflow, prompt, &out).await?;
            }
            Ok(())
        }
        Command::Manual {
            title,
            body,
            sections,
            template,
            image,
            prompt,
            out,
        } => {
            workflow.start_manual();
            fill_manual(workflow, title, body, &sections)?;
            choose_template(workflow, &template).await?;
            let spec = workflow.generate_spec_from_manual().await?;
            print_spec(&spec);
            if image {
                render(workflow, prompt, &out).await?;
            }
            Ok(())
        }
        Command::Export {
            format,
            image_path,
            out,
        } => {
            let bytes = workflow.export(format, &image_path).await?;
            write_output(&out, &bytes)?;
            println!("{}", out.display());
            Ok(())
        }
    }
}

async fn health<S: GenerationService>(workflow: &Workflow<S>) -> Result<()> {
    let status = workflow.check_backend().await;
    println!("{status}");
    if status == BackendStatus::Offline {
        bail!("Generation service is unreachable");
    }
    Ok(())
}

async fn templates<S: GenerationService>(
    workflow: &Workflow<S>,
    category: Option<&str>,
) -> Result<()> {
    for template in workflow.load_templates(category).await? {
        println!(
            "{:<24} {:<12} {}",
            template.id, template.category, template.name
        );
    }
    Ok(())
}

async fn key<S: GenerationService>(workflow: &Workflow<S>, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { value } => {
            workflow.save_credential(value.trim());
            workflow
                .store()
                .flush_credential()
                .context("Failed to save API key")?;
            println!("API key saved");
        }
        KeyAction::Test { value } => {
            let candidate = value.unwrap_or_else(|| workflow.store().credential());
            let check = workflow.test_credential(&candidate).await;
            println!("{}", check.message);
            if !check.valid {
                bail!("API key rejected");
            }
        }
        KeyAction::Show => println!("{}", mask_credential(&workflow.store().credential())),
        KeyAction::Clear => {
            workflow.save_credential("");
            println!("API key cleared");
        }
    }
    Ok(())
}

/// Look a template up by id and select it
async fn choose_template<S: GenerationService>(
    workflow: &Workflow<S>,
    template_id: &str,
) -> Result<()> {
    let templates = workflow
        .load_templates(None)
        .await
        .context("Failed to load templates")?;
    let Some(template) = templates.into_iter().find(|t| t.id == template_id) else {
        bail!("Unknown template '{template_id}' (see `vibe-studio templates`)");
    };
    workflow.select_template(template);
    Ok(())
}

fn fill_manual<S: GenerationService>(
    workflow: &Workflow<S>,
    title: String,
    body: String,
    sections: &[String],
) -> Result<()> {
    let store = workflow.store();
    store.set_manual_title(title);
    store.set_manual_body(body);

    for raw in sections {
        let (title, content) = parse_section(raw)?;
        let id = store.add_section();
        store.update_section(
            id,
            SectionUpdate {
                title: Some(title),
                content: Some(content),
            },
        );
    }
    Ok(())
}

/// Split `TITLE=CONTENT`
fn parse_section(raw: &str) -> Result<(String, String)> {
    let Some((title, content)) = raw.split_once('=') else {
        bail!("Invalid section '{raw}': expected TITLE=CONTENT");
    };
    let title = title.trim();
    if title.is_empty() {
        bail!("Invalid section '{raw}': empty title");
    }
    Ok((title.to_string(), content.trim().to_string()))
}

async fn render<S: GenerationService>(
    workflow: &Workflow<S>,
    prompt: Option<String>,
    out: &Path,
) -> Result<()> {
    let generated = workflow.generate_image(prompt).await?;
    info!(preview = %generated.preview_url, "Image ready");

    let path = output_path(out, &generated.image.filename)?;
    let bytes = workflow
        .download(&generated.image.filename)
        .await
        .context("Failed to download image")?;
    write_output(&path, &bytes)?;

    println!("image: {}", path.display());
    println!("service path: {}", generated.image.path);
    Ok(())
}

/// Place a service-supplied file name inside `out`
///
/// Only a bare file name is accepted; anything carrying directories or
/// parent components is refused.
fn output_path(out: &Path, filename: &str) -> Result<PathBuf> {
    match Path::new(filename).file_name().and_then(|name| name.to_str()) {
        Some(name) if name == filename => Ok(out.join(name)),
        _ => bail!("Refusing to write service file name {filename:?} outside {out:?}"),
    }
}

fn print_spec(spec: &Spec) {
    println!("{}", spec.title);
    if !spec.one_liner.is_empty() {
        println!("  {}", spec.one_liner);
    }
    for (i, section) in spec.sections.iter().enumerate() {
        println!("  {}. {}", i + 1, section.title);
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {parent:?}"))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {path:?}"))?;
    if bytes.is_empty() {
        warn!(path = ?path, "Wrote an empty file");
    }
    Ok(())
}

/// First four characters, the rest hidden
fn mask_credential(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 8 {
        "*".repeat(8)
    } else {
        format!("{visible}{}", "*".repeat(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_stays_in_output_dir() {
        let out = Path::new("renders");
        assert_eq!(
            output_path(out, "vibe_1700000000.png").unwrap(),
            PathBuf::from("renders/vibe_1700000000.png")
        );
        assert!(output_path(out, "/tmp/evil.png").is_err());
        assert!(output_path(out, "../../outside.png").is_err());
        assert!(output_path(out, "nested/image.png").is_err());
        assert!(output_path(out, "..").is_err());
        assert!(output_path(out, "").is_err());
    }

    #[test]
    fn test_parse_section() {
        assert_eq!(
            parse_section("Highlights = New markets").unwrap(),
            ("Highlights".to_string(), "New markets".to_string())
        );
        assert_eq!(
            parse_section("Formula=a=b").unwrap(),
            ("Formula".to_string(), "a=b".to_string())
        );
        assert!(parse_section("no separator").is_err());
        assert!(parse_section("=content").is_err());
    }

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential(""), "(not set)");
        assert_eq!(mask_credential("short"), "********");
        assert_eq!(mask_credential("AIzaSyExample123"), "AIza********");
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vibe_1.png");

        write_output(&path, b"png-bytes").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }
}
