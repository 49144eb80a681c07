use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use stepscribe::archive::default_project_path;
use stepscribe::export::default_output_path;
use stepscribe::recorder::highlight::HighlightStyle;
use stepscribe::recorder::session::Session;
use stepscribe::recorder::worker::StepEvent;
use stepscribe::{settings, Annotation, AnnotationKind, Placement, Recorder, Settings};

#[derive(Parser, Debug)]
#[command(name = "stepscribe")]
#[command(version, about = "Record clicks as annotated screenshots and export them as a PDF guide")]
struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record clicks until Enter is pressed, then save the project
    Record {
        /// Project bundle to write
        #[arg(long, value_name = "ZIP")]
        project: Option<PathBuf>,
        /// Also export a PDF to this file
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,
        /// Document title
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Render a saved project as PDF
    Export {
        project: PathBuf,
        /// Output file (defaults to <export_path>/<title>.pdf)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Change a step's title or annotations inside a saved project
    Edit {
        project: PathBuf,
        /// 1-based step number
        #[arg(long)]
        step: usize,
        #[arg(long)]
        title: Option<String>,
        /// Banner above the screenshot, as KIND:TEXT (e.g. "tip:Use the menu")
        #[arg(long = "before", value_name = "KIND:TEXT")]
        before: Vec<String>,
        /// Banner below the screenshot, as KIND:TEXT
        #[arg(long = "after", value_name = "KIND:TEXT")]
        after: Vec<String>,
        /// Remove the Nth banner above the screenshot (1-based)
        #[arg(long, value_name = "N")]
        remove_before: Vec<usize>,
        /// Remove the Nth banner below the screenshot (1-based)
        #[arg(long, value_name = "N")]
        remove_after: Vec<usize>,
    },
    /// Show settings, applying any given overrides
    Settings {
        /// Highlight diameter in pixels
        #[arg(long, value_name = "PX")]
        highlight_size: Option<u32>,
        /// Highlight colour as r,g,b,a
        #[arg(long, value_name = "R,G,B,A")]
        highlight_color: Option<String>,
        #[arg(long, value_name = "DIR")]
        export_path: Option<PathBuf>,
        #[arg(long, value_enum)]
        style: Option<StyleArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Ring,
    OutlinedDisk,
}

impl From<StyleArg> for HighlightStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Ring => HighlightStyle::Ring,
            StyleArg::OutlinedDisk => HighlightStyle::OutlinedDisk,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => settings::load_from(path),
        None => settings::load(),
    };

    match cli.command {
        Command::Record {
            project,
            pdf,
            title,
        } => record(settings, project, pdf, &title),
        Command::Export {
            project,
            out,
            title,
        } => export(settings, &project, out, &title),
        Command::Edit {
            project,
            step,
            title,
            before,
            after,
            remove_before,
            remove_after,
        } => {
            let edits = StepEdits {
                title,
                before,
                after,
                remove_before,
                remove_after,
            };
            edit(settings, &project, step, edits)
        }
        Command::Settings {
            highlight_size,
            highlight_color,
            export_path,
            style,
        } => {
            let mut updated = settings.clone();
            if let Some(size) = highlight_size {
                updated.highlight_size = size;
            }
            if let Some(color) = highlight_color {
                updated.highlight_color = parse_color(&color)?;
            }
            if let Some(dir) = export_path {
                updated.export_path = dir;
            }
            if let Some(style) = style {
                updated.highlight_style = style.into();
            }
            let updated = updated.sanitized();
            if updated != settings {
                match &cli.config {
                    Some(path) => settings::save_to(path, &updated)?,
                    None => settings::save(&updated)?,
                }
                log::info!("Settings saved");
            }
            println!("{}", serde_json::to_string_pretty(&updated)?);
            Ok(())
        }
    }
}

fn record(
    settings: Settings,
    project: Option<PathBuf>,
    pdf: Option<PathBuf>,
    title: &str,
) -> anyhow::Result<()> {
    Session::cleanup_all_sessions(&Session::default_root());

    let mut recorder = Recorder::new(settings);
    let events = recorder.subscribe();
    recorder.start()?;

    std::thread::spawn(move || {
        for StepEvent::Added(step) in events.iter() {
            println!("Step {} captured: {}", step.index + 1, step.image_path.display());
        }
    });

    println!("Recording. Click through your task, then press Enter to stop.");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let steps = recorder.stop()?;
    println!("Captured {} steps", steps.len());

    let project = project.unwrap_or_else(default_project_path);
    recorder.save_project(&project)?;
    println!("Project saved to {}", project.display());

    if let Some(pdf) = pdf {
        let pages = recorder.export_pdf(&pdf, title)?;
        println!("Exported {pages} pages to {}", pdf.display());
    }
    Ok(())
}

fn export(
    settings: Settings,
    project: &Path,
    out: Option<PathBuf>,
    title: &str,
) -> anyhow::Result<()> {
    let out = out.unwrap_or_else(|| default_output_path(&settings.export_path, title));
    let mut recorder = Recorder::new(settings);
    let loaded = recorder
        .load_project(project)
        .with_context(|| format!("Failed to load {}", project.display()))?;
    // The extracted screenshots go away whether or not the export worked.
    let result = recorder.export_pdf(&out, title);
    recorder.discard();
    let pages = result?;
    println!("Exported {loaded} steps on {pages} pages to {}", out.display());
    Ok(())
}

struct StepEdits {
    title: Option<String>,
    before: Vec<String>,
    after: Vec<String>,
    remove_before: Vec<usize>,
    remove_after: Vec<usize>,
}

fn edit(settings: Settings, project: &Path, step: usize, edits: StepEdits) -> anyhow::Result<()> {
    let position = step
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Step numbers start at 1"))?;
    let mut recorder = Recorder::new(settings);
    recorder
        .load_project(project)
        .with_context(|| format!("Failed to load {}", project.display()))?;

    let result = apply_edits(&recorder, position, edits).and_then(|()| {
        recorder.save_project(project)?;
        Ok(())
    });
    recorder.discard();
    result?;
    println!("Updated step {step} in {}", project.display());
    Ok(())
}

fn apply_edits(recorder: &Recorder, position: usize, edits: StepEdits) -> anyhow::Result<()> {
    let store = recorder.store();
    if let Some(title) = edits.title {
        store.set_title(position, title)?;
    }
    for (placement, numbers) in [
        (Placement::Before, edits.remove_before),
        (Placement::After, edits.remove_after),
    ] {
        let mut numbers = numbers;
        // Highest first so earlier removals do not shift later ones.
        numbers.sort_unstable_by(|a, b| b.cmp(a));
        numbers.dedup();
        for n in numbers {
            let index = n
                .checked_sub(1)
                .ok_or_else(|| anyhow!("Banner numbers start at 1"))?;
            store.remove_annotation(position, placement, index)?;
        }
    }
    for entry in &edits.before {
        store.add_annotation(position, Placement::Before, parse_annotation(entry)?)?;
    }
    for entry in &edits.after {
        store.add_annotation(position, Placement::After, parse_annotation(entry)?)?;
    }
    Ok(())
}

fn parse_annotation(entry: &str) -> anyhow::Result<Annotation> {
    let (kind, text) = entry
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected KIND:TEXT, got \"{entry}\""))?;
    let kind: AnnotationKind = kind.trim().parse().map_err(|e: String| anyhow!(e))?;
    Ok(Annotation::new(kind, text.trim()))
}

fn parse_color(s: &str) -> anyhow::Result<[u8; 4]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        bail!("Expected r,g,b,a with four values, got \"{s}\"");
    }
    let mut color = [0u8; 4];
    for (slot, part) in color.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .with_context(|| format!("\"{part}\" is not a value between 0 and 255"))?;
    }
    Ok(color)
}
