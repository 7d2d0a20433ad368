// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command line front end for `facematch`.
//!
//! Lists installed faces with all of their names, shows how a request
//! resolves, and renders verified previews to PNG files. Set `RUST_LOG` to
//! see what the registry and the render pipeline are doing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use facematch::{
    locate::FontFileIndex,
    render::{RenderOptions, SubstitutionPolicy},
    Preview, PreviewOptions, PreviewOrigin, PreviewRequest, PreviewService, RegistryOptions,
    RenderOutcome,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory for cached registry snapshots.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Rebuild the registry even if a cached snapshot matches.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Seconds to wait for the registry to finish building.
    #[arg(long, global = true, default_value_t = 120)]
    wait: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed faces and their aliases.
    Fonts {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the face name and style a request resolves to.
    Resolve(NameArgs),
    /// Render a preview and write it as PNG.
    Render(RenderArgs),
    /// Render every request of a JSON array and write the PNGs to a
    /// directory.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct NameArgs {
    /// Face name as the user sees it.
    name: String,

    /// PostScript name.
    #[arg(long)]
    postscript: Option<String>,

    /// Family name.
    #[arg(long)]
    family: Option<String>,

    /// Style such as "Bold Italic".
    #[arg(long)]
    style: Option<String>,

    /// Other names of the face. May be repeated.
    #[arg(long = "alias")]
    aliases: Vec<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    name: NameArgs,

    /// Text to draw.
    #[arg(long, default_value = "Sample")]
    text: String,

    /// Size in pixels.
    #[arg(long, default_value_t = 24)]
    size: u32,

    /// Wrap width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output PNG file.
    #[arg(long, short)]
    out: PathBuf,

    /// Also accept faces the family heuristic considers the same family.
    #[arg(long)]
    family_heuristic: bool,

    /// Never draw from font files.
    #[arg(long)]
    no_file_fallback: bool,

    /// Extra directories to search for font files. May be repeated.
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
}

impl NameArgs {
    fn request(&self) -> PreviewRequest {
        PreviewRequest {
            name: self.name.clone(),
            postscript_name: self.postscript.clone(),
            family_name: self.family.clone(),
            style: self.style.clone(),
            aliases: self.aliases.clone(),
            ..PreviewRequest::default()
        }
    }
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// JSON file holding an array of preview requests.
    requests: PathBuf,

    /// Directory the PNG files are written to.
    #[arg(long, short)]
    out_dir: PathBuf,

    /// Extra directories to search for font files. May be repeated.
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderSummary<'a> {
    font_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    outcome: &'static str,
    origin: PreviewOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_face: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let registry = RegistryOptions {
        cache_dir: cli.cache_dir.clone(),
        use_cache: !cli.no_cache,
    };
    let mut options = PreviewOptions::default();
    if let Command::Render(args) = &cli.command {
        options.file_fallback = !args.no_file_fallback;
        if args.family_heuristic {
            options.render = RenderOptions {
                policy: SubstitutionPolicy::FamilyHeuristic,
            };
        }
    }
    let mut service = PreviewService::system(registry, options);

    let wait = Duration::from_secs(cli.wait);
    match cli.command {
        Command::Fonts { json } => {
            wait_for_registry(&service, wait)?;
            let catalog = service.catalog();
            if json {
                serde_json::to_writer_pretty(std::io::stdout(), &catalog)?;
                println!();
            } else {
                for entry in catalog {
                    let others: Vec<&str> = entry
                        .aliases
                        .iter()
                        .map(String::as_str)
                        .filter(|alias| *alias != entry.primary_name)
                        .collect();
                    if others.is_empty() {
                        println!("{}", entry.primary_name);
                    } else {
                        println!("{}\t{}", entry.primary_name, others.join(", "));
                    }
                }
            }
        }
        Command::Resolve(args) => {
            wait_for_registry(&service, wait)?;
            let resolved = service.resolve(&args.request());
            let snapshot = service.registry().snapshot();
            let record = snapshot.find(&resolved.face_name);
            let report = serde_json::json!({
                "request": resolved,
                "installed": record.map(|record| record.raw_name()),
                "aliases": snapshot.aliases_for(&resolved.face_name),
            });
            serde_json::to_writer_pretty(std::io::stdout(), &report)?;
            println!();
        }
        Command::Render(args) => {
            wait_for_registry(&service, wait)?;
            if service.options().file_fallback {
                service = service.with_file_index(FontFileIndex::system(&args.font_dirs));
            }
            let request = PreviewRequest {
                text: args.text.clone(),
                size: args.size,
                width: args.width,
                ..args.name.request()
            };
            let preview = service.preview(&request);
            serde_json::to_writer_pretty(std::io::stdout(), &RenderSummary::of(&preview))?;
            println!();
            let image = preview.outcome.into_result()?;
            std::fs::write(&args.out, &image.png)
                .with_context(|| format!("writing {}", args.out.display()))?;
        }
        Command::Batch(args) => {
            let json = std::fs::read_to_string(&args.requests)
                .with_context(|| format!("reading {}", args.requests.display()))?;
            let requests: Vec<PreviewRequest> = serde_json::from_str(&json)
                .with_context(|| format!("parsing {}", args.requests.display()))?;
            wait_for_registry(&service, wait)?;
            if service.options().file_fallback {
                service = service.with_file_index(FontFileIndex::system(&args.font_dirs));
            }
            std::fs::create_dir_all(&args.out_dir)
                .with_context(|| format!("creating {}", args.out_dir.display()))?;
            let previews = service.preview_batch(&requests);
            let summaries: Vec<RenderSummary<'_>> =
                previews.iter().map(RenderSummary::of).collect();
            for (index, preview) in previews.iter().enumerate() {
                let Some(image) = preview.outcome.image() else {
                    continue;
                };
                let stem = match &preview.request_id {
                    Some(id) => id.replace(|ch: char| !ch.is_alphanumeric() && ch != '-', "_"),
                    None => index.to_string(),
                };
                let path = args.out_dir.join(format!("{stem}.png"));
                std::fs::write(&path, &image.png)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            serde_json::to_writer_pretty(std::io::stdout(), &summaries)?;
            println!();
        }
    }
    Ok(())
}

impl<'a> RenderSummary<'a> {
    fn of(preview: &'a Preview) -> Self {
        Self {
            font_name: &preview.font_name,
            request_id: preview.request_id.as_deref(),
            outcome: preview.outcome.class(),
            origin: preview.origin,
            actual_face: preview.outcome.image().map(|image| image.actual_face.as_str()),
            size: preview.outcome.image().map(|image| (image.width, image.height)),
            detail: match &preview.outcome {
                RenderOutcome::Rendered(_) => None,
                RenderOutcome::Substituted { actual, .. } => Some(format!("got '{actual}'")),
                RenderOutcome::Failed(err) => Some(err.to_string()),
            },
        }
    }
}

fn wait_for_registry<B>(service: &PreviewService<B>, wait: Duration) -> anyhow::Result<()>
where
    B: facematch::TextBackend,
{
    if !service.registry().wait_ready(wait) {
        bail!("face registry not ready after {}s", wait.as_secs());
    }
    log::info!("registry ready with {} faces", service.registry().snapshot().len());
    Ok(())
}
