//! Chunk inspector: decodes every chunk of a model from a local directory
//! and reports what the renderer would upload and draw.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::Vec3;
use web_time::Instant;
use wormview::catalog::{AssetCatalog, ModelInfo};
use wormview::codec::Chunk;
use wormview::layers::OpacityInfo;
use wormview::mesh::MeshBuffers;
use wormview::options::Options;
use wormview::renderer::{FramePlan, PartTable};
use wormview::ViewerError;

#[derive(Parser, Debug)]
#[command(name = "wormview", about = "Decode and inspect anatomy mesh chunks")]
struct Cli {
    /// Catalog JSON describing the models.
    catalog: PathBuf,
    /// Directory holding the chunk files named by the catalog.
    chunks: PathBuf,
    /// Model to inspect; defaults to the options' default model, then the
    /// first catalog entry.
    #[arg(short, long)]
    model: Option<String>,
    /// Options preset (TOML).
    #[arg(short, long)]
    options: Option<PathBuf>,
    /// Parts whose merged display lists are printed.
    #[arg(short, long, value_delimiter = ',')]
    active: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    if let Err(e) = run(&Cli::parse()) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<(), ViewerError> {
    let options = cli
        .options
        .as_deref()
        .map_or_else(|| Ok(Options::default()), Options::load)?;
    let catalog = AssetCatalog::load(&cli.catalog)?;
    let name = cli
        .model
        .clone()
        .or_else(|| {
            Some(options.loading.default_model.clone()).filter(|m| !m.is_empty())
        })
        .or_else(|| catalog.model_names().next().map(str::to_owned))
        .ok_or_else(|| ViewerError::Catalog("catalog has no models".to_owned()))?;
    let model = catalog.model(&name)?;

    let table = load_model(cli, model, options.picking.base_color_index)?;
    println!(
        "model '{name}': {} meshes, {} parts ({} distinct), {} layers",
        table.meshes().len(),
        table.part_count(),
        table.ranges().len(),
        model.layer_count()
    );

    let info = OpacityInfo::new(&vec![1.0; model.layer_count()]);
    let plan = FramePlan::build(&table, &info, Vec3::ZERO);
    println!(
        "full-opacity frame: {} batches, {} draw calls",
        plan.opaque.len() + plan.translucent.len(),
        plan.draw_call_count()
    );

    if !cli.active.is_empty() {
        let lists = table
            .ranges()
            .display_lists(cli.active.iter().map(String::as_str));
        let mut meshes: Vec<_> = lists.into_iter().collect();
        meshes.sort_by_key(|(mesh, _)| *mesh);
        for (mesh, list) in meshes {
            let material = &table.meshes()[mesh].material;
            println!("mesh {mesh} ({material}): {:?}", list.to_flat());
        }
        for part in cli.active.iter().filter(|p| !table.ranges().contains(p)) {
            println!("part '{part}' not found");
        }
    }
    Ok(())
}

fn load_model(cli: &Cli, model: &ModelInfo, base_id: u32) -> Result<PartTable, ViewerError> {
    let mut table = PartTable::new(base_id);
    let (mut vertices, mut indices) = (0usize, 0usize);
    for (chunk_id, entries) in &model.urls {
        let started = Instant::now();
        let bytes = std::fs::read(cli.chunks.join(chunk_id))?;
        let chunk = Chunk::parse(bytes, model.format)?;
        let decoded = chunk.decode_all(entries, &model.decode_params)?;
        for (entry, decoded) in entries.iter().zip(decoded) {
            let first_id = table.check_entry(entry)?;
            let buffers = MeshBuffers::build(decoded, &entry.lengths, Some(first_id))?;
            vertices += buffers.vertex_count();
            indices += buffers.indices.len();
            let _ = table.add_mesh(entry, model, &buffers.bboxes)?;
        }
        log::info!("chunk '{chunk_id}': {} entries in {:?}", entries.len(), started.elapsed());
    }
    println!("decoded {vertices} vertices, {indices} indices");
    Ok(table)
}
