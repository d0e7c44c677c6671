//! Scene archive inspection commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rvl_scene::Scene;

#[derive(Args)]
pub struct InfoArgs {
    /// Scene archive (optionally Yaz0-compressed)
    pub input: PathBuf,
}

#[derive(Args)]
pub struct JsonArgs {
    /// Scene archive (optionally Yaz0-compressed)
    pub input: PathBuf,

    /// Output path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn load_scene(path: &PathBuf) -> Result<(Scene, rvl_scene::ParseReport)> {
    let mut data =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if rvl_yaz0::is_compressed(&data) {
        data = rvl_yaz0::decode(&data)?;
    }
    Ok(Scene::parse(&data)?)
}

pub fn info(args: InfoArgs) -> Result<()> {
    let (scene, report) = load_scene(&args.input)?;

    println!("scene '{}'", scene.name);
    println!("  bones:         {}", scene.bones.len());
    println!("  draw matrices: {}", scene.draw_matrices.len());
    println!(
        "  buffers:       {} position, {} normal, {} color, {} texcoord",
        scene.positions.len(),
        scene.normals.len(),
        scene.colors.len(),
        scene.texcoords.len()
    );
    println!("  materials:     {}", scene.materials.len());
    println!("  meshes:        {}", scene.meshes.len());
    println!("  textures:      {}", scene.textures.len());
    println!("  animations:    {}", scene.animations.len());

    if !scene.joint_lut.is_empty() {
        println!("  joint LUT:     remapped ({} slots)", scene.joint_lut.len());
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    Ok(())
}

pub fn json(args: JsonArgs) -> Result<()> {
    let (scene, _report) = load_scene(&args.input)?;
    let text = serde_json::to_string_pretty(&scene)?;
    match args.output {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}
