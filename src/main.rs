mod app;

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use nalgebra::vector;

use tiny_rasterizer::scene::WHITE;
use tiny_rasterizer::{Projection, Shading};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Edges of every face, like a debug overlay
    Wireframe,
    /// White faces, lit by face normal
    Flat,
    /// Diffuse texture, lit by face normal
    Textured,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProjectionKind {
    Perspective,
    Orthographic,
}

#[derive(Parser)]
#[command(name = "tiny_rasterizer")]
#[command(about = "Renders an obj model on the CPU and shows it in a window")]
struct Cli {
    /// Path to the .obj model
    #[arg(short = 'p', long, default_value = "assets/african_head.obj")]
    model: PathBuf,
    /// Diffuse texture, sampled by the model uvs
    #[arg(short, long)]
    texture: Option<PathBuf>,
    #[arg(long, default_value_t = 800)]
    width: u32,
    #[arg(long, default_value_t = 800)]
    height: u32,
    #[arg(short = 's', long, value_enum, default_value_t = Mode::Textured)]
    mode: Mode,
    #[arg(long, value_enum, default_value_t = ProjectionKind::Perspective)]
    projection: ProjectionKind,
    /// Distance from the origin to the camera along z, perspective only
    #[arg(long, default_value_t = 3.0)]
    camera_distance: f32,
    /// Depth buffer resolution
    #[arg(long, default_value_t = 255.0)]
    depth: f32,
    /// Direction towards the light as x,y,z
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "0,0,1")]
    light: Vec<f32>,
    #[arg(long)]
    print_fps: bool,
    /// Show the depth buffer instead of the colors
    #[arg(long)]
    show_depth: bool,
}

#[show_image::main]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.light.len() != 3 {
        bail!("--light takes exactly 3 components, got {}", cli.light.len());
    }
    if cli.width == 0 || cli.height == 0 {
        bail!("frame size must be positive");
    }

    let projection = match cli.projection {
        ProjectionKind::Perspective => {
            if cli.camera_distance <= 0.0 {
                bail!("--camera-distance must be positive");
            }
            Projection::Perspective { camera_distance: cli.camera_distance }
        }
        ProjectionKind::Orthographic => Projection::Orthographic,
    };
    let shading = match cli.mode {
        Mode::Wireframe => Shading::Wireframe(WHITE),
        Mode::Flat => Shading::Flat(WHITE),
        Mode::Textured => Shading::Textured,
    };

    let params = app::Params {
        width: cli.width,
        height: cli.height,
        print_fps: cli.print_fps,
        show_depth: cli.show_depth,
        model_path: cli.model,
        texture_path: cli.texture,
        shading,
        projection,
        depth: cli.depth,
        light_direction: vector![cli.light[0], cli.light[1], cli.light[2]],
    };

    app::run(params)?;

    return Ok(());
}
