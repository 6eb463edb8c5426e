use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time;

use anyhow::{bail, Context};
use image::imageops;
use log::{debug, info};
use nalgebra::vector;
use obj::{load_obj, Obj, TexturedVertex};
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use tiny_rasterizer::scene::{BLACK, WHITE};
use tiny_rasterizer::util::{Vector2f, Vector3f};
use tiny_rasterizer::{
    render_frame, Camera, DepthBuffer, Face, Frame, Model, Projection, RenderParams, Shading, SolidColor,
    TextureSampler, Viewport,
};

/// Everything the frame driver needs to know, filled from the command line.
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub print_fps: bool,
    pub show_depth: bool,
    pub model_path: PathBuf,
    pub texture_path: Option<PathBuf>,
    pub shading: Shading,
    pub projection: Projection,
    pub depth: f32,
    pub light_direction: Vector3f,
}

/// Reads an obj file and an optional diffuse texture into a model.
/// Texture v axis is flipped, so uv (0, 0) is the first pixel of the loaded image.
pub fn load_model(model_path: &Path, texture_path: Option<&Path>) -> anyhow::Result<Model> {
    let file = File::open(model_path).with_context(|| format!("can't open model {}", model_path.display()))?;
    let obj: Obj<TexturedVertex, u32> = load_obj(BufReader::new(file))
        .with_context(|| format!("can't parse model {}", model_path.display()))?;
    if obj.indices.len() % 3 != 0 {
        bail!("model {} has {} indices, which is not a triangle list", model_path.display(), obj.indices.len());
    }

    // obj-rs merges position and texture indices into one vertex list, so a corner uses the same
    // index for both.
    let vertices: Vec<Vector3f> = obj.vertices.iter()
        .map(|v| vector![v.position[0], v.position[1], v.position[2]])
        .collect();
    let uvs: Vec<Vector2f> = obj.vertices.iter()
        .map(|v| vector![v.texture[0], 1.0 - v.texture[1]])
        .collect();
    let faces: Vec<Face> = obj.indices.chunks_exact(3)
        .map(|corners| {
            let indices = [corners[0] as usize, corners[1] as usize, corners[2] as usize];
            Face { vertices: indices, uvs: indices }
        })
        .collect();

    let texture: Box<dyn TextureSampler> = match texture_path {
        Some(path) => {
            let image = image::open(path).with_context(|| format!("can't load texture {}", path.display()))?;
            info!("Texture {}x{} from {}", image.width(), image.height(), path.display());
            Box::new(image.to_rgb8())
        }
        None => Box::new(SolidColor(WHITE)),
    };

    let model = Model::new(vertices, uvs, faces, texture)?;
    info!("Number of vertices - {}", model.vertex_count());
    info!("Number of faces    - {}", model.face_count());
    return Ok(model);
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }

    return false;
}

/// Actualy launches the window, showing images.
/// Takes struct, defining execution context.
pub fn run(params: Params) -> anyhow::Result<()> {
    let model = load_model(&params.model_path, params.texture_path.as_deref())?;

    let mut frame = Frame::new(params.width, params.height);
    let mut depth_buffer = DepthBuffer::new(params.width, params.height);
    let render_params = RenderParams {
        camera: Camera {
            projection: params.projection,
            viewport: Viewport::full(params.width, params.height, params.depth),
        },
        light_direction: params.light_direction,
        shading: params.shading,
    };

    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut exit = false;
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        let frame_time_begin = time::Instant::now();

        frame.clear(BLACK);
        let stats = render_frame(&model, &mut frame, &mut depth_buffer, &render_params)?;
        debug!(
            "Frame rendered in {} ms: {} drawn, {} culled, {} skipped, {} pixels",
            frame_time_begin.elapsed().as_millis(),
            stats.faces_drawn,
            stats.faces_culled,
            stats.faces_skipped,
            stats.pixels_written,
        );

        if params.show_depth {
            let depth_image = imageops::flip_vertical(&depth_buffer.to_grayscale());
            let image_data = ImageView::new(ImageInfo::mono8(params.width, params.height), depth_image.as_raw());
            window.set_image("image", image_data)?;
        } else {
            let display_image = frame.to_display_image();
            let image_data = ImageView::new(ImageInfo::rgb8(params.width, params.height), display_image.as_raw());
            window.set_image("image", image_data)?;
        }

        // Unloading all the garbage from event channel, that has piled up, looking for exit event.
        exit = event_channel.try_iter().fold(false, |was_exit, window_event| was_exit || is_exit_event(window_event));

        if params.print_fps {
            // Counting frames to printout stats every second.
            frame_counter += 1;
            if frame_counter_time_begin.elapsed().as_secs_f32() > 1.0 {
                info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}
