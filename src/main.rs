// Local modules
mod bvh;
mod camera;
mod color;
mod integrator;
mod material;
mod point;
mod primitive;
mod progress;
mod ray;
mod scene;
mod utils;
mod vector;

// External/std libraries for main
use clap::{App, Arg};
use image::png::PNGEncoder;
use image::ColorType;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::{
    cmp, fs, fs::OpenOptions, io, io::Write, path, process, sync::Arc, sync::Mutex, thread,
    time::Instant,
};

// Use statements for local modules
use crate::color::RGB;
use crate::progress::Progress;
use crate::scene::Scene;

const COLOR_SPACE: f32 = 255.0_f32;
// Output gamma; applied after clamping to [0, 1].
const GAMMA: f32 = 0.6_f32;

// Decorrelates the per-tile RNG streams.
const TILE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15_u64;

fn main() {
    // Define command line args
    let matches = App::new("Pathtracer")
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .value_name("SEED")
                .help("Base seed for the per-tile random number generators")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("IN_SCENE_FILE")
                .help("The scene specification to render")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUT_FILEPATH")
                .help("The relative filepath to write the output image to")
                .required(true)
                .index(2),
        )
        .get_matches();

    // Grab a stamp for the start of the run
    let program_start = Instant::now();

    // Renders are deterministic for a fixed seed and tile grid.
    let seed = matches
        .value_of("seed")
        .unwrap_or("0")
        .parse::<u64>()
        .expect("seed requires a valid unsigned integer");

    // Read the scene spec file
    let scene_spec_path = path::Path::new(matches.value_of("IN_SCENE_FILE").unwrap());
    let scene_str = fs::read_to_string(&scene_spec_path).expect("Failed to read scene spec file.");
    let scene = Arc::new(
        scene::deserialize(
            &scene_str,
            match scene_spec_path.parent() {
                Some(p) => p,
                None => path::Path::new("/"),
            },
        )
        .expect("Failed to parse scene spec JSON."),
    );

    // Create the output file up front so a bad path fails before the render
    let out_path = path::Path::new(matches.value_of("OUT_FILEPATH").unwrap());
    let out_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(out_path)
        .expect("Failed to create new file");

    // Specifications
    let res_x = scene.logistics.resolution_x;
    let res_y = scene.logistics.resolution_y;
    println!("SPP: {}", scene.logistics.samples);

    // Init output color float data with empty values.
    let framebuffer = Arc::new(Mutex::new(Vec::new()));
    {
        (*framebuffer
            .lock()
            .expect("Failed to acquire output data lock for resizing."))
        .resize_with((res_x * res_y) as usize, RGB::black);
    }

    // Set up a structure to track progress and print to standard out
    let progress_tracker = Arc::new(Mutex::new(Progress::new(
        res_x as u64 * res_y as u64,
        Arc::new(Mutex::new(io::stdout())),
        20_u32,
    )));

    // One worker per tile of the image; rows advance by the vertical
    // stride, columns by the horizontal one.
    let tiles_x = cmp::max(scene.logistics.tiles_x, 1_u32);
    let tiles_y = cmp::max(scene.logistics.tiles_y, 1_u32);
    let stride_x = (res_x + tiles_x - 1) / tiles_x;
    let stride_y = (res_y + tiles_y - 1) / tiles_y;

    let mut workers = Vec::new();
    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let rows = (
                tile_y * stride_y,
                cmp::min((tile_y + 1) * stride_y, res_y),
            );
            let cols = (
                tile_x * stride_x,
                cmp::min((tile_x + 1) * stride_x, res_x),
            );
            let tile_index = (tile_y * tiles_x + tile_x) as u64;
            let rng = SmallRng::seed_from_u64(seed.wrapping_add(
                tile_index.wrapping_mul(TILE_SEED_STRIDE),
            ));

            let worker_scene = Arc::clone(&scene);
            let worker_framebuffer = Arc::clone(&framebuffer);
            let worker_progress = Arc::clone(&progress_tracker);
            workers.push(thread::spawn(move || {
                render_tile(
                    &worker_scene,
                    rows,
                    cols,
                    &worker_framebuffer,
                    &worker_progress,
                    rng,
                )
            }));
        }
    }

    // Tiles may finish in any order; just wait for all of them.
    for worker in workers {
        worker.join().expect("Failed to finalize a tracing thread.");
    }
    (*progress_tracker).lock().unwrap().done();

    // Once all tracing has been done, tonemap down to 8 bits per channel
    let mut data = Vec::with_capacity((res_x * res_y * 3_u32) as usize);
    {
        let locked_framebuffer = &(*framebuffer
            .lock()
            .expect("Main thread failed to lock output data for writing to image."));
        for color in locked_framebuffer.iter() {
            data.push(tonemap(color.r()));
            data.push(tonemap(color.g()));
            data.push(tonemap(color.b()));
        }
    }

    // Write the image to disk; PPM unless the output path asks for PNG
    let write_result = if out_path.extension().and_then(|e| e.to_str()) == Some("png") {
        write_png(out_file, &data, res_x, res_y)
    } else {
        write_ppm(out_file, &data, res_x, res_y)
    };
    match write_result {
        Ok(()) => println!(
            "Success! Took {} seconds",
            program_start.elapsed().as_secs_f64()
        ),
        Err(e) => {
            eprintln!("Failed to write the output image: {}", e);
            process::exit(1);
        }
    }
}

// Clamp, gamma correct, and scale one channel; the cast truncates.
fn tonemap(channel: f32) -> u8 {
    (COLOR_SPACE * utils::clamp(channel, 0.0_f32, 1.0_f32).powf(GAMMA)) as u8
}

// Binary P6: ASCII header, then packed RGB bytes.
fn write_ppm(mut out: fs::File, data: &[u8], res_x: u32, res_y: u32) -> Result<(), String> {
    out.write_all(format!("P6\n{} {}\n255\n", res_x, res_y).as_bytes())
        .map_err(|e| e.to_string())?;
    out.write_all(data).map_err(|e| e.to_string())
}

fn write_png(out: fs::File, data: &[u8], res_x: u32, res_y: u32) -> Result<(), String> {
    PNGEncoder::new(out)
        .encode(data, res_x, res_y, ColorType::RGB(8))
        .map_err(|e| e.to_string())
}

fn render_tile(
    scene: &Scene,
    rows: (u32, u32),
    cols: (u32, u32),
    framebuffer: &Mutex<Vec<RGB>>,
    progress: &Mutex<Progress>,
    mut rng: SmallRng,
) {
    let res_x = scene.logistics.resolution_x;
    let spp = scene.logistics.samples;

    for j in rows.0..rows.1 {
        for i in cols.0..cols.1 {
            // All samples for a pixel share the primary ray through its
            // center; the estimator itself provides the variation.
            let r = scene.camera.primary_ray(i, j);
            let mut accumulated = RGB::black();
            for _ in 0..spp {
                accumulated = accumulated + integrator::radiance(scene, &r, 0, &mut rng);
            }

            {
                let out_colors = &mut (*framebuffer
                    .lock()
                    .expect("Thread failed to acquire output data lock."));
                out_colors[((j * res_x) + i) as usize] = accumulated / spp as f32;
            }

            {
                progress.lock().unwrap().update(1);
            }
        }
    }
}
