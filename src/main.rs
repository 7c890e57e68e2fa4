// What you SEE:
// • A photo plate fills the window, keeping its aspect (long side cropped).
// • A small cube spins on top of it.
// • The whole composite is color graded through the active 3D LUT.
// • L / Right: next LUT, Left: previous LUT, ESC quits. The title shows the LUT.

use std::time::{Duration, Instant};

use log::{info, warn};

use lut_grade::background::BackgroundPass;
use lut_grade::config::Config;
use lut_grade::driver::{FrameDriver, LutSelection};
use lut_grade::lut::LutStore;
use lut_grade::pipeline::PassPipeline;
use lut_grade::plate::PlateLoader;
use lut_grade::scene::{ScenePass, SpinningCube};
use lut_grade::window::Presenter;
use lut_grade::Error;

/// Identity LUTs plus every atlas named on the command line, each in a
/// filtered and an unfiltered flavour. Atlases that fail to load are skipped.
fn build_store(config: &Config) -> LutStore {
    let mut store = LutStore::with_identity();
    for path in &config.luts {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        for (name, filtered) in [(stem.clone(), true), (format!("{stem} not filtered"), false)] {
            if let Err(e) = store.load_atlas(&name, path, filtered) {
                warn!("skipping LUT '{name}': {e}");
            }
        }
    }
    store
}

fn title(driver: &FrameDriver) -> String {
    let name = driver.bound_name().unwrap_or("none");
    let mode = if driver.filtering() { "filtered" } else { "nearest" };
    format!("LUT Grade - {name} ({mode})")
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args()?;

    /* --- LUTs + initial selection --- */
    let store = build_store(&config);
    let mut selection = LutSelection::by_name_or_identity(&store, &config.select)
        .ok_or_else(|| Error::InvalidLut("no LUT available to select".into()))?;

    /* --- Passes ---
       Visual: background first (fills every pixel), scene on top, grade last. */
    let plate = match &config.background {
        Some(path) => PlateLoader::spawn(path.clone()),
        None => PlateLoader::none(),
    };
    let scene = if config.scene {
        ScenePass::new(Some(Box::new(SpinningCube::new())))
    } else {
        ScenePass::new(None)
    };
    let pipeline = PassPipeline::new(BackgroundPass::new(), scene);
    let mut driver = FrameDriver::new(store, pipeline, plate);

    let mut presenter = Presenter::new("LUT Grade", config.width, config.height)?;
    for (name, _) in driver.store.names() {
        info!("available LUT: {name}");
    }

    /* --- FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut last_frame_time = Instant::now();
    let mut shown_title = String::new();

    /* ------------------------------ Main loop ------------------------------ */
    while presenter.is_open() && !presenter.esc_pressed() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32();
        last_frame_time = now;

        /* 1) Inputs: the only writer of the selection. */
        if presenter.next_lut_pressed() {
            selection = selection.next(&driver.store);
        }
        if presenter.previous_lut_pressed() {
            selection = selection.previous(&driver.store);
        }

        /* 2) Render at whatever size the window has right now. */
        let viewport = presenter.viewport();
        match driver.frame(&selection, viewport, dt)? {
            Some(frame) => presenter.present(frame)?,
            None => presenter.idle(),
        }

        let t = title(&driver);
        if t != shown_title {
            presenter.set_title(&t);
            info!("{t}");
            shown_title = t;
        }

        /* 3) FPS once per second. */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            info!("FPS: {:.1}", frames_this_second as f32 / secs);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}
