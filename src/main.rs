use anyhow::{bail, Result};
use closet_wear::camera::PerspectiveCamera;
use closet_wear::config::Config;
use closet_wear::model::{ProxyModel, SceneModel};
use closet_wear::placer::BodyAnchoredPlacer;
use closet_wear::recording;

const CONFIG_PATH: &str = "config.toml";

fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|buf, record| {
        use std::io::Write;
        let module = record.module_path().unwrap_or(record.target());
        writeln!(buf, "{} [{}] {}: {}", buf.timestamp_millis(), record.level(), module, record.args())
    });
    builder.init();
}

fn main() -> Result<()> {
    init_logger();

    // Usage: closet-wear <model.json> <recording.jsonl> [config.toml]
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <model.json> <recording.jsonl> [config.toml]", args[0]);
        bail!("missing arguments");
    }
    let config_path = args.get(3).map(String::as_str).unwrap_or(CONFIG_PATH);
    let config = Config::load_or_default(config_path);

    log::info!("closet-wear replay ({})", env!("GIT_VERSION"));
    log::info!(
        "[config] depth={:.2}..{:.2} buffer={} mirror={} dynamic_rotation={}",
        config.depth.near,
        config.depth.far,
        config.placer.visibility_buffer_frames,
        config.placer.mirror,
        config.placer.dynamic_rotation
    );

    let model = SceneModel::load(&args[1])?;
    log::info!("loaded {} ({} nodes)", args[1], model.node_count());
    let frames = recording::load_recording(&args[2])?;
    log::info!("{} frames from {}", frames.len(), args[2]);

    let camera = PerspectiveCamera::from_config(&config.camera);
    let frame_dt = config.camera.frame_dt;
    let mut placer = BodyAnchoredPlacer::new(config);
    placer.set_model(model, Some(&camera));

    println!("frame\tstate\tx\ty\tz\tscale");
    for (i, frame) in frames.iter().enumerate() {
        let snapshot = frame.snapshot();
        placer.draw(snapshot.as_ref(), Some(&camera), frame.dt.unwrap_or(frame_dt));
        if let Some(model) = placer.model() {
            let t = model.transform();
            println!(
                "{}\t{:?}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
                i,
                placer.state(),
                t.position.x,
                t.position.y,
                t.position.z,
                t.uniform_scale()
            );
        }
    }
    Ok(())
}
