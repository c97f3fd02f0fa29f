//! Draws the path of a circular orbit and a follower for one hour.
//!
//! Run with `RUST_LOG=globepath=debug` to see slot allocation.

use std::cell::RefCell;
use std::rc::Rc;

use globepath::{
    Color, Entity, EntityCollection, JulianDate, MaterialProperty, PathGraphics, PathVisualizer,
    PositionProperty, Property, ReferenceFrame, SampledProperty, Scene, SceneMode, TimeInterval,
    VisualizerOptions,
};
use nalgebra::Vector3;
use qtty::Seconds;
use tracing_subscriber::EnvFilter;

const ORBIT_RADIUS: f64 = 7_000_000.0;
const PERIOD: f64 = 5_800.0;

fn orbit(start: JulianDate) -> PositionProperty {
    let mut samples = SampledProperty::new();
    samples.add_samples((0..=12).map(|i| {
        let t = f64::from(i) * 300.0;
        let angle = std::f64::consts::TAU * t / PERIOD;
        (
            start.add_seconds(Seconds::new(t)),
            Vector3::new(ORBIT_RADIUS * angle.cos(), ORBIT_RADIUS * angle.sin(), 0.0),
        )
    }));
    PositionProperty::sampled(samples).with_frame(ReferenceFrame::Inertial)
}

fn main() -> globepath::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let start = JulianDate::from_iso8601("2024-06-01T00:00:00Z")?;
    let stop = start.add_seconds(Seconds::new(3_600.0));

    let scene = Rc::new(RefCell::new(Scene::new(SceneMode::Scene3D)));
    let entities = Rc::new(RefCell::new(EntityCollection::new()));
    {
        let mut entities = entities.borrow_mut();
        entities.suspend_events();
        entities.add(
            Entity::new("sat")
                .with_position(orbit(start))
                .with_availability(TimeInterval::new(start, stop))
                .with_path(PathGraphics {
                    width: Some(Property::Constant(2.0)),
                    material: Some(MaterialProperty::from(Color::YELLOW)),
                    ..PathGraphics::default()
                }),
        )?;
        entities.add(
            Entity::new("chase")
                .with_position(PositionProperty::reference("sat"))
                .with_availability(TimeInterval::new(start, stop))
                .with_path(PathGraphics::default()),
        )?;
        entities.resume_events()?;
    }

    let mut visualizer = PathVisualizer::builder()
        .scene(Rc::clone(&scene))
        .entity_collection(Rc::clone(&entities))
        .options(VisualizerOptions {
            default_resolution: 120.0,
            ..VisualizerOptions::default()
        })
        .build()?;

    for minute in (0..=60).step_by(15) {
        let time = start.add_seconds(Seconds::new(f64::from(minute) * 60.0));
        visualizer.update(time);

        if let Some(pool) = visualizer.primitives(ReferenceFrame::Inertial) {
            let pool = pool.borrow();
            for polyline in pool.iter().filter(|polyline| polyline.show) {
                let reveal = polyline
                    .material
                    .as_ref()
                    .map_or(0.0, |material| material.update_time.x);
                println!(
                    "t+{minute:02}m {:<6} vertices={:<3} revealed={:.2}",
                    polyline.id.as_deref().unwrap_or("?"),
                    polyline.positions.len(),
                    reveal,
                );
            }
        }
    }

    visualizer.destroy();
    Ok(())
}
