use anyhow::Context;
use clap::Parser;
use dashboard::bridge::status_bind_address;
use dashboard::{StatusBridge, StatusModel};
use generator::profile::{
    ScenarioConfig, ScriptedMarkerDetector, ScriptedObjectDetector, SyntheticCamera,
};
use reporter::{DashboardClient, DashboardReporter, MissionStore};
use rovercore::hardware::{Clock, ManualClock, SystemClock};
use rovercore::processing::DriveCommand;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::RoverConfig;
use workflow::drive::{SimulatedDrive, WheelPowers};
use workflow::runner::{Peripherals, RunSummary, Runner};

mod dashboard;
mod generator;
mod reporter;
mod workflow;

const FRAME_PERIOD_SECS: f64 = 1.0 / 30.0;

#[derive(Parser)]
#[command(author, version, about = "Drives the rover control loop over a synthetic course")]
struct Args {
    /// Rover tunables (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Synthetic course description (YAML)
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long)]
    frames: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Mission JSON document to read and update
    #[arg(long)]
    mission_file: Option<PathBuf>,
    /// Dashboard base URL, e.g. http://192.168.0.10:5000
    #[arg(long)]
    server_url: Option<String>,
    /// Never contact the dashboard, even when a URL is configured
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Pace frames on the wall clock instead of simulated time
    #[arg(long, default_value_t = false)]
    realtime: bool,
    /// Emulate a motor board without a reverse channel
    #[arg(long, default_value_t = false)]
    no_reverse: bool,
    /// Serve live status on 127.0.0.1:9000 and wait for Ctrl+C after the run
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RoverConfig::load(path)?,
        None => RoverConfig::default(),
    };
    if let Some(path) = args.mission_file.clone() {
        config.mission.document_path = path;
    }
    if let Some(url) = args.server_url.clone() {
        config.mission.server_url = Some(url);
    }

    let mut scenario = match &args.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(frames) = args.frames {
        scenario.frames = frames;
    }
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }

    let store = MissionStore::new(config.mission.document_path.clone());
    store.seed_if_missing(&scenario.fire_buildings)?;
    let client = match (&config.mission.server_url, args.offline) {
        (Some(url), false) => Some(DashboardClient::new(
            url,
            Duration::from_secs(config.mission.timeout_secs),
        )?),
        _ => None,
    };
    let mut reporter = DashboardReporter::new(store, client, config.mission.capture_dir.clone());

    let bridge = StatusBridge::new();
    if args.serve {
        bridge.spawn(status_bind_address())?;
    }

    let mut drive = if args.no_reverse {
        SimulatedDrive::without_reverse()
    } else {
        SimulatedDrive::new()
    };

    let summary = if args.realtime {
        drive_course(&config, &scenario, SystemClock::new(), &mut drive, &mut reporter, &bridge)?
    } else {
        drive_course(&config, &scenario, ManualClock::new(), &mut drive, &mut reporter, &bridge)?
    };

    println!(
        "Run -> frames {}, lane lost {}, avoidances {}, waypoints {:?}, sector captures {}, errors {}",
        summary.metrics.frames,
        summary.metrics.lane_lost,
        summary.metrics.avoidances,
        summary.visited,
        summary.metrics.sector_captures,
        summary.metrics.errors
    );
    println!(
        "Detection -> {}",
        serde_json::to_string(&summary.detection).context("encoding detection summary")?
    );
    println!(
        "Drive -> {} commands, final wheels {:?}; mission document {}",
        drive.commands(),
        drive.powers(),
        reporter.store().path().display()
    );

    if args.serve {
        log::info!("[status] endpoint running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}

fn drive_course<C: Clock + Clone>(
    config: &RoverConfig,
    scenario: &ScenarioConfig,
    clock: C,
    drive: &mut SimulatedDrive,
    reporter: &mut DashboardReporter,
    bridge: &StatusBridge,
) -> anyhow::Result<RunSummary> {
    let pacer = clock.clone();
    let mut runner = Runner::new(config, clock).context("building control loop")?;
    let mut camera = SyntheticCamera::new(scenario.clone());
    let mut markers = ScriptedMarkerDetector::new(&scenario.markers);
    let mut objects = ScriptedObjectDetector::new(&scenario.objects);

    let mut io = Peripherals {
        markers: &mut markers,
        objects: &mut objects,
        actuator: &mut *drive,
        reporter,
    };
    let mut wheels = WheelPowers::default();
    let summary = runner.run(&mut camera, &mut io, |report, runner| {
        match report.command {
            Some(DriveCommand::Power { left, right, .. }) => wheels = WheelPowers { left, right },
            Some(DriveCommand::Stop) => wheels = WheelPowers::default(),
            // A finished sweep always ends stopped.
            None if report.avoided() => wheels = WheelPowers::default(),
            None => {}
        }
        if !report.markers.is_empty() || report.objects_counted > 0 {
            log::info!(
                "[sim] frame {}: points {:?} sectors {:?} objects {}",
                report.index,
                report.markers.reported_points,
                report.markers.captured_sectors,
                report.objects_counted
            );
        }
        bridge.publish(StatusModel::capture(report, runner, wheels));
        pacer.sleep(Duration::from_secs_f64(FRAME_PERIOD_SECS));
    })?;
    Ok(summary)
}
