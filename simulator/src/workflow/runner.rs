use crate::workflow::config::RoverConfig;
use anyhow::Context;
use ndarray::ArrayView2;
use rovercore::hardware::{Actuator, Clock};
use rovercore::mission::{DetectionSnapshot, MarkerOutcome, MissionReporter, WaypointTracker};
use rovercore::prelude::{Frame, FrameSource, LaneObservation, MarkerDetector, ObjectDetector};
use rovercore::processing::{
    AvoidanceManeuver, DriveCommand, DriveMixer, HazardDecision, HazardMonitor, HazardState,
    LaneTracker, ManeuverReport, RoiGeometry, SteeringController,
};
use rovercore::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};

/// External collaborators the loop talks to on every frame.
pub struct Peripherals<'a> {
    pub markers: &'a mut dyn MarkerDetector,
    pub objects: &'a mut dyn ObjectDetector,
    pub actuator: &'a mut dyn Actuator,
    pub reporter: &'a mut dyn MissionReporter,
}

/// What one control-loop iteration did.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub index: u64,
    pub hazard: Option<HazardDecision>,
    /// Set when an avoidance sweep ran; lane following and driving were skipped.
    pub maneuver: Option<ManeuverReport>,
    pub lane: LaneObservation,
    pub command: Option<DriveCommand>,
    pub markers: MarkerOutcome,
    pub objects_counted: usize,
}

impl FrameReport {
    pub fn avoided(&self) -> bool {
        self.maneuver.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub metrics: MetricsSnapshot,
    pub visited: Vec<String>,
    pub detection: DetectionSnapshot,
}

/// Per-frame control loop: hazard gate, lane following, then mission bookkeeping.
pub struct Runner<C: Clock> {
    roi: RoiGeometry,
    lane: LaneTracker,
    pid: SteeringController,
    mixer: DriveMixer,
    hazard: HazardMonitor<C>,
    maneuver: AvoidanceManeuver,
    tracker: WaypointTracker,
    detection_interval: u64,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<C: Clock> Runner<C> {
    pub fn new(config: &RoverConfig, clock: C) -> anyhow::Result<Self> {
        let table = config.marker_table()?;
        Ok(Self {
            roi: config.roi,
            lane: LaneTracker::new(config.lane.clone()),
            pid: SteeringController::new(config.pid),
            mixer: DriveMixer::new(config.drive),
            hazard: HazardMonitor::new(config.hazard.clone(), clock),
            maneuver: AvoidanceManeuver::from_config(&config.avoidance),
            tracker: WaypointTracker::new(table),
            detection_interval: config.mission.detection_interval.max(1),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("runner"),
        })
    }

    pub fn hazard_state(&self) -> &HazardState {
        self.hazard.state()
    }

    pub fn tracker(&self) -> &WaypointTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs one iteration. Collaborator failures are logged and counted, never
    /// propagated, so the loop keeps going.
    pub fn step(&mut self, frame: &Frame, io: &mut Peripherals<'_>) -> FrameReport {
        self.metrics.record_frame();
        let mut report = FrameReport {
            index: frame.index,
            ..Default::default()
        };
        let (roi, offset_x) = self.roi.crop(frame.image.view());

        let avoided = match self
            .hazard
            .check_and_handle(roi, &self.maneuver, &mut *io.actuator)
        {
            Ok((decision, maneuver)) => {
                report.hazard = Some(decision);
                match maneuver {
                    Some(maneuver) => {
                        self.metrics.record_avoidance();
                        if !maneuver.is_clean() {
                            self.metrics.record_error();
                        }
                        self.logger.record(&format!(
                            "frame {}: avoidance finished, {} stage faults",
                            frame.index,
                            maneuver.faults.len()
                        ));
                        report.maneuver = Some(maneuver);
                        true
                    }
                    None => false,
                }
            }
            Err(err) => {
                self.metrics.record_error();
                self.logger
                    .warn(&format!("frame {}: hazard check failed: {}", frame.index, err));
                false
            }
        };

        if !avoided {
            self.follow_lane(frame.index, roi, offset_x, io, &mut report);
        }

        let sightings = io.markers.detect(frame);
        if !sightings.is_empty() {
            report.markers =
                self.tracker
                    .process_markers(&sightings, frame.image.view(), &mut *io.reporter);
            for _ in &report.markers.reported_points {
                self.metrics.record_waypoint_report();
            }
            for _ in &report.markers.captured_sectors {
                self.metrics.record_sector_capture();
            }
        }

        if frame.index % self.detection_interval == 0 {
            let objects = io.objects.detect(frame);
            self.tracker.record_objects(&objects);
            report.objects_counted = objects.len();
        }
        report
    }

    fn follow_lane(
        &mut self,
        index: u64,
        roi: ArrayView2<u8>,
        offset_x: usize,
        io: &mut Peripherals<'_>,
        report: &mut FrameReport,
    ) {
        let cleaned = self.lane.denoise(roi);
        report.lane = self.lane.observe(cleaned.view(), offset_x);
        if report.lane.is_lost() {
            self.metrics.record_lane_lost();
            self.logger
                .detail(&format!("frame {}: lane lost, stopping", index));
        }
        match self
            .mixer
            .drive(&report.lane, &mut self.pid, &mut *io.actuator)
        {
            Ok(command) => report.command = Some(command),
            Err(err) => {
                self.metrics.record_error();
                self.logger
                    .warn(&format!("frame {}: drive command failed: {}", index, err));
            }
        }
    }

    /// Drains `source`, then stops the rover.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        io: &mut Peripherals<'_>,
        mut on_frame: F,
    ) -> anyhow::Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameReport, &Self),
    {
        while let Some(frame) = source.next_frame() {
            let report = self.step(&frame, io);
            on_frame(&report, self);
        }
        io.actuator
            .stop()
            .context("stopping rover at end of run")?;

        let summary = RunSummary {
            metrics: self.metrics.snapshot(),
            visited: self.tracker.visited().to_vec(),
            detection: self.tracker.snapshot(),
        };
        self.logger.record(&format!(
            "run finished: frames={} avoidances={} points={:?}",
            summary.metrics.frames, summary.metrics.avoidances, summary.visited
        ));
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{
        ScenarioConfig, ScriptedMarkerDetector, ScriptedMarkers, ScriptedObjectDetector,
        ScriptedObjects, SyntheticCamera,
    };
    use crate::generator::template;
    use ndarray::Array2;
    use rovercore::hardware::{ActuatorCommand, CommandKind, ManualClock, RecordingActuator};
    use rovercore::mission::{MarkerSighting, MissionBrief, SectorCapture, TrackedObject};

    #[derive(Default)]
    struct RecordingReporter {
        sends: Vec<Vec<String>>,
        captures: Vec<String>,
    }

    impl MissionReporter for RecordingReporter {
        fn mission_brief(&mut self) -> MissionBrief {
            MissionBrief {
                mission_code: "A3R8".into(),
                fire_buildings: vec!["sector8".into()],
            }
        }

        fn send(&mut self, points: &[String], _detection: &DetectionSnapshot) {
            self.sends.push(points.to_vec());
        }

        fn capture_sector(&mut self, capture: &SectorCapture<'_>) {
            self.captures.push(capture.image_name.clone());
        }
    }

    struct NoMarkers;

    impl MarkerDetector for NoMarkers {
        fn detect(&mut self, _frame: &Frame) -> Vec<MarkerSighting> {
            Vec::new()
        }
    }

    struct NoObjects;

    impl ObjectDetector for NoObjects {
        fn detect(&mut self, _frame: &Frame) -> Vec<TrackedObject> {
            Vec::new()
        }
    }

    fn frame(index: u64, lane_x: Option<f32>) -> Frame {
        let mut image = Array2::<u8>::zeros((240, 320));
        if let Some(x) = lane_x {
            template::lane_stripe(&mut image, x, 6);
        }
        Frame { index, image }
    }

    fn runner() -> Runner<ManualClock> {
        Runner::new(&RoverConfig::default(), ManualClock::new()).unwrap()
    }

    #[test]
    fn lost_lane_stops_and_is_counted() {
        let mut runner = runner();
        let mut actuator = RecordingActuator::new();
        let mut reporter = RecordingReporter::default();
        let mut io = Peripherals {
            markers: &mut NoMarkers,
            objects: &mut NoObjects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };
        let report = runner.step(&frame(0, None), &mut io);

        assert_eq!(report.hazard, Some(HazardDecision::Calibrating));
        assert_eq!(report.command, Some(DriveCommand::Stop));
        assert_eq!(runner.metrics().lane_lost, 1);
        assert_eq!(actuator.last(), Some(ActuatorCommand::Stop));
    }

    #[test]
    fn offset_lane_steers_toward_it() {
        let mut runner = runner();
        let mut actuator = RecordingActuator::new();
        let mut reporter = RecordingReporter::default();
        let mut io = Peripherals {
            markers: &mut NoMarkers,
            objects: &mut NoObjects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };
        let report = runner.step(&frame(0, Some(200.0)), &mut io);
        match report.command {
            Some(DriveCommand::Power { left, right, .. }) => assert!(left > right),
            other => panic!("expected a power command, got {:?}", other),
        }
    }

    #[test]
    fn avoidance_preempts_driving_for_that_frame() {
        let mut runner = runner();
        let mut actuator = RecordingActuator::new();
        let mut reporter = RecordingReporter::default();
        let mut io = Peripherals {
            markers: &mut NoMarkers,
            objects: &mut NoObjects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };

        runner.step(&frame(0, Some(160.0)), &mut io);
        let reports: Vec<FrameReport> = (1..=4)
            .map(|index| runner.step(&frame(index, None), &mut io))
            .collect();

        assert!(reports[..3].iter().all(|r| !r.avoided()));
        assert!(reports[..3].iter().all(|r| r.command == Some(DriveCommand::Stop)));
        let last = &reports[3];
        assert_eq!(last.hazard, Some(HazardDecision::Trigger));
        assert!(last.avoided());
        assert_eq!(last.command, None);
        assert_eq!(runner.metrics().avoidances, 1);
    }

    #[test]
    fn trigger_frame_still_records_markers_and_objects() {
        let mut runner = runner();
        let mut actuator = RecordingActuator::new();
        let mut reporter = RecordingReporter::default();
        let mut markers = ScriptedMarkerDetector::new(&[ScriptedMarkers {
            frame: 5,
            ids: vec![1],
        }]);
        let mut objects = ScriptedObjectDetector::new(&[ScriptedObjects {
            frame: 5,
            classes: vec!["tank".into()],
        }]);
        let mut io = Peripherals {
            markers: &mut markers,
            objects: &mut objects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };

        runner.step(&frame(1, Some(160.0)), &mut io);
        let reports: Vec<FrameReport> = (2..=5)
            .map(|index| runner.step(&frame(index, None), &mut io))
            .collect();

        let trigger = &reports[3];
        assert!(trigger.avoided());
        assert_eq!(trigger.command, None);
        assert_eq!(trigger.markers.reported_points, vec!["Alpha".to_string()]);
        assert_eq!(trigger.objects_counted, 1);
        assert_eq!(runner.tracker().visited(), &["Alpha"]);
        assert_eq!(runner.tracker().snapshot().get("Alpha").unwrap()[0].class_name, "tank");
        assert_eq!(reporter.sends, vec![vec!["Alpha".to_string()]]);
    }

    #[test]
    fn failing_actuator_is_counted_not_fatal() {
        let mut runner = runner();
        let mut actuator = RecordingActuator::new();
        actuator.fail_on(CommandKind::SetPower);
        let mut reporter = RecordingReporter::default();
        let mut io = Peripherals {
            markers: &mut NoMarkers,
            objects: &mut NoObjects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };
        let report = runner.step(&frame(0, Some(160.0)), &mut io);
        assert_eq!(report.command, None);
        assert_eq!(runner.metrics().errors, 1);
        assert_eq!(runner.metrics().frames, 1);
    }

    #[test]
    fn scripted_course_runs_end_to_end() {
        let scenario = ScenarioConfig::default();
        let clock = ManualClock::new();
        let mut runner = Runner::new(&RoverConfig::default(), clock.clone()).unwrap();
        let mut camera = SyntheticCamera::new(scenario.clone());
        let mut markers = ScriptedMarkerDetector::new(&scenario.markers);
        let mut objects = ScriptedObjectDetector::new(&scenario.objects);
        let mut actuator = RecordingActuator::new();
        let mut reporter = RecordingReporter::default();
        let mut io = Peripherals {
            markers: &mut markers,
            objects: &mut objects,
            actuator: &mut actuator,
            reporter: &mut reporter,
        };

        let mut stop_line_frames = 0;
        let summary = runner
            .run(&mut camera, &mut io, |report, _| {
                if report.lane.stop_line {
                    stop_line_frames += 1;
                }
                clock.advance(1.0 / 30.0);
            })
            .unwrap();

        assert_eq!(summary.metrics.frames, 600);
        assert_eq!(summary.metrics.avoidances, 1);
        assert_eq!(summary.visited, vec!["Alpha", "Bravo", "Charlie", "Finish"]);
        assert_eq!(summary.metrics.waypoint_reports, 4);
        assert_eq!(summary.metrics.sector_captures, 1);
        assert_eq!(stop_line_frames, 3);

        let alpha: Vec<(String, u32)> = summary
            .detection
            .get("Alpha")
            .unwrap()
            .iter()
            .map(|e| (e.class_name.clone(), e.count))
            .collect();
        assert_eq!(alpha, vec![("tank".to_string(), 1), ("car".to_string(), 2)]);
        assert_eq!(summary.detection.get("Bravo").unwrap()[0].class_name, "enemy");
        assert_eq!(summary.detection.get("Charlie").unwrap().len(), 2);

        assert_eq!(actuator.last(), Some(ActuatorCommand::Stop));
        assert_eq!(reporter.sends.len(), 4);
        assert_eq!(reporter.captures, vec!["A3R8_sector8.jpg".to_string()]);
    }
}
