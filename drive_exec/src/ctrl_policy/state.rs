//! Implementations for the controller session state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::{
    eqpt::cam::Frame,
    sign::{SignSlot, SignVector},
    telemetry::ControlMsg,
};
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{CtrlPolicyError, CtrlPolicyInitError, Params};
use crate::{
    clock::{Clock, MonotonicClock},
    debug_img::{DebugSink, NullSink},
    edge_map::EdgeMapPipeline,
    lane_scan::{BoundaryPair, LaneScanner},
    lat_ctrl::PidController,
    sign_override::{OverrideState, SignOverride},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-session controller state.
///
/// Owns everything which persists between frames: the sign override memory, the PID memory, the
/// clock and the frame counter.
pub struct ControllerSession<C: Clock = MonotonicClock> {
    params: Params,

    pipeline: EdgeMapPipeline,
    scanner: LaneScanner,
    sign_override: SignOverride,
    pid: PidController,

    clock: C,

    num_frames: u64,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) output: Option<ControlOutput>,
    arch_output: Archiver,
}

/// Input data to the controller.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Current vehicle speed, recorded only.
    pub current_speed: f64,

    /// This frame's sign classifier output.
    pub signs: SignVector,

    /// The camera frame.
    pub frame: Frame,
}

/// Actuation demand for one frame.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ControlOutput {
    /// Steering demand, positive values steer right. Not bounded.
    pub steering_angle: f64,

    /// Throttle demand between 0 and the cruise throttle.
    pub throttle: f64,
}

/// Status report for a single frame.
///
/// This is a flat struct so it can be archived as a CSV row.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatusReport {
    /// Index of the frame since the session started, starting at 1.
    pub frame_id: u64,

    /// Controller time of the frame.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Vehicle speed given with the frame.
    pub current_speed: f64,

    pub left_x: i32,
    pub right_x: i32,
    pub center_x: i32,

    /// Lane centre minus image centre, if both boundaries were found.
    pub lateral_offset: Option<i32>,

    pub force_left: bool,
    pub force_right: bool,

    /// Whether the PID controller was stepped on this frame.
    pub pid_stepped: bool,

    pub stop_active: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControllerSession<MonotonicClock> {
    fn default() -> Self {
        Self::new(Params::default(), MonotonicClock::new())
    }
}

impl ControlOutput {
    /// Convert into the message sent back to the simulator.
    pub fn to_msg(&self) -> ControlMsg {
        ControlMsg {
            steering_angle: self.steering_angle,
            throttle: self.throttle,
        }
    }
}

impl<C: Clock> ControllerSession<C> {
    /// Create a new session with the given parameters and clock.
    ///
    /// The PID controller's start time is read from the clock. No archives are written until
    /// [`State::init`] is called.
    pub fn new(params: Params, clock: C) -> Self {
        let pid = PidController::from_params(&params.lat_ctrl, clock.now_s());

        Self {
            pipeline: EdgeMapPipeline::new(params.edge_map.clone()),
            scanner: LaneScanner::new(params.lane_scan.clone()),
            sign_override: SignOverride::new(params.sign_override.clone()),
            pid,
            clock,
            num_frames: 0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            output: None,
            arch_output: Archiver::default(),
            params,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn override_state(&self) -> &OverrideState {
        self.sign_override.state()
    }

    /// Number of frames given to the controller so far, including rejected ones.
    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    /// Compute the control output for a frame at the current clock time.
    pub fn compute(
        &mut self,
        current_speed: f64,
        signs: &SignVector,
        frame: &Frame,
    ) -> Result<ControlOutput, CtrlPolicyError> {
        let now_s = self.clock.now_s();
        self.compute_at(current_speed, signs, frame, now_s)
    }

    /// Compute the control output for a frame at the given time.
    pub fn compute_at(
        &mut self,
        current_speed: f64,
        signs: &SignVector,
        frame: &Frame,
        now_s: f64,
    ) -> Result<ControlOutput, CtrlPolicyError> {
        self.compute_observed(current_speed, signs, frame, now_s, &mut NullSink)
    }

    /// Same as [`State::proc`], handing intermediate images to the sink.
    pub fn proc_observed(
        &mut self,
        input_data: &InputData,
        sink: &mut dyn DebugSink,
    ) -> Result<(ControlOutput, StatusReport), CtrlPolicyError> {
        let now_s = self.clock.now_s();
        let output = self.compute_observed(
            input_data.current_speed,
            &input_data.signs,
            &input_data.frame,
            now_s,
            sink,
        )?;

        Ok((output, self.report))
    }

    /// Compute the control output, handing intermediate images to the sink.
    ///
    /// If the frame is rejected no state other than the frame counter is changed.
    pub fn compute_observed(
        &mut self,
        current_speed: f64,
        signs: &SignVector,
        frame: &Frame,
        now_s: f64,
        sink: &mut dyn DebugSink,
    ) -> Result<ControlOutput, CtrlPolicyError> {
        self.num_frames += 1;

        sink.put_frame(frame);
        let map = self.pipeline.transform_observed(frame, sink)?;

        let overrides = self.sign_override.update(signs, now_s);
        let boundaries = self.scanner.scan(&map, &overrides);

        let (steering_angle, offset) = match boundaries.lateral_offset() {
            Some(offset) => (-self.pid.step(offset as f64, now_s), Some(offset)),
            // No lane, drive straight and leave the controller untouched
            None => (0.0, None),
        };

        let stop = signs.get(SignSlot::Stop) as f64;
        let output = ControlOutput {
            steering_angle,
            throttle: self.params.cruise_throttle * (1.0 - stop),
        };

        self.report = StatusReport::new(
            self.num_frames,
            now_s,
            current_speed,
            &boundaries,
            offset,
            &overrides,
            signs.is_active(SignSlot::Stop),
        );
        self.output = Some(output);

        trace!(
            "Frame {}: offset {:?}, steering {:.4}, throttle {:.2}",
            self.num_frames,
            offset,
            output.steering_angle,
            output.throttle
        );

        Ok(output)
    }
}

impl StatusReport {
    fn new(
        frame_id: u64,
        time_s: f64,
        current_speed: f64,
        boundaries: &BoundaryPair,
        lateral_offset: Option<i32>,
        overrides: &OverrideState,
        stop_active: bool,
    ) -> Self {
        Self {
            frame_id,
            time_s,
            current_speed,
            left_x: boundaries.left_x,
            right_x: boundaries.right_x,
            center_x: boundaries.center_x,
            lateral_offset,
            force_left: overrides.force_left,
            force_right: overrides.force_right,
            pid_stepped: lateral_offset.is_some(),
            stop_active,
        }
    }
}

impl<C: Clock> State for ControllerSession<C> {
    type InitData = &'static str;
    type InitError = CtrlPolicyInitError;

    type InputData = InputData;
    type OutputData = ControlOutput;
    type StatusReport = StatusReport;
    type ProcError = CtrlPolicyError;

    /// Initialise the controller.
    ///
    /// Expected init data is the name of the parameter file. All per-session memory is reset.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;

        self.pipeline = EdgeMapPipeline::new(params.edge_map.clone());
        self.scanner = LaneScanner::new(params.lane_scan.clone());
        self.sign_override = SignOverride::new(params.sign_override.clone());
        self.pid = PidController::from_params(&params.lat_ctrl, self.clock.now_s());
        self.params = params;
        self.num_frames = 0;
        self.report = StatusReport::default();
        self.output = None;

        self.arch_report = Archiver::from_path(session, "ctrl_policy/status_report.csv")?;
        self.arch_output = Archiver::from_path(session, "ctrl_policy/output.csv")?;

        info!(
            "Controller initialised: kp = {}, ki = {}, kd = {}, cruise throttle = {}",
            self.params.lat_ctrl.k_p,
            self.params.lat_ctrl.k_i,
            self.params.lat_ctrl.k_d,
            self.params.cruise_throttle
        );

        Ok(())
    }

    /// Process a single frame.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.proc_observed(input_data, &mut NullSink)
    }
}

impl<C: Clock> Archived for ControllerSession<C> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;

        if let Some(output) = self.output {
            self.arch_output.serialise(output)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clock::ManualClock,
        edge_map::{test::lane_frame, EdgeMapError},
        lane_scan::NOT_FOUND,
        lat_ctrl::LatCtrlParams,
        sign_override::OverrideState,
    };

    fn session_at(now_s: f64) -> ControllerSession<ManualClock> {
        ControllerSession::new(Params::default(), ManualClock::new(now_s))
    }

    fn signs(active: &[SignSlot]) -> SignVector {
        SignVector::with_active(active)
    }

    fn lane() -> Frame {
        lane_frame(&[(100, 106), (240, 246)])
    }

    /// Lane centre expected for `frame` with no override active.
    fn expected_center(frame: &Frame) -> i32 {
        let map = EdgeMapPipeline::default().transform(frame).unwrap();
        let pair = LaneScanner::default().scan(&map, &OverrideState::default());
        assert!(pair.is_complete());

        (pair.left_x + pair.right_x).div_euclid(2)
    }

    #[test]
    fn test_clean_lane() {
        let frame = lane();
        let center = expected_center(&frame);

        let mut ctrl = session_at(0.0);
        let output = ctrl.compute_at(12.0, &signs(&[]), &frame, 0.1).unwrap();

        assert_eq!(output.throttle, 0.5);
        assert_eq!(output.steering_angle, -(0.03 * (0.0 - (center - 160) as f64)));
        assert!(ctrl.report.pid_stepped);
        assert_eq!(ctrl.report.lateral_offset, Some(center - 160));
        assert_eq!(ctrl.report.current_speed, 12.0);
        assert_eq!(ctrl.pid().prev_time_s(), 0.1);
    }

    #[test]
    fn test_clean_lane_offset_sign() {
        // Markings at 126 and 209 on the scan row put the lane centre right of the image centre,
        // so the controller steers right with kp times the offset
        let mut ctrl = session_at(0.0);
        let output = ctrl.compute_at(0.0, &signs(&[]), &lane(), 0.1).unwrap();

        let offset = ctrl.report.lateral_offset.unwrap();
        assert!(offset > 0);
        assert!(output.steering_angle > 0.0);
        assert!((output.steering_angle - 0.03 * offset as f64).abs() < 1e-12);
    }

    #[test]
    fn test_throttle_law() {
        let frame = lane();
        let mut ctrl = session_at(0.0);

        for (active, throttle) in [
            (vec![], 0.5),
            (vec![SignSlot::Stop], 0.0),
            (vec![SignSlot::Stop, SignSlot::TurnLeft], 0.0),
            (vec![SignSlot::Straight], 0.5),
        ] {
            let output = ctrl.compute_at(0.0, &signs(&active), &frame, 1.0).unwrap();
            assert_eq!(output.throttle, throttle);
        }
    }

    #[test]
    fn test_stop_on_blank_frame() {
        let output = session_at(0.0)
            .compute_at(0.0, &signs(&[SignSlot::Stop]), &lane_frame(&[]), 0.1)
            .unwrap();

        assert_eq!(output, ControlOutput { steering_angle: 0.0, throttle: 0.0 });
    }

    #[test]
    fn test_no_detection() {
        let mut ctrl = session_at(0.0);
        let blank = lane_frame(&[]);

        let output = ctrl.compute_at(0.0, &signs(&[]), &blank, 0.5).unwrap();
        assert_eq!(output, ControlOutput { steering_angle: 0.0, throttle: 0.5 });
        assert!(!ctrl.report.pid_stepped);
        assert_eq!(ctrl.report.left_x, NOT_FOUND);
        assert_eq!(ctrl.report.right_x, NOT_FOUND);
        assert_eq!(ctrl.report.lateral_offset, None);

        // The controller memory is untouched
        assert_eq!(ctrl.pid().prev_state(), None);
        assert_eq!(ctrl.pid().prev_time_s(), 0.0);
        assert_eq!(ctrl.pid().integral(), 0.0);
    }

    #[test]
    fn test_no_detection_keeps_pid_memory() {
        let params = Params {
            lat_ctrl: LatCtrlParams {
                k_p: 0.0,
                k_i: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut ctrl = ControllerSession::new(params, ManualClock::new(0.0));
        let frame = lane();
        let blank = lane_frame(&[]);

        ctrl.compute_at(0.0, &signs(&[]), &frame, 1.0).unwrap();
        let integral = ctrl.pid().integral();
        let prev_state = ctrl.pid().prev_state();

        ctrl.compute_at(0.0, &signs(&[]), &blank, 2.0).unwrap();
        ctrl.compute_at(0.0, &signs(&[]), &blank, 3.0).unwrap();

        assert_eq!(ctrl.pid().integral(), integral);
        assert_eq!(ctrl.pid().prev_state(), prev_state);
        assert_eq!(ctrl.pid().prev_time_s(), 1.0);
    }

    #[test]
    fn test_sign_override_shifts_center() {
        let frame = lane();
        let mut ctrl = session_at(0.0);

        // A left turn sign drops the right boundary, the centre moves half a lane width right of
        // the left boundary
        ctrl.compute_at(0.0, &signs(&[SignSlot::TurnLeft]), &frame, 0.1).unwrap();
        let report = ctrl.report;
        assert!(report.force_left);
        assert!(!report.force_right);
        assert_eq!(report.right_x, report.left_x + 100);

        // The override outlives the sign for the window
        ctrl.compute_at(0.0, &signs(&[]), &frame, 2.0).unwrap();
        assert!(ctrl.report.force_left);

        ctrl.compute_at(0.0, &signs(&[]), &frame, 2.2).unwrap();
        assert!(!ctrl.report.force_left);
        assert_eq!(ctrl.report.lateral_offset, Some(expected_center(&frame) - 160));
    }

    #[test]
    fn test_compute_reads_clock() {
        let mut ctrl = session_at(5.0);
        ctrl.clock().set(5.25);

        ctrl.compute(0.0, &signs(&[]), &lane()).unwrap();

        assert_eq!(ctrl.report.time_s, 5.25);
        assert_eq!(ctrl.pid().prev_time_s(), 5.25);
    }

    #[test]
    fn test_rejected_frame() {
        let mut ctrl = session_at(0.0);
        let frame = Frame::new(640, 480);

        let result = ctrl.compute_at(0.0, &signs(&[SignSlot::TurnLeft]), &frame, 0.1);

        assert!(matches!(
            result,
            Err(CtrlPolicyError::EdgeMapError(EdgeMapError::InvalidFrameSize { .. }))
        ));
        assert_eq!(ctrl.num_frames(), 1);
        assert_eq!(*ctrl.override_state(), OverrideState::default());
        assert!(ctrl.output.is_none());
    }

    #[test]
    fn test_proc() {
        let mut ctrl = session_at(0.0);
        let input = InputData {
            current_speed: 3.0,
            signs: signs(&[SignSlot::Stop]),
            frame: lane_frame(&[]),
        };

        let (output, report) = ctrl.proc(&input).unwrap();

        assert_eq!(output.throttle, 0.0);
        assert_eq!(report.frame_id, 1);
        assert!(report.stop_active);
        assert_eq!(report.current_speed, 3.0);
    }

    #[test]
    fn test_output_to_msg() {
        let msg = ControlOutput {
            steering_angle: -0.21,
            throttle: 0.5,
        }
        .to_msg();

        assert_eq!(msg.steering_angle, -0.21);
        assert_eq!(msg.throttle, 0.5);
    }

    #[test]
    fn test_init_and_archive() {
        let tmp = std::env::temp_dir().join(format!("lane_drive_ctrl_{}", std::process::id()));
        let session = Session::new_in("ctrl_test", &tmp).unwrap();
        std::env::set_var(
            util::host::SW_ROOT_ENV_VAR,
            concat!(env!("CARGO_MANIFEST_DIR"), "/.."),
        );

        // Build up some memory which init must clear
        let mut ctrl = session_at(0.0);
        ctrl.compute_at(0.0, &signs(&[SignSlot::TurnLeft]), &lane(), 1.0).unwrap();
        assert!(ctrl.override_state().force_left);
        assert!(ctrl.pid().prev_state().is_some());

        ctrl.init("lane_ctrl.toml", &session).unwrap();

        assert_eq!(*ctrl.override_state(), OverrideState::default());
        assert_eq!(ctrl.pid().prev_state(), None);
        assert_eq!(ctrl.pid().prev_time_s(), 0.0);
        assert_eq!(ctrl.num_frames(), 0);
        assert!(ctrl.output.is_none());
        assert_eq!(ctrl.params().cruise_throttle, 0.5);

        // One frame with a lane, one without
        let lane_output = ctrl.compute_at(10.0, &signs(&[]), &lane(), 0.5).unwrap();
        let lane_report = ctrl.report;
        ctrl.write().unwrap();

        ctrl.compute_at(10.0, &signs(&[]), &lane_frame(&[]), 1.0).unwrap();
        ctrl.write().unwrap();

        let arch = session.arch_root.join("ctrl_policy");
        let report_csv = std::fs::read_to_string(arch.join("status_report.csv")).unwrap();
        let rows: Vec<&str> = report_csv.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            "frame_id,time_s,current_speed,left_x,right_x,center_x,lateral_offset,\
             force_left,force_right,pid_stepped,stop_active"
        );
        assert_eq!(
            rows[1],
            format!(
                "1,0.5,10.0,{},{},160,{},false,false,true,false",
                lane_report.left_x,
                lane_report.right_x,
                lane_report.lateral_offset.unwrap()
            )
        );
        assert_eq!(rows[2], "2,1.0,10.0,-1,-1,160,,false,false,false,false");

        let output_csv = std::fs::read_to_string(arch.join("output.csv")).unwrap();
        let rows: Vec<&str> = output_csv.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "steering_angle,throttle");
        let cells: Vec<f64> = rows[1].split(',').map(|c| c.parse().unwrap()).collect();
        assert_eq!(cells, vec![lane_output.steering_angle, 0.5]);
        assert_eq!(rows[2], "0.0,0.5");

        session.exit();
        std::fs::remove_dir_all(tmp).ok();
    }
}
