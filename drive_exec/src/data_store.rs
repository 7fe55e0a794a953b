//! # Data Store

use comms_if::telemetry::ControlMsg;
use log::info;
use serde::Serialize;

use crate::ctrl_policy;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of telemetry lines already read
    pub num_cycles: u64,

    // Controller
    pub ctrl: ctrl_policy::ControllerSession,
    pub ctrl_output: Option<ctrl_policy::ControlOutput>,
    pub ctrl_status_rpt: ctrl_policy::StatusReport,

    // Monitoring Counters
    /// Number of frames the controller produced an output for
    pub num_frames: u64,

    /// Number of lines skipped because they could not be decoded or processed
    pub num_skipped: u64,

    /// Number of frames on which no lane was found
    pub num_no_lane: u64,

    /// Number of frames with an active stop sign
    pub num_stopped: u64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// Counters describing a finished run, saved into the session directory.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub num_cycles: u64,
    pub num_frames: u64,
    pub num_skipped: u64,
    pub num_no_lane: u64,
    pub num_stopped: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.ctrl_output = None;
        self.ctrl_status_rpt = ctrl_policy::StatusReport::default();
    }

    /// Record the result of the controller for this cycle.
    pub fn record_output(
        &mut self,
        output: ctrl_policy::ControlOutput,
        report: ctrl_policy::StatusReport,
    ) {
        self.num_frames += 1;
        if !report.pid_stepped {
            self.num_no_lane += 1;
        }
        if report.stop_active {
            self.num_stopped += 1;
        }

        self.ctrl_output = Some(output);
        self.ctrl_status_rpt = report;
    }

    /// The message to send back for this cycle, if there is one.
    pub fn control_msg(&self) -> Option<ControlMsg> {
        self.ctrl_output.map(|o| o.to_msg())
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            num_cycles: self.num_cycles,
            num_frames: self.num_frames,
            num_skipped: self.num_skipped,
            num_no_lane: self.num_no_lane,
            num_stopped: self.num_stopped,
        }
    }

    /// Log a summary of the run.
    pub fn log_summary(&self) {
        info!("Read {} telemetry lines", self.num_cycles);
        info!(
            "Controlled {} frames, skipped {}",
            self.num_frames, self.num_skipped
        );
        info!(
            "No lane found on {} frames, stopped on {} frames",
            self.num_no_lane, self.num_stopped
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ctrl_policy::{ControlOutput, StatusReport};

    #[test]
    fn test_record_output() {
        let mut ds = DataStore::default();
        ds.cycle_start();
        assert!(ds.control_msg().is_none());

        ds.record_output(
            ControlOutput {
                steering_angle: 0.1,
                throttle: 0.0,
            },
            StatusReport {
                stop_active: true,
                pid_stepped: false,
                ..Default::default()
            },
        );

        assert_eq!(ds.num_frames, 1);
        assert_eq!(ds.num_no_lane, 1);
        assert_eq!(ds.num_stopped, 1);
        assert_eq!(ds.control_msg().map(|m| m.steering_angle), Some(0.1));

        ds.cycle_start();
        assert!(ds.control_msg().is_none());
        assert_eq!(ds.ctrl_status_rpt, StatusReport::default());

        let summary = ds.summary();
        assert_eq!(summary.num_frames, 1);
        assert_eq!(summary.num_skipped, 0);
    }
}
