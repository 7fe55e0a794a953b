//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable replays a recorded telemetry log through the controller, standing in for the
//! simulator connection. The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop, once per telemetry line:
//!         - Telemetry parsing and frame decoding
//!         - Sign feed update
//!         - Control policy processing
//!         - Archiving and control output
//!         - Cycle management
//!
//! # Modules
//!
//! All modules (e.g. `ctrl_policy`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::telemetry::TelemetryMsg;
use drive_lib::{
    ctrl_policy::InputData,
    data_store::DataStore,
    debug_img::SessionImageSink,
    params::DriveExecParams,
    sign_feed::SignFeed,
};
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Lane Drive Executable\n");
    info!("Running on: {}", host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- OPEN TELEMETRY LOG ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected the path to a telemetry log as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    info!("Replaying telemetry from \"{}\"", &args[1]);

    let tm_log = BufReader::new(
        File::open(&args[1]).wrap_err_with(|| format!("Could not open \"{}\"", &args[1]))?,
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.ctrl
        .init("lane_ctrl.toml", &session)
        .wrap_err("Failed to initialise the control policy")?;
    info!("CtrlPolicy init complete");

    let (sign_publisher, mut sign_feed) = SignFeed::new();

    let mut debug_sink = SessionImageSink::new(&session, exec_params.debug_image_interval)
        .wrap_err("Failed to create the debug image directory")?;

    let mut controls = BufWriter::new(
        File::create(session.session_root.join("controls.jsonl"))
            .wrap_err("Failed to create the controls file")?,
    );

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s.max(0.0));

    for line in tm_log.lines() {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();
        ds.num_cycles += 1;

        // ---- DATA INPUT ----

        let line = line.wrap_err("Could not read from the telemetry log")?;
        if line.trim().is_empty() {
            continue;
        }

        let tm = match TelemetryMsg::from_json(&line) {
            Ok(tm) => tm,
            Err(e) => {
                warn!("Skipping telemetry line {}: {}", ds.num_cycles, e);
                ds.num_skipped += 1;
                continue;
            }
        };

        // The classifier output recorded with this tick goes through the feed as it would live
        if let Some(signs) = tm.signs {
            let result = sign_publisher.publish(signs);
            sign_feed.note_dropped(result);
        }

        let frame = match tm.decode_frame() {
            Ok(f) => f,
            Err(e) => {
                warn!("Skipping frame on line {}: {}", ds.num_cycles, e);
                ds.num_skipped += 1;
                continue;
            }
        };

        let input = InputData {
            current_speed: tm.speed,
            signs: sign_feed.next(),
            frame,
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let result = ds.ctrl.proc_observed(&input, &mut debug_sink);
        debug_sink.next_frame();

        match result {
            Ok((o, r)) => ds.record_output(o, r),
            Err(e) => {
                warn!("Error during CtrlPolicy processing: {}", e);
                ds.num_skipped += 1;
                continue;
            }
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.ctrl.write() {
            warn!("Could not write the CtrlPolicy archives: {}", e);
        }

        // ---- CONTROL OUTPUT ----

        if let Some(msg) = ds.control_msg() {
            let json = msg.to_json().wrap_err("Could not serialise the control message")?;
            writeln!(controls, "{}", json).wrap_err("Could not write the control message")?;
        }

        if exec_params.frame_limit_reached(ds.num_frames) {
            info!("Frame limit of {} reached, stopping", exec_params.max_frames);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        if exec_params.cycle_period_s > 0.0 {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                    );
                    ds.num_consec_cycle_overruns += 1;
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    controls.flush().wrap_err("Could not flush the controls file")?;

    ds.log_summary();
    session.save("summary.json", ds.summary());
    let num_unread = sign_feed.drain();
    if num_unread > 0 {
        debug!("{} sign vectors were left unread in the feed", num_unread);
    }
    if sign_feed.num_dropped() > 0 {
        warn!("{} sign vectors were dropped by the feed", sign_feed.num_dropped());
    }

    info!("End of execution");

    session.exit();

    Ok(())
}
