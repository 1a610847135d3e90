use std::path::{Path, PathBuf};
use std::process::ExitCode;

use calib_accuracy::imageio::{load_rgb, save_gray, save_rgb};
use calib_accuracy::session::CORNER_COUNT;
use calib_accuracy::{
    filter_color, CalibrationError, CalibrationIoError, CalibrationSession, EvaluateConfig,
    EvaluateReport,
};
use clap::{ArgAction, Parser};

/// Evaluate fiducial-grid accuracy from an image and four corner clicks.
#[derive(Parser, Debug)]
#[command(name = "calib-accuracy", version, about)]
struct Cli {
    /// JSON run configuration.
    #[arg(short, long)]
    config: PathBuf,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Emit JSON logs (only with the `tracing` feature).
    #[arg(long)]
    json_logs: bool,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] CalibrationIoError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

fn init_logging(cli: &Cli) -> Result<(), CliError> {
    let level = calib_accuracy::level_from_verbosity(cli.verbose);
    #[cfg(feature = "tracing")]
    {
        calib_accuracy::init_tracing(cli.json_logs, level);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        if cli.json_logs {
            eprintln!("--json-logs requires the `tracing` feature; using plain logs");
        }
        calib_accuracy::init_with_level(level)?;
        Ok(())
    }
}

/// Replay the configured clicks; returns the session even when a step failed.
fn run_session(
    cfg: &EvaluateConfig,
    report: &mut EvaluateReport,
) -> Result<CalibrationSession, CliError> {
    let image = load_rgb(&cfg.image_path)?;
    let mut session = CalibrationSession::new(image, cfg.physical, cfg.params.clone())?;

    let clicks = cfg.corner_points();
    if clicks.len() != CORNER_COUNT {
        let err = CalibrationError::InvalidArgument(format!(
            "expected {CORNER_COUNT} corner clicks, got {}",
            clicks.len()
        ));
        report.set_progress(session.state(), session.marker_centers(), session.corners());
        report.set_error(&err);
        return Ok(session);
    }

    for click in clicks {
        if let Err(err) = session.submit_corner(click) {
            log::error!("corner ({}, {}) rejected: {err}", click.x, click.y);
            report.set_error(&err);
            break;
        }
    }
    report.set_progress(session.state(), session.marker_centers(), session.corners());
    if let Ok(res) = session.results() {
        report.set_result(res);
    }
    Ok(session)
}

fn write_images(
    cfg: &EvaluateConfig,
    session: &CalibrationSession,
    report: &mut EvaluateReport,
) -> Result<(), CliError> {
    let Ok(rectified) = session.rectified_image() else {
        return Ok(());
    };
    if let Some(path) = cfg.rectified_path() {
        save_rgb(&path, rectified)?;
        log::info!("wrote rectified image to {}", path.display());
        report.rectified_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = cfg.mask_path() {
        let params = session.params();
        let mask = filter_color(&rectified.view(), params.interior_class, &params.thresholds);
        save_gray(&path, &mask.to_gray())?;
        log::info!("wrote {} mask to {}", params.interior_class, path.display());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<bool, CliError> {
    let cfg = EvaluateConfig::load_json(&cli.config)?;
    let mut report = EvaluateReport::new(&cfg, Path::new(&cli.config));

    match run_session(&cfg, &mut report) {
        Ok(session) => write_images(&cfg, &session, &mut report)?,
        Err(CliError::Calibration(err)) => report.set_error(&err),
        Err(err) => return Err(err),
    }

    let output_path = cfg.output_path();
    report.write_json(&output_path)?;
    println!("wrote report JSON to {}", output_path.display());

    if let Some(summary) = report.summary {
        println!(
            "{} markers: mean error {:.4}, rms {:.4}, max {:.4}",
            summary.count, summary.mean, summary.rms, summary.max
        );
    }
    Ok(report.error.is_none())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("{err}");
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
