use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};

use anklemark::config::MeasureConfig;
use anklemark::domain::LANDMARK_COUNT;
use anklemark::exif::parse_exif_orientation;
use anklemark::import::{ImageOrientationLoader, ImportCheck, PendingImport};
use anklemark::measurement::{AngleMeasurementEngine, MeasurementPhase};
use anklemark::render::format_angle;
use anklemark::session::{
    self, CaptureMode, DeviceTilt, SessionData, Side, local_timestamp, write_export_set,
};

#[derive(Parser)]
#[command(name = "anklemark")]
#[command(about = "Measure ankle angles on side-view foot photos", long_about = None)]
#[command(version)]
struct Cli {
    /// Read settings from this file instead of the user config directory
    #[arg(long, global = true, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place three landmarks on an image and export the measurement
    Measure(MeasureArgs),
    /// Print the EXIF orientation and corrected size of an image
    Orientation {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        image: PathBuf,
    },
    /// Print the effective settings as JSON
    Config {
        /// Also write them to the config file, filling in missing defaults
        #[arg(long)]
        write: bool,
    },
}

#[derive(clap::Args)]
struct MeasureArgs {
    /// Photo to measure
    #[arg(value_hint = clap::ValueHint::FilePath)]
    image: PathBuf,

    /// Fibular head, lateral malleolus and 5th metatarsal positions as X,Y
    /// in corrected image pixels; repeat to record several measurements
    #[arg(
        long,
        num_args = 3,
        required = true,
        value_name = "X,Y",
        action = clap::ArgAction::Append
    )]
    points: Vec<PointArg>,

    #[arg(long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    out_dir: PathBuf,

    #[arg(long, default_value = "subject")]
    subject: String,

    #[arg(long, default_value = "")]
    operator: String,

    /// Measured leg, L or R
    #[arg(long, default_value = "L")]
    side: Side,

    /// Import checks confirmed by the operator; all three are required
    #[arg(long = "check", value_enum)]
    checks: Vec<CheckArg>,

    /// Device orientation at capture as BETA,GAMMA degrees
    #[arg(long, value_name = "BETA,GAMMA")]
    tilt: Option<PointArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CheckArg {
    SideView,
    WholeFoot,
    NoDistortion,
}

impl From<CheckArg> for ImportCheck {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::SideView => ImportCheck::SideView,
            CheckArg::WholeFoot => ImportCheck::WholeFoot,
            CheckArg::NoDistortion => ImportCheck::NoDistortion,
        }
    }
}

/// A comma separated coordinate pair
#[derive(Clone, Copy, Debug, PartialEq)]
struct PointArg(f64, f64);

impl FromStr for PointArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y but got `{s}`"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("`{v}` is not a number"))
        };
        Ok(PointArg(parse(x)?, parse(y)?))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MeasureConfig::load_from(path),
        None => MeasureConfig::load(),
    };

    match cli.command {
        Commands::Measure(args) => measure(&config, args),
        Commands::Orientation { image } => orientation(&config, image),
        Commands::Config { write } => show_config(&config, cli.config.as_deref(), write),
    }
}

fn show_config(config: &MeasureConfig, path: Option<&Path>, write: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if write {
        match path {
            Some(path) => config.save_to(path)?,
            None => config.save(),
        }
    }
    Ok(())
}

fn orientation(config: &MeasureConfig, path: PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let code = parse_exif_orientation(&bytes);
    let image = ImageOrientationLoader::from_config(config)
        .load_bytes(&bytes)
        .with_context(|| format!("loading {}", path.display()))?;
    println!(
        "{}: orientation {} ({:?}), corrected size {}x{}",
        path.display(),
        code.code(),
        code,
        image.width(),
        image.height()
    );
    Ok(())
}

fn measure(config: &MeasureConfig, args: MeasureArgs) -> anyhow::Result<()> {
    let image = ImageOrientationLoader::from_config(config)
        .load_path(&args.image)
        .with_context(|| format!("loading {}", args.image.display()))?;

    let mut pending = PendingImport::new(image);
    for check in &args.checks {
        pending.set_check((*check).into(), true);
    }
    log::debug!(
        "Import of {}x{} image with checklist {:?}",
        pending.image().width(),
        pending.image().height(),
        pending.checklist()
    );
    let confirmed = match pending.confirm() {
        Ok(confirmed) => confirmed,
        Err(pending) => {
            pending.cancel();
            bail!("confirm every import check: --check side-view --check whole-foot --check no-distortion");
        }
    };

    let mut session = SessionData::new(args.subject, args.side, CaptureMode::Import);
    session.operator_id = args.operator;
    session.checklist = Some(confirmed.checklist);
    session.device_orientation = args
        .tilt
        .map(|PointArg(beta, gamma)| DeviceTilt::from_euler(beta, gamma));

    let mut engine = AngleMeasurementEngine::new(confirmed.image, config);
    for (index, group) in args.points.chunks_exact(LANDMARK_COUNT).enumerate() {
        engine.reset();
        for &PointArg(x, y) in group {
            engine.pointer_down(x, y);
            engine.pointer_up();
        }

        match engine.phase() {
            MeasurementPhase::Complete => {}
            MeasurementPhase::Degenerate => bail!(
                "measurement {}: a landmark coincides with the lateral malleolus, the angle is undefined",
                index + 1
            ),
            MeasurementPhase::Empty | MeasurementPhase::Partial(_) => bail!(
                "measurement {}: only {} distinct points were placed; points closer than {} px select an existing point",
                index + 1,
                engine.points().len(),
                config.point_radius * 2.0
            ),
        }

        let taken_at = local_timestamp();
        let overlay = engine
            .bake_annotated_image_at(taken_at.naive_local())
            .context("measurement is not complete")?;
        let num = session.record_measurement(engine.measurement_data(), taken_at, Some(overlay));
        if let Some(angle) = engine.angle_value() {
            println!("Measurement {num}: {}", format_angle(angle));
        }
    }

    let paths = write_export_set(&session, engine.backing(), &args.out_dir)?;

    if let Some(stats) = session.statistics()
        && stats.count > 1
    {
        println!(
            "Mean {:.3}° SD {:.3}° (min {:.3}°, max {:.3}°)",
            stats.mean, stats.sd, stats.min, stats.max
        );
    }
    println!("Stem:  {}", session::file_stem(&session));
    for path in [&paths.json, &paths.csv, &paths.raw]
        .into_iter()
        .chain(&paths.overlays)
    {
        println!("  {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arg_parsing() {
        assert_eq!("12,34.5".parse::<PointArg>().unwrap(), PointArg(12.0, 34.5));
        assert_eq!(" 1 , 2 ".parse::<PointArg>().unwrap(), PointArg(1.0, 2.0));
        assert!("12".parse::<PointArg>().is_err());
        assert!("a,1".parse::<PointArg>().is_err());
        assert!("NaN,1".parse::<PointArg>().is_err());
        // Full double precision survives parsing
        assert_eq!(
            "1234.5678901234,0.1".parse::<PointArg>().unwrap(),
            PointArg(1234.5678901234, 0.1)
        );
    }

    #[test]
    fn test_cli_parses_measure() {
        let cli = Cli::try_parse_from([
            "anklemark",
            "measure",
            "foot.jpg",
            "--points",
            "10,10",
            "10,100",
            "90,100",
            "--side",
            "R",
            "--check",
            "side-view",
        ])
        .unwrap();
        let Commands::Measure(args) = cli.command else {
            panic!("expected measure");
        };
        assert_eq!(args.points.len(), 3);
        assert_eq!(args.side, Side::Right);
        assert_eq!(args.checks.len(), 1);
    }

    #[test]
    fn test_cli_collects_repeated_point_groups() {
        let cli = Cli::try_parse_from([
            "anklemark",
            "measure",
            "foot.jpg",
            "--points",
            "10,10",
            "10,100",
            "90,100",
            "--points",
            "12.25,10",
            "10,100.5",
            "91,99",
        ])
        .unwrap();
        let Commands::Measure(args) = cli.command else {
            panic!("expected measure");
        };
        let groups: Vec<&[PointArg]> = args.points.chunks_exact(LANDMARK_COUNT).collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1][0], PointArg(12.25, 10.0));
        assert_eq!(groups[1][1], PointArg(10.0, 100.5));
    }

    #[test]
    fn test_cli_parses_config() {
        let cli = Cli::try_parse_from(["anklemark", "config", "--write", "--config", "c.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { write: true }));
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn test_show_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = MeasureConfig::default();

        show_config(&config, Some(&path), false).unwrap();
        assert!(!path.exists());

        show_config(&config, Some(&path), true).unwrap();
        assert_eq!(MeasureConfig::load_from(&path), config);
    }

    #[test]
    fn test_cli_requires_three_points() {
        assert!(
            Cli::try_parse_from(["anklemark", "measure", "foot.jpg", "--points", "1,1", "2,2"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "anklemark", "measure", "foot.jpg", "--points", "1,1", "2,2", "3,3", "--points",
                "4,4",
            ])
            .is_err()
        );
    }
}
