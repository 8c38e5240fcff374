use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

mod analyzer;
mod audio;
mod error;
mod midi;
mod pitch;
mod processor;
mod riff;
mod smpl;

use analyzer::{YinConfig, YinEstimator};
use pitch::Pitch;
use processor::Options;

/// Tag WAV files with pitch metadata.
#[derive(Parser)]
#[command(name = "pitch_tagger")]
#[command(version, about, long_about = None)]
struct Cli {
    /// The pitch; valid values are 12-TET notes +/- cents (e.g. 'C3', 'A#4',
    /// 'Db2+25'), absolute frequencies (e.g. '654.32Hz'), raw MIDI unity
    /// note / pitch fraction pairs (e.g. '60,134217728'), or 'crepe'
    /// (automatic pitch detection)
    #[arg(short, long, value_name = "SPEC")]
    pitch: Option<Pitch>,

    /// Don't modify any files, just print what would be done
    #[arg(short, long)]
    dry: bool,

    /// When a file has an existing smpl chunk, overwrite it
    #[arg(short, long)]
    overwrite: bool,

    /// File or directory to process. If a directory is given, all *.wav
    /// files inside it (and subdirectories) will be processed
    path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let options = Options {
        pitch: cli.pitch,
        dry_run: cli.dry,
        overwrite: cli.overwrite,
    };
    let estimator = YinEstimator::new(YinConfig::default());

    match processor::process_path(&cli.path, &options, &estimator) {
        Ok(summary) => {
            info!("{}", summary);
            if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["pitch_tagger", "-p", "Db2+25", "-d", "-o", "samples"]).unwrap();
        assert_eq!(cli.pitch, Some(Pitch::Note(37.25)));
        assert!(cli.dry);
        assert!(cli.overwrite);
        assert_eq!(cli.path, PathBuf::from("samples"));

        let cli = Cli::try_parse_from(["pitch_tagger", "--pitch", "crepe", "x.wav"]).unwrap();
        assert_eq!(cli.pitch, Some(Pitch::Detected(None)));
        assert!(!cli.dry && !cli.overwrite);

        let cli = Cli::try_parse_from(["pitch_tagger", "x.wav"]).unwrap();
        assert_eq!(cli.pitch, None);
    }

    #[test]
    fn test_cli_rejects_bad_pitch() {
        assert!(Cli::try_parse_from(["pitch_tagger", "-p", "H9", "x.wav"]).is_err());
        assert!(Cli::try_parse_from(["pitch_tagger", "-p", "A4"]).is_err());
    }
}
