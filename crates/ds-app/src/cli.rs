use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use ds_pipeline::sink::DEFAULT_PORT;

/// Adresse de diffusion par défaut.
fn broadcast_target() -> SocketAddr {
    SocketAddr::from(([255, 255, 255, 255], DEFAULT_PORT))
}

/// dynsense: audio scene sensing pipeline, streams binary frames over UDP.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source synthétique : sinusoïde à la fréquence donnée (Hz).
    #[arg(long, value_name = "HZ")]
    pub tone: Option<f32>,

    /// Amplitude crête de la sinusoïde, entre 0 et 1.
    #[arg(long, default_value_t = 0.07)]
    pub amplitude: f32,

    /// Source fichier : WAV, FLAC, MP3, OGG, AAC.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Rejouer le fichier en boucle.
    #[arg(long = "loop", default_value_t = false)]
    pub looping: bool,

    /// Microphone par défaut. Requiert --features mic.
    #[arg(long, default_value_t = false)]
    pub mic: bool,

    /// Observateur UDP (répétable).
    #[arg(long = "target", value_name = "ADDR:PORT", default_values_t = [broadcast_target()])]
    pub targets: Vec<SocketAddr>,

    /// Mode observateur : écouter sur cette adresse et décoder les frames.
    #[arg(long, value_name = "ADDR:PORT")]
    pub observe: Option<SocketAddr>,

    /// Arrêter après N frames.
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,

    /// Fréquence d'échantillonnage (remplace la config).
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Capacité de la file de frames (remplace la config).
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one sample source is provided, or none in observer mode.
    ///
    /// # Errors
    /// Returns an error if the source selection is empty or ambiguous.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        let count = usize::from(self.tone.is_some())
            + usize::from(self.file.is_some())
            + usize::from(self.mic);

        if self.observe.is_some() {
            if count > 0 {
                anyhow::bail!("--observe ne prend pas de source. Retirez --tone, --file ou --mic.");
            }
            return Ok(());
        }
        if count == 0 {
            anyhow::bail!("Aucune source spécifiée. Utilisez --tone, --file, ou --mic.");
        }
        if count > 1 {
            anyhow::bail!("Une seule source à la fois. Spécifiez --tone, --file, OU --mic.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dynsense").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["--tone", "1000"]);
        assert_eq!(cli.tone, Some(1000.0));
        assert_eq!(cli.targets, vec!["255.255.255.255:7667".parse().unwrap()]);
        assert_eq!(cli.targets[0].port(), DEFAULT_PORT);
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.log_level, "warn");
        assert!(cli.validate_source().is_ok());
    }

    #[test]
    fn targets_repeat() {
        let cli = parse(&["--tone", "440", "--target", "127.0.0.1:9000", "--target", "[::1]:9001"]);
        assert_eq!(cli.targets.len(), 2);
        assert!(!cli.targets.contains(&broadcast_target()));
        assert!(cli.targets[1].is_ipv6());
    }

    #[test]
    fn source_selection_is_exclusive() {
        assert!(parse(&[]).validate_source().is_err());
        assert!(parse(&["--tone", "440", "--mic"]).validate_source().is_err());
        assert!(parse(&["--file", "a.wav", "--loop"]).validate_source().is_ok());
        assert!(parse(&["--observe", "0.0.0.0:7667"]).validate_source().is_ok());
        assert!(parse(&["--observe", "0.0.0.0:7667", "--mic"]).validate_source().is_err());
    }
}
