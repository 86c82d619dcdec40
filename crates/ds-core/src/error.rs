use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// The two sample buffers of a frame do not have the same length.
    #[error("Longueurs de buffers incohérentes : in={samples_in}, out={samples_out}")]
    SampleCountMismatch {
        /// Length of the pre-gain buffer.
        samples_in: usize,
        /// Length of the post-gain buffer.
        samples_out: usize,
    },

    /// Sample count does not fit the 32-bit wire field.
    #[error("Nombre d'échantillons trop grand pour le format : {0}")]
    SampleCountOverflow(usize),
}
