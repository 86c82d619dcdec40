use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("Aucun périphérique audio d'entrée trouvé")]
    NoInputDevice,

    /// FFT length is zero or not a power of two.
    #[error("Taille FFT invalide : {0} (puissance de deux non nulle attendue)")]
    InvalidFftSize(usize),

    /// Audio stream error.
    #[error("Erreur de stream audio : {0}")]
    StreamError(String),

    /// Audio decode error.
    #[error("Erreur de décodage : {0}")]
    DecodeError(String),
}
