/// Fournit des blocs d'échantillons au producteur.
///
/// Samples are signed 32-bit words carrying a 24-bit value left-aligned
/// (the low 8 bits are padding), as delivered by an I²S MEMS microphone.
///
/// Implémenté par : `ToneSource`, `FileSource`, `MicSource`.
///
/// # Example
/// ```
/// use ds_core::traits::SampleSource;
///
/// struct Silence;
/// impl SampleSource for Silence {
///     fn read(&mut self, buf: &mut [i32]) -> Option<usize> {
///         buf.fill(0);
///         Some(buf.len())
///     }
/// }
///
/// let mut buf = [1i32; 8];
/// assert_eq!(Silence.read(&mut buf), Some(8));
/// ```
pub trait SampleSource: Send {
    /// Fill `buf` with up to `buf.len()` samples, blocking until done.
    ///
    /// Returns the number of samples written. Fewer than `buf.len()` is a
    /// short read, not an error. `None` means the source is closed for good.
    fn read(&mut self, buf: &mut [i32]) -> Option<usize>;

    /// Native rate of the source in Hz, if known.
    fn sample_rate(&self) -> Option<u32> {
        None
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buf: &mut [i32]) -> Option<usize> {
        (**self).read(buf)
    }

    fn sample_rate(&self) -> Option<u32> {
        (**self).sample_rate()
    }
}

/// Diffuse des paquets binaires vers zéro ou plusieurs observateurs.
///
/// Best effort: no delivery status is reported back to the pipeline.
///
/// # Example
/// ```
/// use ds_core::traits::TransportSink;
///
/// #[derive(Default)]
/// struct Counting(usize);
/// impl TransportSink for Counting {
///     fn broadcast(&mut self, bytes: &[u8]) { self.0 += bytes.len(); }
/// }
///
/// let mut sink = Counting::default();
/// sink.broadcast(&[1, 2, 3]);
/// assert_eq!(sink.0, 3);
/// ```
pub trait TransportSink: Send {
    /// Send one packet to every current observer.
    fn broadcast(&mut self, bytes: &[u8]);
}

impl<T: TransportSink + ?Sized> TransportSink for Box<T> {
    fn broadcast(&mut self, bytes: &[u8]) {
        (**self).broadcast(bytes);
    }
}
