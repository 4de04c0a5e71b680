use asvlink_frame::Payload;

/// Why a measurement could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    /// The source has nothing more to offer; the sender loop ends.
    #[error("measurement source exhausted")]
    Exhausted,

    /// One reading failed; the sender logs it and asks again.
    #[error("{0}")]
    Failed(String),

    #[error("measurement I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces payloads for a [`Sender`](crate::Sender).
///
/// `measure` may block for as long as the sensor's sampling period.
pub trait MeasurementSource {
    fn measure(&mut self) -> Result<Payload, MeasureError>;

    /// Release the sensor. Called once when the sender loop ends.
    fn close(&mut self) -> Result<(), MeasureError> {
        Ok(())
    }
}

impl<F> MeasurementSource for F
where
    F: FnMut() -> Result<Payload, MeasureError>,
{
    fn measure(&mut self) -> Result<Payload, MeasureError> {
        self()
    }
}
