pub mod error;
pub mod models;
pub mod recognition;
pub mod session;

pub use error::RecognitionError;
pub use models::{Diagnostics, RecognitionResult, Rect, RoiStrategy};
pub use recognition::{
    DigitReader, LocatedRoi, LocatorParams, OcrDigitReader, RecognitionPipeline, decode_photo,
    load_photo,
};
pub use session::{RaceSession, Registration};
