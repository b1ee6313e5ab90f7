//! Image intake, editing requests and the backends that serve them.

mod intake;
mod provider;
pub mod providers;
mod types;

pub use intake::{
    decode_base64_lenient, strip_data_url, IntakeError, SourceImage, MAX_IMAGE_BYTES,
};
pub use provider::ImageEditor;
pub use types::{ContentPart, EditRequest, EditResponse, ImageFormat, REQUEST_MIME_TYPE};

#[cfg(test)]
pub(crate) use provider::testing;
