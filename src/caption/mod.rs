// Caption rendering pipeline: color and time encoding, layout resolution,
// and subtitle script generation for the burn-in renderer.

pub mod color;
pub mod layout;
pub mod script;
pub mod timing;

pub use layout::{build_style, wrap_text, CaptionOptions, CaptionPosition, CaptionStyle};
pub use script::{render_script, Caption};
