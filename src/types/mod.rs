mod extension;
mod platform;

pub use extension::Extension;
pub use platform::Platform;
