mod fingerprint;
mod plan;
mod upload;

pub use fingerprint::run_fingerprint;
pub use plan::run_plan;
pub use upload::run_upload;
