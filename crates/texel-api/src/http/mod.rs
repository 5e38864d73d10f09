pub(crate) mod constants;
pub(crate) mod convert;
pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod router;
pub(crate) mod stream;
pub(crate) mod telemetry;
