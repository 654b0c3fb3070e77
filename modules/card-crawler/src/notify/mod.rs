pub mod backend;
pub mod noop;
pub mod webhook;

pub use backend::Notifier;
pub use noop::NoopNotifier;
pub use webhook::PipelineWebhook;
