/// User-visible notification sink. The reading app surfaces these as toasts.
pub trait Toast: Send + Sync {
    fn show(&self, message: &str);
}

/// Fallback sink that reports through the log instead of the UI.
#[derive(Debug, Default)]
pub struct TracingToast;

impl Toast for TracingToast {
    fn show(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
