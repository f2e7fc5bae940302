use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag used to abort a running intersection query.
///
/// Clones observe the same flag, so one handle can be kept by the caller while
/// another travels inside the query options.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every query holding this handle to stop at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with the cancellation error if the flag has been raised.
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_cancelled(), "intersection cancelled");
        Ok(())
    }
}

/// Check an optional cancellation handle.
pub(crate) fn check_cancelled(cancellation: Option<&Cancellation>) -> anyhow::Result<()> {
    match cancellation {
        Some(c) => c.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::Cancellation;

    #[test]
    fn clones_share_the_flag() {
        let c = Cancellation::new();
        let other = c.clone();
        assert!(c.check().is_ok());
        other.cancel();
        assert!(c.is_cancelled());
        let err = c.check().unwrap_err();
        assert_eq!(err.to_string(), "intersection cancelled");
    }
}
