use std::sync::atomic::{AtomicI64, Ordering};

/// Generates upload filenames of the form `{millis}{extension}`.
///
/// `millis` is the Unix time in milliseconds, bumped past the last issued
/// value when several uploads land in the same millisecond, so names stay
/// unique within the process.
#[derive(Debug, Default)]
pub struct FileNamer {
    last: AtomicI64,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self, extension: &str) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{candidate}{extension}"),
                Err(actual) => last = actual,
            }
        }
    }
}
