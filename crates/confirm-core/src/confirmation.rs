use std::path::PathBuf;

/// Where the waiter learns that the user accepted the operation.
pub trait ConfirmationSource {
    /// Returns true once the operation has been confirmed.
    fn poll(&mut self) -> bool;
}

/// No confirmation channel is wired up; every check comes back negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirmed;

impl ConfirmationSource for NeverConfirmed {
    fn poll(&mut self) -> bool {
        false
    }
}

/// Confirmed as soon as a marker file exists.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfirmationSource for MarkerFile {
    fn poll(&mut self) -> bool {
        self.path.exists()
    }
}

impl<C: ConfirmationSource + ?Sized> ConfirmationSource for Box<C> {
    fn poll(&mut self) -> bool {
        (**self).poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn never_confirmed_stays_false() {
        let mut source = NeverConfirmed;
        assert!((0..5).all(|_| !source.poll()));
    }

    #[test]
    fn marker_file_confirms_once_present() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("confirmed");
        let mut source = MarkerFile::new(&marker);
        assert!(!source.poll());

        std::fs::write(&marker, "").unwrap();
        assert!(source.poll());
    }

    #[test]
    fn boxed_source_delegates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok"), "").unwrap();
        let mut source: Box<dyn ConfirmationSource> = Box::new(MarkerFile::new(dir.path().join("ok")));
        assert!(source.poll());
    }
}
