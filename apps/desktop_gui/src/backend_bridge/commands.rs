//! Backend commands queued from UI to the workflow worker.

use std::path::PathBuf;

pub enum BackendCommand {
    SelectFile { path: PathBuf },
    StartUpload,
    Reset,
}
