mod executor;
mod recorder;
mod task;

pub use {
    executor::RecordingExecutor,
    recorder::{Recorder, RecordingJob},
    task::RecordingTask,
};
