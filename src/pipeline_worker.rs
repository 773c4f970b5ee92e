// Pipeline worker for converting cursor trees on a background thread

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::event::PipelineMsg;
use crate::pipeline::cur2png::{ConversionOptions, batch_convert};

pub struct PipelineWorker {
    tx: Sender<PipelineMsg>,
    cancel: Arc<AtomicBool>,
}

impl PipelineWorker {
    pub fn new(tx: Sender<PipelineMsg>) -> Self {
        Self {
            tx,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Worker plus the receiving end of its message channel.
    pub fn with_channel() -> (Self, Receiver<PipelineMsg>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// Stops dispatching new files. Files already being converted finish.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn start_cur_to_png_conversion(
        &self,
        input_dir: PathBuf,
        output_dir: PathBuf,
        options: ConversionOptions,
    ) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let cancel = Arc::clone(&self.cancel);

        thread::spawn(move || {
            Self::run_cur_to_png_pipeline(&input_dir, &output_dir, &options, &cancel, &tx);
        })
    }

    fn run_cur_to_png_pipeline(
        input_dir: &Path,
        output_dir: &Path,
        options: &ConversionOptions,
        cancel: &AtomicBool,
        tx: &Sender<PipelineMsg>,
    ) {
        let _ = tx.send(PipelineMsg::PipelineStarted);
        let _ = tx.send(PipelineMsg::LogMessage(format!(
            "Converting {} -> {}",
            input_dir.display(),
            output_dir.display()
        )));

        let result = batch_convert(input_dir, output_dir, options, cancel, |result, done, total| {
            let msg = match result {
                Ok(converted) => PipelineMsg::FileConverted(converted.clone()),
                Err(failure) => PipelineMsg::FileFailed(failure.clone()),
            };
            let _ = tx.send(msg);
            let _ = tx.send(PipelineMsg::PipelineProgress(done, total));
        });

        match result {
            Ok(report) => {
                if report.skipped > 0 {
                    let _ = tx.send(PipelineMsg::LogMessage(format!(
                        "Cancelled, {} file(s) not started",
                        report.skipped
                    )));
                }
                let _ = tx.send(PipelineMsg::PipelineCompleted(report));
            }
            Err(e) => {
                let _ = tx.send(PipelineMsg::PipelineFailed(format!("{:#}", e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_worker_reports_missing_input() {
        let dir = tempdir().unwrap();
        let (worker, rx) = PipelineWorker::with_channel();

        worker
            .start_cur_to_png_conversion(
                dir.path().join("missing"),
                dir.path().join("out"),
                ConversionOptions::default(),
            )
            .join()
            .unwrap();

        let msgs: Vec<PipelineMsg> = rx.try_iter().collect();
        assert!(matches!(msgs.first(), Some(PipelineMsg::PipelineStarted)));
        assert!(matches!(msgs.last(), Some(PipelineMsg::PipelineFailed(_))));
    }

    #[test]
    fn test_channel_closes_once_worker_dropped() {
        let dir = tempdir().unwrap();
        let (worker, rx) = PipelineWorker::with_channel();

        let handle = worker.start_cur_to_png_conversion(
            dir.path().to_path_buf(),
            dir.path().join("out"),
            ConversionOptions::default(),
        );
        drop(worker);

        // Ends without a terminal-message break once the thread exits
        let msgs: Vec<PipelineMsg> = rx.iter().collect();
        handle.join().unwrap();
        assert!(msgs.last().is_some_and(PipelineMsg::is_terminal));
    }

    #[test]
    fn test_worker_completes_empty_tree() {
        let dir = tempdir().unwrap();
        let (worker, rx) = PipelineWorker::with_channel();

        worker
            .start_cur_to_png_conversion(
                dir.path().to_path_buf(),
                dir.path().join("out"),
                ConversionOptions::default(),
            )
            .join()
            .unwrap();

        let last = rx.try_iter().last().unwrap();
        assert!(last.is_terminal());
        match last {
            PipelineMsg::PipelineCompleted(report) => {
                assert_eq!(report.succeeded(), 0);
                assert_eq!(report.failed(), 0);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
