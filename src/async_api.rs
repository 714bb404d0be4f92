//! Async-friendly converter facade backed by a dedicated worker thread.
//!
//! The worker thread owns a synchronous `Converter` and executes commands
//! sent from async tasks, so async callers (such as an HTTP handler) get an
//! await-able interface without the engine needing to be `Send` across
//! tasks.

use crate::config::RenderOptions;
use crate::convert::{Base64Render, BatchItem, BatchRecord, Converter, FileRender, RenderResult};
use crate::error::{Error, Result};
use crate::ConverterConfig;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Convert(String, RenderOptions, oneshot::Sender<Result<RenderResult>>),
    ConvertBase64(String, RenderOptions, oneshot::Sender<Result<Base64Render>>),
    ConvertFile(
        PathBuf,
        PathBuf,
        RenderOptions,
        oneshot::Sender<Result<FileRender>>,
    ),
    ConvertAll(Vec<BatchItem>, oneshot::Sender<Vec<BatchRecord>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable async handle to a converter worker.
#[derive(Clone)]
pub struct AsyncConverter {
    cmd_tx: Sender<Command>,
}

impl AsyncConverter {
    /// Spawn the worker thread that owns the converter. The engine session
    /// itself is still launched lazily on the first conversion.
    pub fn new(config: ConverterConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

        thread::spawn(move || {
            let converter = Converter::new(config);
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Convert(markdown, options, resp) => {
                        let _ = resp.send(converter.convert_to_bytes(&markdown, &options));
                    }
                    Command::ConvertBase64(markdown, options, resp) => {
                        let _ = resp.send(converter.convert_to_base64(&markdown, &options));
                    }
                    Command::ConvertFile(input, output, options, resp) => {
                        let _ = resp.send(converter.convert_file(&input, &output, &options));
                    }
                    Command::ConvertAll(items, resp) => {
                        let _ = resp.send(converter.convert_all(&items));
                    }
                    Command::Shutdown(resp) => {
                        converter.shutdown();
                        let _ = resp.send(());
                        break;
                    }
                }
            }
            // Also reached when all handles are dropped without an explicit
            // shutdown; recycling is idempotent.
            converter.shutdown();
        });

        Self { cmd_tx }
    }

    pub async fn convert(&self, markdown: &str, options: RenderOptions) -> Result<RenderResult> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(Command::Convert(markdown.to_string(), options, tx));
        rx.await
            .map_err(|e| Error::Conversion(format!("convert canceled: {e}")))?
    }

    pub async fn convert_base64(
        &self,
        markdown: &str,
        options: RenderOptions,
    ) -> Result<Base64Render> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(Command::ConvertBase64(markdown.to_string(), options, tx));
        rx.await
            .map_err(|e| Error::Conversion(format!("convert canceled: {e}")))?
    }

    pub async fn convert_file(
        &self,
        input: PathBuf,
        output: PathBuf,
        options: RenderOptions,
    ) -> Result<FileRender> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(Command::ConvertFile(input, output, options, tx));
        rx.await
            .map_err(|e| Error::Conversion(format!("convert canceled: {e}")))?
    }

    pub async fn convert_all(&self, items: Vec<BatchItem>) -> Result<Vec<BatchRecord>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::ConvertAll(items, tx));
        rx.await
            .map_err(|e| Error::Conversion(format!("batch canceled: {e}")))
    }

    /// Shut down the worker and release the engine session.
    pub async fn shutdown(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Shutdown(tx));
        rx.await
            .map_err(|e| Error::Conversion(format!("shutdown canceled: {e}")))
    }
}
