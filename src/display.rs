//! Display sinks.
//!
//! The fusion engine never touches UI state directly. It calls a
//! `DisplaySink` with the stabilized status, and the concrete UI decides how
//! the update reaches its own thread.

use std::sync::mpsc;

use crate::classify::{Status, StatusColor};

/// Receives stabilized label changes.
///
/// `show` is called while the fusion state lock is held, which keeps label
/// changes in order. Implementations must hand the update off and return:
/// no blocking, and no calls back into the `FusionEngine`.
pub trait DisplaySink: Send + Sync {
    fn show(&self, status: Status, color: StatusColor);
}

/// Label update marshaled to the UI-owning thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub status: Status,
    pub label: &'static str,
    pub color: StatusColor,
}

/// Forwards every update over an `mpsc` channel.
///
/// The receiving end belongs to the UI thread, which applies text and color.
pub struct ChannelDisplaySink {
    tx: mpsc::Sender<DisplayUpdate>,
}

impl ChannelDisplaySink {
    pub fn new() -> (Self, mpsc::Receiver<DisplayUpdate>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl DisplaySink for ChannelDisplaySink {
    fn show(&self, status: Status, color: StatusColor) {
        let update = DisplayUpdate {
            status,
            label: status.label(),
            color,
        };
        if self.tx.send(update).is_err() {
            log::debug!("display receiver gone, dropping label update");
        }
    }
}

/// Logs label changes.
#[derive(Default)]
pub struct LogDisplaySink;

impl DisplaySink for LogDisplaySink {
    fn show(&self, status: Status, color: StatusColor) {
        log::info!("status: {} [{}]", status.label(), color.hex());
    }
}
