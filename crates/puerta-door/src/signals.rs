//! Two-phase signalling between a door adapter and its controller.
//!
//! An actuation reports twice: once when the door has started opening (or
//! failed to), and once when the hold and relock cycle is over. The
//! adapter side of the protocol is typed so that the second report can only
//! be sent after a successful first one:
//!
//! ```text
//! ActuationSignals --begin(Ok)--> CompletionSignal --complete(..)--> done
//!                  --begin(Err)-> done (completion channel closed)
//! ```
//!
//! Dropping either half without sending closes the matching channel, which
//! the controller treats as a failure of that phase.

use tokio::sync::oneshot;

use crate::error::Result;

/// Adapter half, handed to [`DoorActuator::open`](crate::DoorActuator::open).
#[derive(Debug)]
pub struct ActuationSignals {
    started: oneshot::Sender<Result<()>>,
    finished: oneshot::Sender<Result<()>>,
}

/// Adapter half, after actuation started.
#[derive(Debug)]
pub struct CompletionSignal {
    finished: oneshot::Sender<Result<()>>,
}

/// Controller half.
#[derive(Debug)]
pub struct ActuationWatch {
    pub started: oneshot::Receiver<Result<()>>,
    pub finished: oneshot::Receiver<Result<()>>,
}

/// Create a linked pair of signal halves for one actuation.
pub fn channel() -> (ActuationSignals, ActuationWatch) {
    let (started_tx, started_rx) = oneshot::channel();
    let (finished_tx, finished_rx) = oneshot::channel();

    (
        ActuationSignals {
            started: started_tx,
            finished: finished_tx,
        },
        ActuationWatch {
            started: started_rx,
            finished: finished_rx,
        },
    )
}

impl ActuationSignals {
    /// Report the outcome of starting the actuation.
    ///
    /// Returns the completion half only when `result` is `Ok`.
    pub fn begin(self, result: Result<()>) -> Option<CompletionSignal> {
        match result {
            Ok(()) => {
                // The controller may have gone away; the cycle still runs.
                let _ = self.started.send(Ok(()));
                Some(CompletionSignal {
                    finished: self.finished,
                })
            }
            Err(err) => {
                let _ = self.started.send(Err(err));
                None
            }
        }
    }
}

impl CompletionSignal {
    /// Report the outcome of the hold and relock cycle.
    pub fn complete(self, result: Result<()>) {
        let _ = self.finished.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoorError;

    #[tokio::test]
    async fn test_successful_cycle_reports_twice() {
        let (signals, watch) = channel();

        let completion = signals.begin(Ok(())).unwrap();
        completion.complete(Ok(()));

        assert!(watch.started.await.unwrap().is_ok());
        assert!(watch.finished.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_start_failure_closes_completion() {
        let (signals, watch) = channel();

        assert!(signals.begin(Err(DoorError::communication("offline"))).is_none());

        assert!(matches!(
            watch.started.await.unwrap(),
            Err(DoorError::Communication { .. })
        ));
        assert!(watch.finished.await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_signals_close_both_channels() {
        let (signals, watch) = channel();
        drop(signals);

        assert!(watch.started.await.is_err());
        assert!(watch.finished.await.is_err());
    }
}
